// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! HTTP ingestion gateway.
//!
//! Authenticated clients post JSON records. Flower records are republished
//! on the queue's ingestion channel; pollinator records go to an on-disk
//! archive partitioned by node, date and hour.

mod archive;
mod auth;
pub mod config;
pub mod error;
mod handler;
mod http;

pub use archive::{
    ArchiveClock, ArchiveSink, archive_path, parse_capture_time, parse_capture_timestamp,
};
pub use auth::Credentials;
pub use config::GatewayConfig;
pub use error::{ApiError, ArchiveError, Error, Result};
pub use http::{ServiceHandler, start_gateway_server};
