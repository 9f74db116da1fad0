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

//! Transport plumbing shared by the bridge, the control loop and clients.

pub mod client;
pub mod context;
pub mod error;
pub mod protocol;

pub use client::QueueClient;
pub use context::{Transport, tcp_endpoint};
pub use error::{Error, Result};
pub use protocol::{ACKNOWLEDGED, NO_DATA, Opcode, REJECTED, Response};
pub use zmq;
