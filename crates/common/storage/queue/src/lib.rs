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

//! Crash-safe, file-per-message FIFO store.
//!
//! See [`QueueStore`] for the write and recovery protocol.

pub mod builder;
pub mod config;
pub mod error;
pub mod message;
pub mod path;
pub mod queue;
pub mod recovery;

pub use builder::QueueBuilder;
pub use config::{FlushMode, QueueConfig, RemoveFailure};
pub use error::{QueueError, Result};
pub use message::QueueEntry;
pub use queue::QueueStore;
