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

//! Background bridge from a pub/sub subscription into a message sink.
//!
//! [`PubSubBridge::spawn`] moves a connected subscriber socket onto a named
//! thread and feeds every payload it receives to a [`MessageSink`], in arrival
//! order. The caller keeps a handle with an idempotent
//! [`shutdown`](PubSubBridge::shutdown).
//!
//! Shutdown travels over an in-process exclusive pair rather than a
//! publish/subscribe channel, so the signal is never dropped for a subscriber
//! that has not finished joining.

mod bridge;
pub mod error;

pub use bridge::{FaultHandler, MessageSink, PubSubBridge};
pub use error::{BoxError, Error, Fault, Result};
