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

//! Request/response front end of the queue.
//!
//! A [`ControlLoop`] binds one reply socket and answers peek, pop and
//! dequeue-only requests against a shared
//! [`QueueStore`](spoolmq_common_storage_queue::QueueStore), one request at a
//! time.

mod control_loop;
pub mod error;

pub use control_loop::{ControlLoop, ControlLoopOptions, PopMode};
pub use error::{Error, Result};
