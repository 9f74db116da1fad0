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

use std::path::PathBuf;

/// A committed queue entry.
///
/// The payload itself stays on disk; only the head payload is cached by the
/// store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Sequence number assigned at enqueue time. Never reused, even after
    /// the entry is removed.
    pub sequence: u64,

    /// Committed file backing this entry.
    pub path: PathBuf,
}
