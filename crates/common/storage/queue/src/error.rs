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

//! Error types for the queue store.
//!
//! Errors fall into two groups. Startup errors (directory access, malformed
//! entry names, exhausted key space, invalid configuration) mean the store
//! refuses to open. Operation errors (staging write, commit rename, entry
//! removal, head reload) fail a single call and leave the store consistent.

use std::{io, path::PathBuf};

use snafu::{Location, Snafu};

/// Queue store errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueueError {
    #[snafu(display("Failed to create queue directory {}", path.display()))]
    CreateDir {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to scan queue directory {}", path.display()))]
    ScanDir {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Invalid queue entry name {}: {reason}", path.display()))]
    InvalidEntryName {
        path:   PathBuf,
        reason: String,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to purge staging file {}", path.display()))]
    PurgeStaging {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to load queue entry {}", path.display()))]
    LoadHead {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to write staging file {}", path.display()))]
    WriteStaging {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to commit {} to {}", from.display(), to.display()))]
    Commit {
        from:   PathBuf,
        to:     PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to remove queue entry {}", path.display()))]
    RemoveEntry {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Sequence {sequence} does not fit in a {width}-digit entry key"))]
    SequenceExhausted {
        sequence: u64,
        width:    usize,
        #[snafu(implicit)]
        loc:      Location,
    },

    #[snafu(display("Invalid queue configuration: {reason}"))]
    InvalidConfig {
        reason: String,
        #[snafu(implicit)]
        loc:    Location,
    },
}

impl QueueError {
    /// Whether this error stems from the on-disk layout or the configuration
    /// rather than from a single failed operation.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::CreateDir { .. }
                | Self::ScanDir { .. }
                | Self::InvalidEntryName { .. }
                | Self::PurgeStaging { .. }
                | Self::SequenceExhausted { .. }
                | Self::InvalidConfig { .. }
        )
    }
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
