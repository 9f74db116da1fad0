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

//! The queue store and its lifecycle.
//!
//! [`QueueStore`] is an on-disk FIFO where every message is one file. It:
//! - Recovers existing entries on open, purging interrupted writes
//! - Commits each message with a staged write followed by an atomic rename
//! - Caches the head payload so `front` never touches the disk
//! - Serializes every operation through one lock
//!
//! ## Usage
//!
//! ```ignore
//! let store = QueueBuilder::new("/path/to/queue").build()?;
//!
//! store.add_message(&b"{\"hello\": 1}"[..])?;
//!
//! if let Some(payload) = store.front() {
//!     handle(payload);
//!     store.remove_first()?;
//! }
//! ```

use std::{
    collections::VecDeque,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::Path,
    sync::{Mutex, MutexGuard, PoisonError},
};

use bytes::Bytes;
use snafu::{ResultExt, ensure};
use tracing::{error, info, warn};

use crate::{
    FlushMode, QueueConfig, RemoveFailure, Result,
    error::{
        CommitSnafu, LoadHeadSnafu, RemoveEntrySnafu, SequenceExhaustedSnafu, WriteStagingSnafu,
    },
    message::QueueEntry,
    path::{entry_path, staging_path},
    recovery::{RecoveryInfo, recover},
};

/// A crash-safe FIFO of opaque byte payloads.
///
/// The store is `Sync`; share it as `Arc<QueueStore>` between the ingestion
/// thread and the serving thread.
#[derive(Debug)]
pub struct QueueStore {
    /// Naming scheme, directory and durability settings.
    config:       QueueConfig,
    /// Largest sequence number the key width can represent.
    max_sequence: u64,
    /// Everything mutable, behind the single store lock.
    state:        Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    /// Committed entries in ascending sequence order.
    entries:       VecDeque<QueueEntry>,
    /// Cached payload of `entries[0]`; `None` exactly when `entries` is empty.
    head:          Option<Bytes>,
    /// Next sequence number to hand out.
    next_sequence: u64,
}

impl QueueStore {
    /// Open the store at `config.directory`, creating the directory if needed.
    ///
    /// Staging files left by an interrupted write are deleted. The head
    /// payload, if any, is loaded eagerly.
    pub fn open(config: QueueConfig) -> Result<Self> {
        config.validate()?;

        let RecoveryInfo {
            entries,
            next_sequence,
            ..
        } = recover(&config)?;

        let head = match entries.first() {
            Some(first) => Some(read_payload(&first.path)?),
            None => None,
        };

        info!(
            path = ?config.directory,
            messages = entries.len(),
            next_sequence,
            "Queue store initialized"
        );

        Ok(Self {
            max_sequence: config.max_sequence(),
            config,
            state: Mutex::new(StoreState {
                entries: entries.into(),
                head,
                next_sequence,
            }),
        })
    }

    /// Copy of the head payload, or `None` when the queue is empty.
    #[must_use]
    pub fn front(&self) -> Option<Bytes> { self.lock().head.clone() }

    /// Durably append a message and return its sequence number.
    ///
    /// The payload is written to a staging file and then renamed onto its
    /// committed name, so neither a concurrent reader nor a later recovery
    /// ever sees a partial payload. On failure the staging file is removed
    /// and the queue is unchanged.
    pub fn add_message(&self, payload: impl Into<Bytes>) -> Result<u64> {
        let payload = payload.into();
        let mut state = self.lock();

        let sequence = state.next_sequence;
        ensure!(
            sequence <= self.max_sequence,
            SequenceExhaustedSnafu {
                sequence,
                width: self.config.key_width,
            }
        );

        let path = entry_path(&self.config.directory, sequence, &self.config);
        let staging = staging_path(&path, &self.config.staging_extension);

        if let Err(e) = self.commit(&staging, &path, &payload) {
            discard_staging(&staging);
            return Err(e);
        }

        state.next_sequence = sequence + 1;
        if state.head.is_none() {
            state.head = Some(payload);
        }
        state.entries.push_back(QueueEntry { sequence, path });

        info!(sequence, "Stored message in queue");
        Ok(sequence)
    }

    /// Remove the head entry.
    ///
    /// Returns `false` if the queue was empty. The next head payload is read
    /// before anything is deleted, so a read failure leaves the store
    /// untouched.
    pub fn remove_first(&self) -> Result<bool> {
        let mut state = self.lock();

        let Some(first) = state.entries.front() else {
            return Ok(false);
        };
        let sequence = first.sequence;
        let path = first.path.clone();

        let next_head = match state.entries.get(1) {
            Some(next) => Some(read_payload(&next.path)?),
            None => None,
        };

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(sequence, path = ?path, "Queue entry was already gone from disk");
            }
            Err(e) => match self.config.remove_failure {
                RemoveFailure::Fail => return Err(e).context(RemoveEntrySnafu { path }),
                RemoveFailure::Advance => {
                    error!(
                        sequence,
                        path = ?path,
                        error = %e,
                        "Failed to delete queue entry, dropping it from memory anyway"
                    );
                }
            },
        }

        state.entries.pop_front();
        state.head = next_head;

        info!(sequence, "Removed message from queue");
        Ok(true)
    }

    /// Number of messages currently queued.
    #[must_use]
    pub fn len(&self) -> usize { self.lock().entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.lock().entries.is_empty() }

    /// The sequence number the next successful `add_message` will assign.
    #[must_use]
    pub fn next_sequence(&self) -> u64 { self.lock().next_sequence }

    /// Sequence numbers of the queued entries, head first.
    #[must_use]
    pub fn sequences(&self) -> Vec<u64> {
        self.lock().entries.iter().map(|e| e.sequence).collect()
    }

    #[must_use]
    pub fn directory(&self) -> &Path { &self.config.directory }

    #[must_use]
    pub const fn config(&self) -> &QueueConfig { &self.config }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit(&self, staging: &Path, path: &Path, payload: &[u8]) -> Result<()> {
        write_staging(staging, payload, self.config.flush_mode)
            .context(WriteStagingSnafu { path: staging })?;

        fs::rename(staging, path).context(CommitSnafu {
            from: staging,
            to:   path,
        })?;

        if self.config.flush_mode == FlushMode::Sync {
            // The entry is already visible; a failed directory sync only
            // weakens durability of the rename itself.
            if let Err(e) = sync_dir(&self.config.directory) {
                warn!(path = ?self.config.directory, error = %e, "Failed to sync queue directory");
            }
        }
        Ok(())
    }
}

fn write_staging(path: &Path, payload: &[u8], flush_mode: FlushMode) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(payload)?;
    if flush_mode == FlushMode::Sync {
        file.sync_all()?;
    }
    Ok(())
}

fn discard_staging(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?path, error = %e, "Failed to clean up staging file"),
    }
}

fn read_payload(path: &Path) -> Result<Bytes> {
    fs::read(path)
        .map(Bytes::from)
        .context(LoadHeadSnafu { path })
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> { File::open(dir)?.sync_all() }

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> { Ok(()) }
