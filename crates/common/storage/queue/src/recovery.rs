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

//! Crash recovery for the queue store.
//!
//! Recovery is a single directory scan:
//! 1. Create the directory if it does not exist
//! 2. Delete every staging file (an interrupted write never becomes visible)
//! 3. Collect committed entries and order them by sequence number
//! 4. Derive the next sequence number from the highest committed one
//!
//! Any committed name that does not parse is fatal: the store refuses to
//! open rather than guess at the order of its contents.

use std::{fs, io};

use snafu::{OptionExt, ResultExt};
use tracing::{debug, info, warn};

use crate::{
    QueueConfig, Result,
    error::{
        CreateDirSnafu, InvalidEntryNameSnafu, PurgeStagingSnafu, ScanDirSnafu,
        SequenceExhaustedSnafu,
    },
    message::QueueEntry,
    path::{EntryKind, classify},
};

/// State recovered from the queue directory.
#[derive(Debug, Default)]
pub struct RecoveryInfo {
    /// Committed entries in ascending sequence order.
    pub entries:        Vec<QueueEntry>,
    /// Sequence number to assign to the next message.
    pub next_sequence:  u64,
    /// Number of staging files deleted during the scan.
    pub purged_staging: usize,
}

/// Scan the configured directory and rebuild the queue state.
pub fn recover(config: &QueueConfig) -> Result<RecoveryInfo> {
    let dir = &config.directory;
    info!(path = ?dir, "Starting queue recovery");

    fs::create_dir_all(dir).context(CreateDirSnafu { path: dir.clone() })?;

    let mut entries = Vec::new();
    let mut purged_staging = 0;

    for entry in fs::read_dir(dir).context(ScanDirSnafu { path: dir.clone() })? {
        let entry = entry.context(ScanDirSnafu { path: dir.clone() })?;
        let path = entry.path();

        if entry
            .file_type()
            .context(ScanDirSnafu { path: path.clone() })?
            .is_dir()
        {
            continue;
        }

        let kind = match classify(&path, config) {
            Ok(kind) => kind,
            Err(reason) => return InvalidEntryNameSnafu { path, reason }.fail(),
        };

        match kind {
            EntryKind::Committed(sequence) => entries.push(QueueEntry { sequence, path }),
            EntryKind::Staging => {
                match fs::remove_file(&path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e).context(PurgeStagingSnafu { path }),
                }
                warn!(path = ?path, "Purged staging file left by an interrupted write");
                purged_staging += 1;
            }
            EntryKind::Other => debug!(path = ?path, "Ignoring unrelated file"),
        }
    }

    entries.sort_unstable_by_key(|e| e.sequence);

    let next_sequence = match entries.last() {
        None => 0,
        Some(last) => last.sequence.checked_add(1).context(SequenceExhaustedSnafu {
            sequence: last.sequence,
            width:    config.key_width,
        })?,
    };

    info!(
        path = ?dir,
        entries = entries.len(),
        next_sequence,
        purged_staging,
        "Queue recovery complete"
    );

    Ok(RecoveryInfo {
        entries,
        next_sequence,
        purged_staging,
    })
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;
    use crate::path::{entry_path, staging_path};

    fn test_config(dir: &Path) -> QueueConfig {
        QueueConfig {
            directory: dir.to_path_buf(),
            key_width: 8,
            ..Default::default()
        }
    }

    fn write_entry(config: &QueueConfig, sequence: u64, data: &[u8]) {
        fs::write(entry_path(&config.directory, sequence, config), data).unwrap();
    }

    #[test]
    fn test_recovery_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());

        let info = recover(&config).unwrap();

        assert!(info.entries.is_empty());
        assert_eq!(info.next_sequence, 0);
        assert_eq!(info.purged_staging, 0);
    }

    #[test]
    fn test_recovery_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir.path().join("nested").join("queue"));

        recover(&config).unwrap();

        assert!(config.directory.is_dir());
    }

    #[test]
    fn test_recovery_orders_entries_and_derives_counter() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        for sequence in [21, 3, 100, 9] {
            write_entry(&config, sequence, b"{}");
        }

        let info = recover(&config).unwrap();

        let sequences: Vec<u64> = info.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 9, 21, 100]);
        assert_eq!(info.next_sequence, 101);
    }

    #[test]
    fn test_recovery_purges_staging_files() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        write_entry(&config, 0, b"committed");
        let staged = staging_path(&entry_path(temp_dir.path(), 1, &config), "tmp");
        fs::write(&staged, b"half-writ").unwrap();

        let info = recover(&config).unwrap();

        assert!(!staged.exists());
        assert_eq!(info.purged_staging, 1);
        assert_eq!(info.entries.len(), 1);
        assert_eq!(info.next_sequence, 1);
    }

    #[test]
    fn test_recovery_ignores_unrelated_files_and_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        fs::write(temp_dir.path().join("README.md"), b"hello").unwrap();
        fs::create_dir(temp_dir.path().join("00000001.json")).unwrap();

        let info = recover(&config).unwrap();

        assert!(info.entries.is_empty());
        assert!(temp_dir.path().join("README.md").exists());
    }

    #[test_case("abcdefgh.json" ; "non numeric stem")]
    #[test_case("0001.json" ; "wrong width")]
    fn test_recovery_rejects_malformed_names(name: &str) {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(temp_dir.path());
        fs::write(temp_dir.path().join(name), b"{}").unwrap();

        let err = recover(&config).unwrap_err();

        assert!(err.is_configuration_error());
        assert!(matches!(err, crate::QueueError::InvalidEntryName { .. }));
    }

    #[test]
    fn test_recovery_keeps_full_queue_readable() {
        let temp_dir = TempDir::new().unwrap();
        let config = QueueConfig {
            directory: temp_dir.path().to_path_buf(),
            key_width: 2,
            ..Default::default()
        };
        write_entry(&config, 99, b"{}");

        let info = recover(&config).unwrap();

        assert_eq!(info.entries.len(), 1);
        assert_eq!(info.next_sequence, 100);
    }
}
