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

//! Entry naming.
//!
//! Every entry lives in its own file named after its sequence number,
//! zero-padded to a fixed width so that lexical order equals numeric order:
//!
//! ```text
//! 000000000000000000000000000042.json       committed entry #42
//! 000000000000000000000000000043.json.tmp   entry #43 being written
//! ```

use std::path::{Path, PathBuf};

use crate::QueueConfig;

/// What a directory entry turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A committed entry carrying this sequence number.
    Committed(u64),
    /// Residue of an interrupted write.
    Staging,
    /// Anything else; left untouched.
    Other,
}

/// Generates an entry file name: `{sequence:0width$}.{extension}`.
pub fn entry_file_name(sequence: u64, width: usize, extension: &str) -> String {
    format!("{sequence:0width$}.{extension}")
}

/// Returns the committed path of an entry.
pub fn entry_path<P: AsRef<Path>>(dir: P, sequence: u64, config: &QueueConfig) -> PathBuf {
    dir.as_ref()
        .join(entry_file_name(sequence, config.key_width, &config.extension))
}

/// Returns the staging path that is renamed onto `committed`.
pub fn staging_path(committed: &Path, staging_extension: &str) -> PathBuf {
    let mut name = committed.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(staging_extension);
    committed.with_file_name(name)
}

/// Parses a zero-padded stem back into its sequence number.
///
/// Returns the reason on failure.
pub fn parse_sequence(stem: &str, width: usize) -> Result<u64, String> {
    if stem.len() != width {
        return Err(format!("expected {width} digits, found {}", stem.len()));
    }
    if !stem.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{stem:?} is not an unsigned decimal number"));
    }
    stem.parse::<u64>()
        .map_err(|e| format!("{stem:?} does not fit a sequence number: {e}"))
}

/// Classifies a file found in the queue directory.
pub fn classify(path: &Path, config: &QueueConfig) -> Result<EntryKind, String> {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return Ok(EntryKind::Other);
    };

    if name
        .strip_suffix(config.staging_extension.as_str())
        .is_some_and(|rest| rest.ends_with('.'))
    {
        return Ok(EntryKind::Staging);
    }

    match name
        .strip_suffix(config.extension.as_str())
        .and_then(|rest| rest.strip_suffix('.'))
    {
        Some(stem) => parse_sequence(stem, config.key_width).map(EntryKind::Committed),
        None => Ok(EntryKind::Other),
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn narrow_config() -> QueueConfig {
        QueueConfig {
            key_width: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_entry_file_name() {
        assert_eq!(entry_file_name(42, 6, "json"), "000042.json");
        assert_eq!(
            entry_file_name(7, 30, "json"),
            "000000000000000000000000000007.json"
        );
    }

    #[test]
    fn test_lexical_order_matches_numeric_order() {
        let mut names: Vec<String> = [3u64, 21, 100, 9, 1000]
            .iter()
            .map(|s| entry_file_name(*s, 6, "json"))
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "000003.json",
                "000009.json",
                "000021.json",
                "000100.json",
                "001000.json"
            ]
        );
    }

    #[test]
    fn test_paths() {
        let config = narrow_config();
        let committed = entry_path("/queue", 5, &config);
        assert_eq!(committed, PathBuf::from("/queue/000005.json"));
        assert_eq!(
            staging_path(&committed, "tmp"),
            PathBuf::from("/queue/000005.json.tmp")
        );
    }

    #[test_case("000005.json", EntryKind::Committed(5) ; "committed")]
    #[test_case("000005.json.tmp", EntryKind::Staging ; "staging")]
    #[test_case("notes.txt", EntryKind::Other ; "unrelated file")]
    #[test_case("json", EntryKind::Other ; "bare extension")]
    fn test_classify(name: &str, expected: EntryKind) {
        let config = narrow_config();
        let path = PathBuf::from("/queue").join(name);
        assert_eq!(classify(&path, &config).unwrap(), expected);
    }

    #[test_case("00005.json" ; "too short")]
    #[test_case("00x005.json" ; "not a number")]
    #[test_case("-00005.json" ; "signed")]
    fn test_classify_malformed(name: &str) {
        let config = narrow_config();
        let path = PathBuf::from("/queue").join(name);
        assert!(classify(&path, &config).is_err());
    }

    #[test]
    fn test_parse_overflowing_stem() {
        let stem = "9".repeat(30);
        assert!(parse_sequence(&stem, 30).is_err());
    }
}
