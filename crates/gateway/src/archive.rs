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

//! Date/node-partitioned file archive for records.
//!
//! A record is stored at
//! `{root}/{node_id}/{YYYY-MM-DD}/{HH}/{node_id}_{YYYY-MM-DDTHH-MM-SSZ}.json`,
//! where `node_id` and the capture time come from the record's `metadata`
//! object.
//!
//! Capture times carrying an offset are filed according to [`ArchiveClock`].
//! With the default [`ArchiveClock::Utc`] a record captured at
//! `2024-05-01T09:03:09+02:00` lands under `2024-05-01/07`; with
//! [`ArchiveClock::AsGiven`] it lands under `2024-05-01/09`, the wall-clock
//! time the node reported. Times without an offset are used unchanged either
//! way.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::debug;

use crate::error::{
    ArchiveError, CreateDirSnafu, EncodeRecordSnafu, InvalidNodeIdSnafu, InvalidTimestampSnafu,
    MissingFieldSnafu, WriteRecordSnafu,
};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Which clock an offset capture time is filed under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveClock {
    /// Convert to UTC.
    #[default]
    Utc,
    /// Keep the wall-clock time as reported, dropping the offset.
    AsGiven,
}

#[derive(Debug, Clone)]
pub struct ArchiveSink {
    root:  PathBuf,
    clock: ArchiveClock,
}

impl ArchiveSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root:  root.into(),
            clock: ArchiveClock::default(),
        }
    }

    #[must_use]
    pub const fn with_clock(mut self, clock: ArchiveClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn root(&self) -> &Path { &self.root }

    pub const fn clock(&self) -> ArchiveClock { self.clock }

    /// Where `record` would be stored.
    pub fn locate(&self, record: &Value) -> Result<PathBuf, ArchiveError> {
        let metadata = record.get("metadata").context(MissingFieldSnafu {
            field: "metadata",
        })?;
        let node_id = metadata
            .get("node_id")
            .and_then(Value::as_str)
            .context(MissingFieldSnafu { field: "node_id" })?;
        ensure!(is_safe_node_id(node_id), InvalidNodeIdSnafu { node_id });

        let raw = metadata
            .get("capture_timestamp")
            .and_then(Value::as_str)
            .context(MissingFieldSnafu {
                field: "capture_timestamp",
            })?;
        let captured_at =
            parse_capture_time(raw, self.clock).context(InvalidTimestampSnafu { raw })?;

        Ok(archive_path(&self.root, node_id, captured_at))
    }

    /// Writes `record` to its archive path, creating directories as needed.
    pub async fn store(&self, record: &Value) -> Result<PathBuf, ArchiveError> {
        let path = self.locate(record)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(CreateDirSnafu { path: parent })?;
        }
        let body = serde_json::to_vec(record).context(EncodeRecordSnafu)?;
        tokio::fs::write(&path, body)
            .await
            .context(WriteRecordSnafu { path: &path })?;
        debug!(path = %path.display(), "Archived record");
        Ok(path)
    }
}

/// Archive location of a record from `node_id` captured at `captured_at`.
pub fn archive_path(root: &Path, node_id: &str, captured_at: NaiveDateTime) -> PathBuf {
    root.join(node_id)
        .join(captured_at.format("%Y-%m-%d").to_string())
        .join(captured_at.format("%H").to_string())
        .join(format!(
            "{node_id}_{}.json",
            captured_at.format("%Y-%m-%dT%H-%M-%SZ")
        ))
}

/// Parses an ISO-8601 capture time.
///
/// Accepts a full date-time with or without an offset (`T` or space
/// separated, optional fractional seconds) or a bare date. Times without an
/// offset are taken as UTC.
pub fn parse_capture_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_capture_time(raw, ArchiveClock::Utc).map(|naive| naive.and_utc())
}

/// Parses a capture time into the wall-clock time it is filed under.
pub fn parse_capture_time(raw: &str, clock: ArchiveClock) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Some(ts) = parse_with_offset(raw) {
        return Some(match clock {
            ArchiveClock::Utc => ts.naive_utc(),
            ArchiveClock::AsGiven => ts.naive_local(),
        });
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn parse_with_offset(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(raw, format).ok())
    })
}

fn is_safe_node_id(node_id: &str) -> bool {
    !node_id.is_empty()
        && node_id != "."
        && node_id != ".."
        && !node_id.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test]
    fn test_archive_path_layout() {
        let captured_at = Utc.with_ymd_and_hms(2024, 5, 1, 7, 3, 9).unwrap();
        let path = archive_path(Path::new("results"), "node-7", captured_at.naive_utc());
        assert_eq!(
            path,
            PathBuf::from("results/node-7/2024-05-01/07/node-7_2024-05-01T07-03-09Z.json")
        );
    }

    #[test_case("2024-05-01T07:03:09Z", (7, 3, 9) ; "rfc3339 utc")]
    #[test_case("2024-05-01T09:03:09+02:00", (7, 3, 9) ; "rfc3339 offset")]
    #[test_case("2024-05-01T07:03:09.123456", (7, 3, 9) ; "naive with fraction")]
    #[test_case("2024-05-01 07:03:09", (7, 3, 9) ; "naive space separated")]
    #[test_case("2024-05-01T09:03:09+0200", (7, 3, 9) ; "offset without colon")]
    #[test_case("2024-05-01", (0, 0, 0) ; "date only")]
    fn test_parse_capture_timestamp(raw: &str, hms: (u32, u32, u32)) {
        let (h, m, s) = hms;
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap();
        let parsed = parse_capture_timestamp(raw).unwrap();
        assert_eq!(parsed.format("%F %T").to_string(), expected.format("%F %T").to_string());
    }

    #[test_case("2024-05-01T09:03:09+02:00", ArchiveClock::Utc, "2024-05-01/07/n1_2024-05-01T07-03-09Z" ; "offset filed as utc")]
    #[test_case("2024-05-01T09:03:09+02:00", ArchiveClock::AsGiven, "2024-05-01/09/n1_2024-05-01T09-03-09Z" ; "offset filed as given")]
    #[test_case("2024-05-01T01:30:00-03:00", ArchiveClock::Utc, "2024-05-01/04/n1_2024-05-01T04-30-00Z" ; "negative offset as utc")]
    #[test_case("2024-05-01T01:30:00-03:00", ArchiveClock::AsGiven, "2024-05-01/01/n1_2024-05-01T01-30-00Z" ; "negative offset as given")]
    #[test_case("2024-05-01 09:03:09", ArchiveClock::AsGiven, "2024-05-01/09/n1_2024-05-01T09-03-09Z" ; "naive unaffected")]
    fn test_locate_follows_archive_clock(raw: &str, clock: ArchiveClock, expected: &str) {
        let sink = ArchiveSink::new("results").with_clock(clock);
        let record = json!({"metadata": {"node_id": "n1", "capture_timestamp": raw}});
        assert_eq!(
            sink.locate(&record).unwrap(),
            Path::new("results/n1").join(format!("{expected}.json"))
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("yesterday" ; "words")]
    #[test_case("2024-13-01T00:00:00" ; "bad month")]
    fn test_rejects_bad_timestamps(raw: &str) {
        assert!(parse_capture_timestamp(raw).is_none());
    }

    #[test]
    fn test_locate_requires_metadata() {
        let sink = ArchiveSink::new("results");

        let err = sink.locate(&json!({"data": 1})).unwrap_err();
        assert!(matches!(err, ArchiveError::MissingField { field: "metadata" }));

        let err = sink
            .locate(&json!({"metadata": {"capture_timestamp": "2024-05-01T00:00:00"}}))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::MissingField { field: "node_id" }));

        let err = sink
            .locate(&json!({"metadata": {"node_id": "n1"}}))
            .unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::MissingField {
                field: "capture_timestamp"
            }
        ));

        let err = sink
            .locate(&json!({"metadata": {"node_id": "n1", "capture_timestamp": "soon"}}))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidTimestamp { .. }));
    }

    #[test_case("../escape" ; "parent traversal")]
    #[test_case(".." ; "parent")]
    #[test_case("a/b" ; "nested")]
    #[test_case("" ; "empty")]
    fn test_locate_rejects_unsafe_node_ids(node_id: &str) {
        let sink = ArchiveSink::new("results");
        let record = json!({"metadata": {"node_id": node_id, "capture_timestamp": "2024-05-01"}});
        assert!(matches!(
            sink.locate(&record).unwrap_err(),
            ArchiveError::InvalidNodeId { .. }
        ));
    }

    #[tokio::test]
    async fn test_store_writes_record() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let sink = ArchiveSink::new(temp_dir.path());
        let record = json!({
            "metadata": {"node_id": "n1", "capture_timestamp": "2024-05-01T13:45:00Z"},
            "detections": [1, 2, 3],
        });

        let path = sink.store(&record).await.unwrap();
        assert_eq!(
            path,
            temp_dir
                .path()
                .join("n1/2024-05-01/13/n1_2024-05-01T13-45-00Z.json")
        );
        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, record);
    }
}
