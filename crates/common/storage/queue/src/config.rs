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

use serde::{Deserialize, Serialize};
use snafu::ensure;

use crate::{Result, error::InvalidConfigSnafu};

/// Default number of decimal digits in an entry key.
pub const DEFAULT_KEY_WIDTH: usize = 30;

/// Widest supported entry key.
pub const MAX_KEY_WIDTH: usize = 30;

/// Extension of committed entries.
pub const DEFAULT_EXTENSION: &str = "json";

/// Extension appended to an entry name while it is being written.
pub const DEFAULT_STAGING_EXTENSION: &str = "tmp";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub directory:         PathBuf,
    pub key_width:         usize,
    pub extension:         String,
    pub staging_extension: String,
    pub flush_mode:        FlushMode,
    pub remove_failure:    RemoveFailure,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            directory:         PathBuf::from("queue"),
            key_width:         DEFAULT_KEY_WIDTH,
            extension:         DEFAULT_EXTENSION.to_string(),
            staging_extension: DEFAULT_STAGING_EXTENSION.to_string(),
            flush_mode:        FlushMode::Sync,
            remove_failure:    RemoveFailure::Fail,
        }
    }
}

impl QueueConfig {
    /// Check the naming scheme for consistency.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=MAX_KEY_WIDTH).contains(&self.key_width),
            InvalidConfigSnafu {
                reason: format!(
                    "key width must be between 1 and {MAX_KEY_WIDTH}, got {}",
                    self.key_width
                ),
            }
        );
        validate_extension("extension", &self.extension)?;
        validate_extension("staging extension", &self.staging_extension)?;
        ensure!(
            self.extension != self.staging_extension,
            InvalidConfigSnafu {
                reason: "extension and staging extension must differ".to_string(),
            }
        );
        Ok(())
    }

    /// Largest sequence number that still fits the configured key width.
    ///
    /// `u64::MAX` itself is never handed out so the counter can always
    /// advance past the last assigned number.
    #[must_use]
    pub fn max_sequence(&self) -> u64 {
        u32::try_from(self.key_width)
            .ok()
            .and_then(|width| 10u64.checked_pow(width))
            .map_or(u64::MAX - 1, |limit| (limit - 1).min(u64::MAX - 1))
    }
}

fn validate_extension(what: &str, ext: &str) -> Result<()> {
    ensure!(
        !ext.is_empty() && !ext.contains(['.', '/', '\\']),
        InvalidConfigSnafu {
            reason: format!("{what} must be a non-empty name without separators, got {ext:?}"),
        }
    );
    Ok(())
}

/// Durability of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Leave flushing to the operating system.
    Async,
    /// fsync the staged payload before the commit rename and the directory
    /// after it.
    #[default]
    Sync,
}

/// What `remove_first` does when the head entry cannot be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoveFailure {
    /// Fail the call and keep the entry at the head.
    #[default]
    Fail,
    /// Log the failure and drop the entry from memory anyway. The file is
    /// picked up again on the next restart.
    Advance,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(1, 9 ; "one digit")]
    #[test_case(4, 9_999 ; "four digits")]
    #[test_case(19, 9_999_999_999_999_999_999 ; "nineteen digits")]
    #[test_case(20, u64::MAX - 1 ; "twenty digits")]
    #[test_case(30, u64::MAX - 1 ; "thirty digits")]
    fn test_max_sequence(width: usize, expected: u64) {
        let config = QueueConfig {
            key_width: width,
            ..Default::default()
        };
        assert_eq!(config.max_sequence(), expected);
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = QueueConfig::default();
        config.validate().unwrap();
        assert_eq!(config.key_width, 30);
        assert_eq!(config.extension, "json");
        assert_eq!(config.staging_extension, "tmp");
        assert_eq!(config.flush_mode, FlushMode::Sync);
        assert_eq!(config.remove_failure, RemoveFailure::Fail);
    }

    #[test_case(0 ; "zero width")]
    #[test_case(31 ; "too wide")]
    fn test_invalid_width(width: usize) {
        let config = QueueConfig {
            key_width: width,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test_case("", "tmp" ; "empty extension")]
    #[test_case("json", "" ; "empty staging extension")]
    #[test_case("j.son", "tmp" ; "dotted extension")]
    #[test_case("json", "json" ; "same extensions")]
    fn test_invalid_extensions(ext: &str, staging: &str) {
        let config = QueueConfig {
            extension: ext.to_string(),
            staging_extension: staging.to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
