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

use crate::{FlushMode, QueueConfig, QueueStore, RemoveFailure, Result};

pub struct QueueBuilder {
    config: QueueConfig,
}

impl QueueBuilder {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            config: QueueConfig {
                directory: directory.into(),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub const fn key_width(mut self, width: usize) -> Self {
        self.config.key_width = width;
        self
    }

    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.config.extension = extension.into();
        self
    }

    #[must_use]
    pub fn staging_extension(mut self, extension: impl Into<String>) -> Self {
        self.config.staging_extension = extension.into();
        self
    }

    #[must_use]
    pub const fn flush_mode(mut self, mode: FlushMode) -> Self {
        self.config.flush_mode = mode;
        self
    }

    #[must_use]
    pub const fn remove_failure(mut self, policy: RemoveFailure) -> Self {
        self.config.remove_failure = policy;
        self
    }

    pub fn build(self) -> Result<QueueStore> { QueueStore::open(self.config) }
}
