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

use std::thread::available_parallelism;

use bon::Builder;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

pub const DEFAULT_THREAD_NAME: &str = "spoolmq-rt";

/// Shape of a multi-thread Tokio runtime.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Builder, Serialize, Deserialize)]
#[builder(finish_fn = build)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Worker threads; the number of available CPUs when unset.
    #[default(None)]
    pub worker_threads: Option<usize>,

    #[default(DEFAULT_THREAD_NAME.to_string())]
    #[builder(default = DEFAULT_THREAD_NAME.to_string())]
    pub thread_name: String,

    #[default(true)]
    #[builder(default = true)]
    pub enable_io: bool,

    #[default(true)]
    #[builder(default = true)]
    pub enable_time: bool,
}

impl RuntimeOptions {
    #[must_use]
    pub fn effective_worker_threads(&self) -> usize {
        self.worker_threads
            .filter(|threads| *threads > 0)
            .unwrap_or_else(cpu_threads)
    }
}

pub(crate) fn cpu_threads() -> usize {
    available_parallelism()
        .map(std::num::NonZero::get)
        .unwrap_or(1)
        .max(1)
}
