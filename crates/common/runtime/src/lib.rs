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

//! Tokio runtime construction.

mod error;
mod factory;
mod options;

pub use error::{Error, Result};
pub use options::{DEFAULT_THREAD_NAME, RuntimeOptions};
pub use tokio::runtime::Runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_threads_carry_configured_prefix() {
        let runtime = RuntimeOptions::builder()
            .thread_name("spoolmq-gateway".to_string())
            .worker_threads(2)
            .build()
            .create()
            .unwrap();

        let names = runtime.block_on(async {
            let mut names = Vec::new();
            for _ in 0..4 {
                let name = tokio::spawn(async { std::thread::current().name().map(String::from) })
                    .await
                    .unwrap();
                names.push(name.unwrap_or_default());
            }
            names
        });
        assert!(names.iter().all(|name| name.starts_with("spoolmq-gateway-")));
    }

    #[test]
    fn zero_worker_threads_falls_back_to_cpus() {
        let options = RuntimeOptions::builder().worker_threads(0).build();
        assert!(options.effective_worker_threads() >= 1);
        options.create().unwrap();
    }

    #[test]
    fn deserializes_partial_options() {
        let options: RuntimeOptions =
            serde_json::from_str(r#"{"worker_threads": 3, "thread_name": "gw"}"#).unwrap();
        assert_eq!(options.worker_threads, Some(3));
        assert_eq!(options.thread_name, "gw");
        assert!(options.enable_io);
        assert!(options.enable_time);

        let defaults: RuntimeOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(defaults, RuntimeOptions::default());
        assert_eq!(defaults.thread_name, DEFAULT_THREAD_NAME);
    }
}
