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

//! Layered configuration.
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. an optional file (TOML, YAML or JSON, picked by extension)
//! 3. environment variables such as `SPOOLMQ__SERVER__PORT=6000`

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::{ResultExt, ensure};
use spoolmq_common_runtime::RuntimeOptions;
use spoolmq_common_storage_queue::QueueConfig;
use spoolmq_common_telemetry::LoggingOptions;
use spoolmq_common_transport::tcp_endpoint;
use spoolmq_gateway::GatewayConfig;
use spoolmq_server::{ControlLoopOptions, PopMode};
use validator::{Validate, ValidationError};

use crate::error::{ConfigFileMissingSnafu, InvalidConfigSnafu, LoadConfigSnafu, Result};

pub const ENV_PREFIX: &str = "SPOOLMQ";
pub const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct Settings {
    #[validate(custom(function = "validate_queue"))]
    pub queue:      QueueConfig,
    #[validate(nested)]
    pub subscriber: SubscriberSettings,
    #[validate(nested)]
    pub server:     ServerSettings,
    /// Checked only when the gateway is started.
    pub gateway:    GatewayConfig,
    /// Runtime for the gateway.
    #[default(RuntimeOptions { thread_name: "spoolmq-gateway".to_string(), ..RuntimeOptions::default() })]
    pub runtime:    RuntimeOptions,
    pub logging:    LoggingOptions,
}

/// Where the queue process receives published messages from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct SubscriberSettings {
    #[default = "localhost"]
    #[validate(length(min = 1))]
    pub host: String,
    #[default = 5556]
    #[validate(range(min = 1))]
    pub port: u16,
}

impl SubscriberSettings {
    pub fn endpoint(&self) -> String { tcp_endpoint(&self.host, self.port) }
}

/// The control loop's bind address and behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[default = "*"]
    #[validate(length(min = 1))]
    pub host:          String,
    #[default = 5557]
    #[validate(range(min = 1))]
    pub port:          u16,
    pub pop_mode:      PopMode,
    #[default = 10]
    pub idle_pause_ms: u64,
}

impl ServerSettings {
    pub fn endpoint(&self) -> String { tcp_endpoint(&self.host, self.port) }

    /// Endpoint a local client connects to. Wildcard hosts become
    /// `localhost`.
    pub fn client_endpoint(&self) -> String {
        let host = match self.host.as_str() {
            "*" | "0.0.0.0" => "localhost",
            host => host,
        };
        tcp_endpoint(host, self.port)
    }

    pub fn control_loop_options(&self) -> ControlLoopOptions {
        ControlLoopOptions::builder()
            .pop_mode(self.pop_mode)
            .idle_pause(Duration::from_millis(self.idle_pause_ms))
            .build()
    }
}

impl Settings {
    /// Loads settings from defaults, `path` and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Like [`load`](Self::load), reading variables from `env` instead of
    /// the process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self> {
        let defaults = config::Config::try_from(&Self::default()).context(LoadConfigSnafu)?;
        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            ensure!(path.is_file(), ConfigFileMissingSnafu { path });
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env),
        );

        let settings: Self = builder
            .build()
            .and_then(|config| config.try_deserialize())
            .context(LoadConfigSnafu)?;
        settings.validate().context(InvalidConfigSnafu)?;
        Ok(settings)
    }
}

fn validate_queue(queue: &QueueConfig) -> std::result::Result<(), ValidationError> {
    queue
        .validate()
        .map_err(|e| ValidationError::new("queue").with_message(e.to_string().into()))
}

#[cfg(test)]
mod tests {
    use std::{fs, path::PathBuf};

    use spoolmq_common_storage_queue::{FlushMode, RemoveFailure};
    use spoolmq_gateway::ArchiveClock;
    use tempfile::TempDir;
    use test_case::test_case;

    use super::*;
    use crate::error::Error;

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.queue.directory, PathBuf::from("queue"));
        assert_eq!(settings.queue.key_width, 30);
        assert_eq!(settings.subscriber.endpoint(), "tcp://localhost:5556");
        assert_eq!(settings.server.endpoint(), "tcp://*:5557");
        assert_eq!(settings.server.client_endpoint(), "tcp://localhost:5557");
        assert_eq!(settings.server.pop_mode, PopMode::RespondThenRemove);
        assert_eq!(settings.runtime.thread_name, "spoolmq-gateway");
    }

    #[test_case("toml", r#"
[queue]
directory = "/var/spool/mq"
flush_mode = "async"
remove_failure = "advance"

[subscriber]
host = "broker"
port = 6001

[server]
pop_mode = "remove_then_respond"
idle_pause_ms = 0
"# ; "toml")]
    #[test_case("yaml", r#"
queue:
  directory: /var/spool/mq
  flush_mode: async
  remove_failure: advance
subscriber:
  host: broker
  port: 6001
server:
  pop_mode: remove_then_respond
  idle_pause_ms: 0
"# ; "yaml")]
    fn test_file_overrides_defaults(extension: &str, contents: &str) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(format!("spoolmq.{extension}"));
        fs::write(&path, contents).unwrap();

        let settings = Settings::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(settings.queue.directory, PathBuf::from("/var/spool/mq"));
        assert_eq!(settings.queue.flush_mode, FlushMode::Async);
        assert_eq!(settings.queue.remove_failure, RemoveFailure::Advance);
        assert_eq!(settings.queue.extension, "json");
        assert_eq!(settings.subscriber.endpoint(), "tcp://broker:6001");
        assert_eq!(settings.server.pop_mode, PopMode::RemoveThenRespond);
        assert_eq!(
            settings.server.control_loop_options().idle_pause,
            Duration::ZERO
        );
        assert_eq!(settings.server.port, 5557);
    }

    #[test]
    fn test_environment_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spoolmq.toml");
        fs::write(&path, "[server]\nport = 7000\nhost = \"127.0.0.1\"\n").unwrap();

        let settings = Settings::load_with_env(
            Some(&path),
            env(&[
                ("SPOOLMQ__SERVER__PORT", "7100"),
                ("SPOOLMQ__QUEUE__KEY_WIDTH", "12"),
                ("SPOOLMQ__GATEWAY__BASIC_AUTH_USER", "station"),
                ("SPOOLMQ__GATEWAY__ARCHIVE_CLOCK", "as_given"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.server.endpoint(), "tcp://127.0.0.1:7100");
        assert_eq!(settings.queue.key_width, 12);
        assert_eq!(settings.gateway.basic_auth_user, "station");
        assert_eq!(settings.gateway.archive_clock, ArchiveClock::AsGiven);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load_with_env(Some(&dir.path().join("absent.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigFileMissing { .. }));
    }

    #[test_case(&[("SPOOLMQ__QUEUE__KEY_WIDTH", "31")] ; "key width too large")]
    #[test_case(&[("SPOOLMQ__QUEUE__EXTENSION", "tmp")] ; "extensions collide")]
    #[test_case(&[("SPOOLMQ__SUBSCRIBER__HOST", "")] ; "empty subscriber host")]
    #[test_case(&[("SPOOLMQ__SERVER__PORT", "0")] ; "zero port")]
    fn test_invalid_settings_are_rejected(vars: &[(&str, &str)]) {
        let err = Settings::load_with_env(None, env(vars)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }), "{err:?}");
    }

    #[test]
    fn test_unknown_pop_mode_fails_to_load() {
        let err = Settings::load_with_env(None, env(&[("SPOOLMQ__SERVER__POP_MODE", "never")]))
            .unwrap_err();
        assert!(matches!(err, Error::LoadConfig { .. }));
    }
}
