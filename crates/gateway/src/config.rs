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

use std::{net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use validator::{Validate, ValidationError};

use crate::archive::ArchiveClock;

pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, SmartDefault, Validate, bon::Builder)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP server listens on.
    #[default = "0.0.0.0:8080"]
    #[builder(default = "0.0.0.0:8080".to_string())]
    #[validate(custom(function = "validate_socket_addr"))]
    pub bind_address: String,

    #[builder(default)]
    #[validate(length(min = 1, message = "basic auth user must be set"))]
    pub basic_auth_user: String,

    #[builder(default)]
    #[validate(length(min = 1, message = "basic auth password must be set"))]
    pub basic_auth_password: String,

    /// Endpoint the flower results are published on; the queue process
    /// subscribes to it.
    #[default = "tcp://*:5556"]
    #[builder(default = "tcp://*:5556".to_string())]
    #[validate(length(min = 1))]
    pub publish_address: String,

    /// Root of the pollinator archive.
    #[default(PathBuf::from("results"))]
    #[builder(default = PathBuf::from("results"))]
    pub archive_dir: PathBuf,

    /// Clock that offset capture times are filed under.
    #[builder(default)]
    pub archive_clock: ArchiveClock,

    /// Maximum accepted request body, in bytes.
    #[default(DEFAULT_MAX_BODY_SIZE)]
    #[builder(default = DEFAULT_MAX_BODY_SIZE)]
    #[validate(range(min = 1))]
    pub max_body_size: usize,

    #[default = true]
    #[builder(default = true)]
    pub enable_cors: bool,
}

fn validate_socket_addr(addr: &str) -> Result<(), ValidationError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("socket_addr"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_need_credentials() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0:8080");
        assert_eq!(config.publish_address, "tcp://*:5556");
        assert_eq!(config.archive_dir, PathBuf::from("results"));
        assert_eq!(config.archive_clock, ArchiveClock::Utc);

        let errors = config.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("basic_auth_user"));
        assert!(fields.contains_key("basic_auth_password"));
    }

    #[test]
    fn test_builder_produces_valid_config() {
        let config = GatewayConfig::builder()
            .basic_auth_user("user".to_string())
            .basic_auth_password("secret".to_string())
            .build();
        config.validate().unwrap();
        assert_eq!(
            config,
            GatewayConfig {
                basic_auth_user: "user".to_string(),
                basic_auth_password: "secret".to_string(),
                ..GatewayConfig::default()
            }
        );
    }

    #[test]
    fn test_rejects_bad_bind_address() {
        let config = GatewayConfig {
            bind_address: "localhost".to_string(),
            basic_auth_user: "user".to_string(),
            basic_auth_password: "secret".to_string(),
            ..GatewayConfig::default()
        };
        let errors = config.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bind_address"));
    }
}
