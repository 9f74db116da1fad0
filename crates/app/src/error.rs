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

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Config file {} does not exist", path.display()))]
    ConfigFileMissing {
        path: PathBuf,
        #[snafu(implicit)]
        loc:  Location,
    },

    #[snafu(display("Failed to load configuration"))]
    LoadConfig {
        source: config::ConfigError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Invalid configuration: {source}"))]
    InvalidConfig {
        source: validator::ValidationErrors,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to open queue store"))]
    OpenStore {
        source: spoolmq_common_storage_queue::QueueError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to subscribe to {endpoint}"))]
    Subscribe {
        endpoint: String,
        source:   spoolmq_common_transport::Error,
        #[snafu(implicit)]
        loc:      Location,
    },

    #[snafu(display("Failed to start ingestion bridge"))]
    StartBridge {
        source: spoolmq_bridge::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Control loop failed"))]
    ControlLoop {
        source: spoolmq_server::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Gateway failed"))]
    Gateway {
        source: spoolmq_gateway::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to build gateway runtime"))]
    Runtime {
        source: spoolmq_common_runtime::Error,
        #[snafu(implicit)]
        loc:    Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
