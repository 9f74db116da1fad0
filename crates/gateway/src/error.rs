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

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use snafu::{Location, Snafu};

/// Errors starting or running the gateway.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to parse address {addr}"))]
    ParseAddress {
        addr:   String,
        source: std::net::AddrParseError,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to bind HTTP listener on {addr}"))]
    BindListener {
        addr:   SocketAddr,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to bind publisher"))]
    Publisher {
        source: spoolmq_common_transport::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Gateway server task failed"))]
    Join {
        source: tokio::task::JoinError,
        #[snafu(implicit)]
        loc:    Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why a record could not be archived.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum ArchiveError {
    #[snafu(display("Record has no `metadata.{field}`"))]
    MissingField { field: &'static str },

    #[snafu(display("Node id {node_id:?} cannot be used as a directory name"))]
    InvalidNodeId { node_id: String },

    #[snafu(display("Unparseable capture timestamp {raw:?}"))]
    InvalidTimestamp { raw: String },

    #[snafu(display("Failed to create archive directory {}", path.display()))]
    CreateDir {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write archive file {}", path.display()))]
    WriteRecord {
        path:   PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Failed to encode record"))]
    EncodeRecord { source: serde_json::Error },
}

/// Body of every result endpoint response.
#[derive(Debug, Serialize)]
pub struct ResultBody {
    pub result:      &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

impl ResultBody {
    pub const OK: Self = Self {
        result:      "ok",
        description: None,
    };
}

/// Failures reported to HTTP clients.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApiError {
    #[snafu(display("Unauthorized"))]
    Unauthorized,

    #[snafu(display("Request body is not a JSON record"))]
    InvalidBody,

    #[snafu(display("Failed to publish record"))]
    PublishFailed,

    #[snafu(display("Failed to store record"))]
    StoreFailed { source: ArchiveError },
}

impl ApiError {
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::InvalidBody => StatusCode::BAD_REQUEST,
            Self::PublishFailed | Self::StoreFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn body(&self) -> ResultBody {
        let description = match self {
            Self::Unauthorized => Some("Unauthorized access."),
            Self::InvalidBody => None,
            Self::PublishFailed => Some("Failed to publish message."),
            Self::StoreFailed { .. } => Some("Failed to store message."),
        };
        ResultBody {
            result: "error",
            description,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.body())).into_response();
        if matches!(self, Self::Unauthorized) {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"spoolmq\""),
            );
        }
        response
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
