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

use snafu::{Location, Snafu};
use spoolmq_common_storage_queue::QueueError;
use spoolmq_common_transport::{Opcode, zmq};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to bind control endpoint {endpoint}"))]
    Bind {
        endpoint: String,
        source:   spoolmq_common_transport::Error,
        #[snafu(implicit)]
        loc:      Location,
    },

    #[snafu(display("Failed to receive request"))]
    ReceiveRequest {
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to send response"))]
    SendResponse {
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Rejected malformed request"))]
    MalformedRequest {
        source: spoolmq_common_transport::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Store failed while serving {opcode}"))]
    Store {
        opcode: Opcode,
        source: QueueError,
        #[snafu(implicit)]
        loc:    Location,
    },
}

impl Error {
    /// Whether the loop can no longer keep request/response alternation.
    ///
    /// Malformed requests and store failures have already been answered, so
    /// serving can continue after them.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Bind { .. } | Self::ReceiveRequest { .. } | Self::SendResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
