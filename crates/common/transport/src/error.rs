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

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to create {kind} socket"))]
    CreateSocket {
        kind:   &'static str,
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to bind {endpoint}"))]
    Bind {
        endpoint: String,
        source:   zmq::Error,
        #[snafu(implicit)]
        loc:      Location,
    },

    #[snafu(display("Failed to connect to {endpoint}"))]
    Connect {
        endpoint: String,
        source:   zmq::Error,
        #[snafu(implicit)]
        loc:      Location,
    },

    #[snafu(display("Failed to set socket option {option}"))]
    SetOption {
        option: &'static str,
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to send message"))]
    Send {
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to receive message"))]
    Receive {
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to poll sockets"))]
    Poll {
        source: zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Request is not an integer opcode"))]
    DecodeRequest {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Unknown opcode {code}"))]
    UnknownOpcode {
        code: i64,
        #[snafu(implicit)]
        loc:  Location,
    },

    #[snafu(display("Response is not valid JSON"))]
    DecodeResponse {
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Unexpected response {response}"))]
    UnexpectedResponse {
        response: String,
        #[snafu(implicit)]
        loc:      Location,
    },
}

impl Error {
    /// Whether the error was caused by a malformed request or response rather
    /// than by the transport.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::DecodeRequest { .. }
                | Self::UnknownOpcode { .. }
                | Self::DecodeResponse { .. }
                | Self::UnexpectedResponse { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
