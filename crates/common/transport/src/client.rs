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

//! Blocking consumer for a running control loop.

use std::fmt;

use snafu::ResultExt;
use tracing::debug;

use crate::{
    Transport,
    error::{ReceiveSnafu, Result, SendSnafu, UnexpectedResponseSnafu},
    protocol::{Opcode, Response},
};

/// A REQ-socket client speaking the queue protocol.
///
/// Calls block until the server answers; there is no timeout.
pub struct QueueClient {
    socket:   zmq::Socket,
    endpoint: String,
}

impl fmt::Debug for QueueClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl QueueClient {
    pub fn connect(transport: &Transport, endpoint: &str) -> Result<Self> {
        Ok(Self {
            socket:   transport.request_client(endpoint)?,
            endpoint: endpoint.to_string(),
        })
    }

    /// Sends one request and waits for its response.
    pub fn request(&self, opcode: Opcode) -> Result<Response> {
        debug!(%opcode, endpoint = %self.endpoint, "Sending request");
        self.socket.send(opcode.encode(), 0).context(SendSnafu)?;
        let frame = self.socket.recv_bytes(0).context(ReceiveSnafu)?;
        Response::decode(&frame)
    }

    /// The head message, left in place.
    ///
    /// Messages are returned as the JSON text the server sent.
    pub fn peek(&self) -> Result<Option<Vec<u8>>> { self.fetch(Opcode::Peek) }

    /// The head message, removed from the queue.
    pub fn pop(&self) -> Result<Option<Vec<u8>>> { self.fetch(Opcode::Pop) }

    /// Removes the head message without returning it.
    pub fn discard(&self) -> Result<()> {
        match self.request(Opcode::DequeueOnly)? {
            Response::Acknowledged => Ok(()),
            other => unexpected(&other),
        }
    }

    fn fetch(&self, opcode: Opcode) -> Result<Option<Vec<u8>>> {
        match self.request(opcode)? {
            Response::Message(text) => Ok(Some(text)),
            Response::NoData => Ok(None),
            other => unexpected(&other),
        }
    }
}

fn unexpected<T>(response: &Response) -> Result<T> {
    UnexpectedResponseSnafu {
        response: String::from_utf8_lossy(&response.encode()).into_owned(),
    }
    .fail()
}
