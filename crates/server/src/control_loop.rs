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

use std::{fmt, sync::Arc, thread, time::Duration};

use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::ResultExt;
use spoolmq_common_storage_queue::QueueStore;
use spoolmq_common_transport::{Opcode, Response, Transport, zmq};
use tracing::{debug, error, info, warn};

use crate::error::{
    BindSnafu, MalformedRequestSnafu, ReceiveRequestSnafu, Result, SendResponseSnafu, StoreSnafu,
};

/// Order of the reply and the removal when serving POP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopMode {
    /// Reply first, then remove. A crash in between redelivers the message
    /// after restart (at-least-once).
    #[default]
    RespondThenRemove,
    /// Remove first, then reply. A crash in between loses the message
    /// (at-most-once).
    RemoveThenRespond,
}

#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, bon::Builder)]
pub struct ControlLoopOptions {
    #[builder(default)]
    pub pop_mode:   PopMode,
    /// Pause between cycles in [`ControlLoop::run`].
    #[default(Duration::from_millis(10))]
    #[builder(default = Duration::from_millis(10))]
    pub idle_pause: Duration,
}

/// Single-threaded REP server over a [`QueueStore`].
pub struct ControlLoop {
    socket:   zmq::Socket,
    endpoint: String,
    store:    Arc<QueueStore>,
    options:  ControlLoopOptions,
}

impl fmt::Debug for ControlLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlLoop")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl ControlLoop {
    pub fn new(
        transport: &Transport,
        endpoint: &str,
        store: Arc<QueueStore>,
        options: ControlLoopOptions,
    ) -> Result<Self> {
        let socket = transport
            .reply_server(endpoint)
            .context(BindSnafu { endpoint })?;
        info!(endpoint, pop_mode = ?options.pop_mode, "Control loop bound");
        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
            store,
            options,
        })
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    /// Serves requests until the transport fails.
    ///
    /// Malformed requests and store failures are logged and serving goes on.
    pub fn run(&self) -> Result<()> {
        info!(endpoint = %self.endpoint, "Control loop serving");
        loop {
            match self.serve_one() {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Control loop stopped");
                    return Err(e);
                }
                Err(e) => warn!(error = ?e, "Request cycle failed"),
            }
            if !self.options.idle_pause.is_zero() {
                thread::sleep(self.options.idle_pause);
            }
        }
    }

    /// Receives one request and sends exactly one response.
    ///
    /// Returns the response that was sent. A malformed request is answered
    /// with [`Response::Rejected`] before the error is returned.
    pub fn serve_one(&self) -> Result<Response> {
        let frame = self.socket.recv_bytes(0).context(ReceiveRequestSnafu)?;
        let opcode = match Opcode::decode(&frame) {
            Ok(opcode) => opcode,
            Err(source) => {
                self.reply(&Response::Rejected)?;
                return Err(source).context(MalformedRequestSnafu);
            }
        };
        debug!(%opcode, "Received request");

        match opcode {
            Opcode::Peek => self.peek(),
            Opcode::Pop => self.pop(),
            Opcode::DequeueOnly => self.dequeue_only(),
        }
    }

    fn peek(&self) -> Result<Response> {
        let response = self
            .store
            .front()
            .map_or(Response::NoData, |payload| Response::message(&payload));
        self.reply(&response)?;
        Ok(response)
    }

    fn pop(&self) -> Result<Response> {
        let Some(payload) = self.store.front() else {
            self.reply(&Response::NoData)?;
            return Ok(Response::NoData);
        };
        let response = Response::message(&payload);

        match self.options.pop_mode {
            PopMode::RespondThenRemove => {
                self.reply(&response)?;
                self.store
                    .remove_first()
                    .context(StoreSnafu { opcode: Opcode::Pop })?;
            }
            PopMode::RemoveThenRespond => {
                if let Err(source) = self.store.remove_first() {
                    self.reply(&Response::NoData)?;
                    return Err(source).context(StoreSnafu { opcode: Opcode::Pop });
                }
                self.reply(&response)?;
            }
        }
        Ok(response)
    }

    fn dequeue_only(&self) -> Result<Response> {
        match self.store.remove_first() {
            Ok(removed) => {
                debug!(removed, "Dequeued head");
                self.reply(&Response::Acknowledged)?;
                Ok(Response::Acknowledged)
            }
            Err(source) => {
                self.reply(&Response::Rejected)?;
                Err(source).context(StoreSnafu {
                    opcode: Opcode::DequeueOnly,
                })
            }
        }
    }

    fn reply(&self, response: &Response) -> Result<()> {
        self.socket
            .send(response.encode(), 0)
            .context(SendResponseSnafu)
    }
}
