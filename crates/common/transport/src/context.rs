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

//! Process-wide transport context.
//!
//! A [`Transport`] owns the ZeroMQ context. It is created once at process
//! start and handed by reference to every component that needs a socket, so
//! no component reaches for a hidden global context.
//!
//! All sockets are created with a zero linger period: closing a socket never
//! blocks on undelivered messages.

use std::fmt;

use snafu::ResultExt;
use tracing::debug;

use crate::error::{BindSnafu, ConnectSnafu, CreateSocketSnafu, Result, SetOptionSnafu};

#[derive(Clone)]
pub struct Transport {
    context: zmq::Context,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

impl Default for Transport {
    fn default() -> Self { Self::new() }
}

impl Transport {
    #[must_use]
    pub fn new() -> Self {
        Self {
            context: zmq::Context::new(),
        }
    }

    /// A subscriber connected to `endpoint`, subscribed to every message.
    pub fn subscriber(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::SUB, "SUB")?;
        socket
            .set_subscribe(b"")
            .context(SetOptionSnafu { option: "subscribe" })?;
        connect(&socket, endpoint)?;
        Ok(socket)
    }

    /// A publisher bound to `endpoint`.
    pub fn publisher(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::PUB, "PUB")?;
        bind(&socket, endpoint)?;
        Ok(socket)
    }

    /// A reply socket bound to `endpoint`.
    pub fn reply_server(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::REP, "REP")?;
        bind(&socket, endpoint)?;
        Ok(socket)
    }

    /// A request socket connected to `endpoint`.
    pub fn request_client(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::REQ, "REQ")?;
        connect(&socket, endpoint)?;
        Ok(socket)
    }

    /// The bound end of an exclusive pair.
    pub fn pair_bind(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::PAIR, "PAIR")?;
        bind(&socket, endpoint)?;
        Ok(socket)
    }

    /// The connecting end of an exclusive pair.
    pub fn pair_connect(&self, endpoint: &str) -> Result<zmq::Socket> {
        let socket = self.socket(zmq::PAIR, "PAIR")?;
        connect(&socket, endpoint)?;
        Ok(socket)
    }

    fn socket(&self, socket_type: zmq::SocketType, kind: &'static str) -> Result<zmq::Socket> {
        let socket = self
            .context
            .socket(socket_type)
            .context(CreateSocketSnafu { kind })?;
        socket
            .set_linger(0)
            .context(SetOptionSnafu { option: "linger" })?;
        Ok(socket)
    }
}

fn bind(socket: &zmq::Socket, endpoint: &str) -> Result<()> {
    socket.bind(endpoint).context(BindSnafu { endpoint })?;
    debug!(endpoint, "Socket bound");
    Ok(())
}

fn connect(socket: &zmq::Socket, endpoint: &str) -> Result<()> {
    socket.connect(endpoint).context(ConnectSnafu { endpoint })?;
    debug!(endpoint, "Socket connected");
    Ok(())
}

/// Formats a TCP endpoint from a host and port: `tcp://{host}:{port}`.
#[must_use]
pub fn tcp_endpoint(host: &str, port: u16) -> String { format!("tcp://{host}:{port}") }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_endpoint() {
        assert_eq!(tcp_endpoint("*", 5557), "tcp://*:5557");
        assert_eq!(tcp_endpoint("localhost", 5556), "tcp://localhost:5556");
    }

    #[test]
    fn test_pair_roundtrip_over_inproc() {
        let transport = Transport::new();
        let bound = transport.pair_bind("inproc://transport-pair-test").unwrap();
        let connected = transport.pair_connect("inproc://transport-pair-test").unwrap();

        bound.send(&b"ping"[..], 0).unwrap();
        assert_eq!(connected.recv_bytes(0).unwrap(), b"ping");
    }

    #[test]
    fn test_bind_twice_fails() {
        let transport = Transport::new();
        let _first = transport.reply_server("inproc://transport-bind-twice").unwrap();
        let err = transport
            .reply_server("inproc://transport-bind-twice")
            .err().unwrap();
        assert!(matches!(err, crate::Error::Bind { .. }));
    }
}
