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

use std::io;

use snafu::{Location, Snafu};

/// Boxed error returned by a [`MessageSink`](crate::MessageSink).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors starting or stopping a bridge.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to set up the bridge control channel"))]
    ControlChannel {
        source: spoolmq_common_transport::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to spawn the bridge thread"))]
    SpawnThread {
        source: io::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Failed to signal the bridge thread"))]
    SignalShutdown {
        source: spoolmq_common_transport::zmq::Error,
        #[snafu(implicit)]
        loc:    Location,
    },

    #[snafu(display("Bridge thread panicked"))]
    ThreadPanicked {
        #[snafu(implicit)]
        loc: Location,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Why the receive loop stopped on its own.
///
/// Delivered to the [`FaultHandler`](crate::FaultHandler). After a fault the
/// bridge does not restart; ingestion stays stopped until a new bridge is
/// spawned.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Fault {
    #[snafu(display("Ingestion callback failed"))]
    Callback { source: BoxError },

    #[snafu(display("Ingestion callback panicked: {message}"))]
    Panicked { message: String },

    #[snafu(display("Ingestion transport failed"))]
    Transport {
        source: spoolmq_common_transport::Error,
    },
}
