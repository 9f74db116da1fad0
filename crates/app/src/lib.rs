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

//! Process wiring for the `spoolmq` binary.
//!
//! [`run_queue`] assembles the queue process: store, ingestion bridge and
//! control loop. [`serve_gateway`] runs the HTTP gateway until Ctrl+C or
//! SIGTERM.

pub mod error;
pub mod settings;

use std::sync::Arc;

use bytes::Bytes;
use snafu::ResultExt;
use spoolmq_bridge::{BoxError, Fault, PubSubBridge};
use spoolmq_common_storage_queue::QueueStore;
use spoolmq_common_transport::Transport;
use spoolmq_gateway::start_gateway_server;
use spoolmq_server::ControlLoop;
use tracing::{debug, error, info};
use validator::Validate;

pub use crate::{
    error::{Error, Result},
    settings::Settings,
};
use crate::error::{
    ControlLoopSnafu, GatewaySnafu, InvalidConfigSnafu, OpenStoreSnafu, RuntimeSnafu,
    StartBridgeSnafu, SubscribeSnafu,
};

/// Runs the queue process until the control loop fails.
///
/// The bridge lives for the duration of the call and is shut down on every
/// exit path.
pub fn run_queue(settings: &Settings) -> Result<()> {
    let transport = Transport::new();

    let store = Arc::new(QueueStore::open(settings.queue.clone()).context(OpenStoreSnafu)?);
    info!(
        directory = %store.directory().display(),
        entries = store.len(),
        next_sequence = store.next_sequence(),
        "Queue store opened"
    );

    let endpoint = settings.subscriber.endpoint();
    let subscriber = transport
        .subscriber(&endpoint)
        .context(SubscribeSnafu { endpoint: &endpoint })?;
    info!(%endpoint, "Subscriber connected");

    let sink_store = Arc::clone(&store);
    let sink = move |payload: Bytes| -> std::result::Result<(), BoxError> {
        let sequence = sink_store.add_message(payload)?;
        debug!(sequence, "Queued message");
        Ok(())
    };
    let faults = |fault: Fault| error!(error = ?fault, "Ingestion stopped");
    let _bridge =
        PubSubBridge::spawn(&transport, subscriber, sink, faults).context(StartBridgeSnafu)?;

    let control = ControlLoop::new(
        &transport,
        &settings.server.endpoint(),
        store,
        settings.server.control_loop_options(),
    )
    .context(ControlLoopSnafu)?;
    control.run().context(ControlLoopSnafu)
}

/// Builds the gateway runtime and serves until a shutdown signal.
pub fn serve_gateway(settings: &Settings) -> Result<()> {
    settings.gateway.validate().context(InvalidConfigSnafu)?;
    let runtime = settings.runtime.create().context(RuntimeSnafu)?;
    runtime.block_on(run_gateway(settings))
}

async fn run_gateway(settings: &Settings) -> Result<()> {
    let transport = Transport::new();
    let handler = start_gateway_server(&settings.gateway, &transport)
        .await
        .context(GatewaySnafu)?;
    info!(addr = %handler.local_addr(), "Gateway listening");

    shutdown_signal().await;
    info!("Shutting down gateway");
    handler.shutdown();
    handler.wait_for_stop().await.context(GatewaySnafu)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C signal"); },
        () = terminate => { info!("Received terminate signal"); },
    }
}
