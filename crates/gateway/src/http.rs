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

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use snafu::ResultExt;
use spoolmq_common_transport::Transport;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{
    archive::ArchiveSink,
    auth::{Credentials, require_basic_auth},
    config::GatewayConfig,
    error::{BindListenerSnafu, JoinSnafu, ParseAddressSnafu, PublisherSnafu, Result},
    handler::{self, GatewayState},
};

/// Handle to a running gateway server.
pub struct ServiceHandler {
    /// Join handle for the server task
    join_handle:        JoinHandle<()>,
    /// Token for signalling shutdown
    cancellation_token: CancellationToken,
    local_addr:         SocketAddr,
}

impl ServiceHandler {
    /// The address the listener is bound to.
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Signals the server to begin graceful shutdown.
    ///
    /// Does not wait; use [`wait_for_stop`](Self::wait_for_stop) for that.
    pub fn shutdown(&self) { self.cancellation_token.cancel(); }

    /// Waits for the server task to finish.
    pub async fn wait_for_stop(self) -> Result<()> { self.join_handle.await.context(JoinSnafu) }

    pub fn is_finished(&self) -> bool { self.join_handle.is_finished() }
}

/// Binds the publisher and the HTTP listener, then serves on a spawned task.
///
/// Both binds happen before this returns, so address conflicts surface here
/// rather than inside the task.
pub async fn start_gateway_server(
    config: &GatewayConfig,
    transport: &Transport,
) -> Result<ServiceHandler> {
    let bind_addr = config
        .bind_address
        .parse::<SocketAddr>()
        .context(ParseAddressSnafu {
            addr: &config.bind_address,
        })?;

    let publisher = transport
        .publisher(&config.publish_address)
        .context(PublisherSnafu)?;
    info!(endpoint = %config.publish_address, "Gateway publisher bound");

    let archive = ArchiveSink::new(&config.archive_dir).with_clock(config.archive_clock);
    let state = GatewayState::new(publisher, archive);
    let router = build_router(config, state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .context(BindListenerSnafu { addr: bind_addr })?;
    let local_addr = listener
        .local_addr()
        .context(BindListenerSnafu { addr: bind_addr })?;

    let cancellation_token = CancellationToken::new();
    let shutdown = cancellation_token.clone();
    let join_handle = tokio::spawn(async move {
        info!(%local_addr, "Gateway server started");
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                info!(%local_addr, "Gateway server received shutdown signal");
            })
            .await;
        match result {
            Ok(()) => info!(%local_addr, "Gateway server stopped"),
            Err(e) => error!(%local_addr, error = %e, "Gateway server failed"),
        }
    });

    Ok(ServiceHandler {
        join_handle,
        cancellation_token,
        local_addr,
    })
}

fn build_router(config: &GatewayConfig, state: GatewayState) -> Router {
    let credentials = Arc::new(Credentials::new(
        &config.basic_auth_user,
        &config.basic_auth_password,
    ));

    let results = Router::new()
        .route("/results/flower", post(handler::flower))
        .route("/results/pollinator", post(handler::pollinator))
        .route_layer(middleware::from_fn_with_state(
            credentials,
            require_basic_auth,
        ))
        .with_state(state);

    let mut router = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/health", get(api_health_handler))
        .merge(results)
        .layer(DefaultBodyLimit::max(config.max_body_size));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        router = router.layer(cors);
    }
    router
}

async fn health_check() -> impl IntoResponse { (StatusCode::OK, "OK") }

async fn api_health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": "spoolmq-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
