// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authorization relay: brokers OAuth handshakes for local agents that have
//! no public network identity and must not hold the confidential client
//! secret. See `transport::http` for the three legs.

pub mod config;
pub mod error;
pub mod oauth;
pub mod secret;
pub mod session;
pub mod state;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::state::RelayState;
use crate::transport::build_router;

/// Run the relay server until shutdown.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let ttl = config.session_ttl();
    let reap_interval = config.reap_interval();
    let state = Arc::new(RelayState::new(config, shutdown.clone()));

    crate::session::spawn_reaper(
        Arc::clone(&state.sessions),
        ttl,
        reap_interval,
        shutdown.clone(),
    );

    tracing::info!(
        domain = %state.config.allowed_domain,
        "relay listening on {addr}"
    );
    let router = build_router(state);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
