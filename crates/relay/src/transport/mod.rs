// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP transport for the authorization relay.

pub mod http;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::RelayState;

/// Build the axum `Router` with the relay legs.
///
/// Every route is public by design: `start` and `callback` are driven by the
/// user's browser, `token` and `refresh` by the local agent. Possession of
/// an unguessable session id is the access control.
pub fn build_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/healthz", get(http::healthz))
        // Leg 1: local agent opens the browser here.
        .route("/auth/start", get(http::auth_start))
        // Leg 2: identity provider redirects here after consent.
        .route("/auth/callback", get(http::auth_callback))
        // Leg 3: local agent picks up tokens (one-time use).
        .route("/auth/token", post(http::auth_token))
        // Stateless refresh exchange.
        .route("/auth/refresh", post(http::auth_refresh))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
