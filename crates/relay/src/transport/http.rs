// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the three handshake legs and the stateless refresh.
//!
//! Browser-facing legs (`start`, `callback`) answer with redirects or
//! terminal HTML pages; agent-facing legs (`token`, `refresh`) use the JSON
//! error envelope.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::oauth::{self, TokenExchangeOutcome};
use crate::session::TokenPayload;
use crate::state::RelayState;

// -- Request/Response types ---------------------------------------------------

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub session_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct StartParams {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenPickupRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// -- Parameter validation -----------------------------------------------------

/// A session id is exactly 32 lowercase hex characters. Anything else is
/// rejected before it can reach the store or the downstream redirect — this
/// is the primary defense against query injection.
fn valid_session_id(id: &str) -> bool {
    id.len() == 32 && id.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// A callback port is 1-5 ASCII digits that parse to a nonzero u16.
fn parse_port(port: &str) -> Option<u16> {
    if port.is_empty() || port.len() > 5 || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match port.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(p) => Some(p),
    }
}

// -- Terminal HTML pages ------------------------------------------------------

/// `302 Found` — axum's `Redirect` helpers only cover 303/307/308, and the
/// provider contract here is a plain 302.
fn found(location: &str) -> axum::response::Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_owned())]).into_response()
}

fn page(heading: &str, detail: &str) -> Html<String> {
    Html(format!(
        "<html><body><h2>{heading}</h2><p>{detail}</p></body></html>"
    ))
}

fn failure_page() -> Html<String> {
    page("Authorization failed.", "You can close this tab.")
}

fn expired_page() -> Html<String> {
    page("Session expired.", "Please try again.")
}

// -- Handlers -----------------------------------------------------------------

/// `GET /healthz`
pub async fn healthz(State(s): State<Arc<RelayState>>) -> impl IntoResponse {
    Json(HealthResponse { status: "running".to_owned(), session_count: s.sessions.len().await })
}

/// `GET /auth/start` — leg 1: register a pending session and redirect the
/// browser to the identity provider.
pub async fn auth_start(
    State(s): State<Arc<RelayState>>,
    Query(params): Query<StartParams>,
) -> axum::response::Response {
    let session_id = match params.session_id.as_deref().filter(|id| valid_session_id(id)) {
        Some(id) => id.to_owned(),
        None => {
            return RelayError::BadRequest
                .to_http_response("invalid or missing session_id")
                .into_response()
        }
    };
    let port = match params.port.as_deref().and_then(parse_port) {
        Some(p) => p,
        None => {
            return RelayError::BadRequest
                .to_http_response("invalid or missing port")
                .into_response()
        }
    };

    s.sessions.insert(session_id.clone(), port).await;

    let auth_url = oauth::build_auth_url(
        &s.config.auth_url,
        &s.config.client_id,
        &s.config.redirect_uri(),
        &s.config.scopes,
        &session_id,
        &s.config.allowed_domain,
    );
    tracing::info!(session_id = %session_id, port, "handshake started");
    found(&auth_url)
}

/// `GET /auth/callback` — leg 2: the identity provider's redirect target.
///
/// Exchanges the code, enforces the domain restriction, attaches tokens to
/// the session, and bounces the browser to the local agent's listener. The
/// session is not deleted here — the agent has not picked the tokens up yet.
pub async fn auth_callback(
    State(s): State<Arc<RelayState>>,
    Query(params): Query<CallbackParams>,
) -> axum::response::Response {
    let (code, session_id) = match (&params.error, params.code, params.state) {
        (Some(err), _, _) => {
            tracing::warn!(error = %err, "provider reported authorization error");
            return failure_page().into_response();
        }
        (None, Some(code), Some(state)) => (code, state),
        _ => return failure_page().into_response(),
    };

    if !s.sessions.contains(&session_id).await {
        return expired_page().into_response();
    }

    let client_secret = match s.secret.resolve(&s.config).await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(err = %e, "client secret unavailable");
            return page("Authorization failed.", &e.to_string()).into_response();
        }
    };

    let outcome = oauth::exchange_code(
        &s.http,
        &s.config.token_url,
        &s.config.client_id,
        &client_secret,
        &code,
        &s.config.redirect_uri(),
    )
    .await;

    let token = match outcome {
        Ok(TokenExchangeOutcome::Ok(token)) => token,
        Ok(TokenExchangeOutcome::Err(provider_err)) => {
            tracing::warn!(session_id = %session_id, error = %provider_err.error, "token exchange rejected");
            return page("Token exchange failed.", provider_err.reason()).into_response();
        }
        Err(e) => {
            tracing::warn!(session_id = %session_id, err = %e, "token exchange request failed");
            return page("Token exchange failed.", &e.to_string()).into_response();
        }
    };

    // Authoritative domain enforcement: the account-chooser `hd` hint is
    // cosmetic; the claim in the ID token is what we trust.
    let claims = token.id_token.as_deref().map(oauth::decode_id_claims);
    let domain_ok = matches!(
        &claims,
        Some(Ok(c)) if c.hd.as_deref() == Some(s.config.allowed_domain.as_str())
    );
    if !domain_ok {
        s.sessions.remove(&session_id).await;
        tracing::warn!(session_id = %session_id, "domain restriction rejected identity");
        return page(
            "Access denied.",
            &format!("This tool is restricted to {} accounts.", s.config.allowed_domain),
        )
        .into_response();
    }

    let payload = TokenPayload {
        access_token: token.access_token,
        refresh_token: token.refresh_token.unwrap_or_default(),
        expires_in: token.expires_in,
    };
    let Some(port) = s.sessions.attach_tokens(&session_id, payload).await else {
        // Reaped between the contains() check and the exchange.
        return expired_page().into_response();
    };

    tracing::info!(session_id = %session_id, "handshake fulfilled, redirecting to local agent");
    let local = format!("http://127.0.0.1:{port}/callback?session_id={session_id}");
    found(&local)
}

/// `POST /auth/token` — leg 3: one-time token pickup by the local agent.
///
/// The store deletes the session before this handler sees the payload, so
/// even a response lost in transit leaves nothing retrievable; the caller
/// falls back to a fresh handshake rather than retrying the pickup.
pub async fn auth_token(
    State(s): State<Arc<RelayState>>,
    Json(req): Json<TokenPickupRequest>,
) -> axum::response::Response {
    match s.sessions.take_tokens(&req.session_id).await {
        Some(tokens) => {
            tracing::info!(session_id = %req.session_id, "tokens picked up, session consumed");
            Json(tokens).into_response()
        }
        None => RelayError::SessionNotFound
            .to_http_response("session not found or already used")
            .into_response(),
    }
}

/// `POST /auth/refresh` — stateless refresh exchange on behalf of the agent.
pub async fn auth_refresh(
    State(s): State<Arc<RelayState>>,
    Json(req): Json<RefreshRequest>,
) -> axum::response::Response {
    let refresh_token = match req.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        Some(t) => t.to_owned(),
        None => {
            return RelayError::BadRequest
                .to_http_response("missing refresh_token")
                .into_response()
        }
    };

    let client_secret = match s.secret.resolve(&s.config).await {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(err = %e, "client secret unavailable");
            return RelayError::Internal.to_http_response(e.to_string()).into_response();
        }
    };

    match oauth::exchange_refresh(
        &s.http,
        &s.config.token_url,
        &s.config.client_id,
        &client_secret,
        &refresh_token,
    )
    .await
    {
        Ok(TokenExchangeOutcome::Ok(token)) => Json(token).into_response(),
        Ok(TokenExchangeOutcome::Err(provider_err)) => {
            tracing::debug!(error = %provider_err.error, "provider rejected refresh");
            RelayError::TokenExchangeFailed
                .to_http_response(provider_err.reason())
                .into_response()
        }
        Err(e) => {
            tracing::warn!(err = %e, "refresh exchange request failed");
            RelayError::TokenExchangeFailed.to_http_response(e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
#[path = "http_param_tests.rs"]
mod tests;
