// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot loopback callback listener.
//!
//! Bound to an OS-assigned port on 127.0.0.1 for the duration of a single
//! authorization attempt. The first `/callback` request decides the outcome:
//! the handler validates the returned identifier against the one this
//! process generated (a second process's redirect must not land here),
//! completes the strategy-specific work, renders a terminal page to the
//! browser, and shuts the server down. Every exit path — success, mismatch,
//! provider error, pickup failure, timeout — closes the listener.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::relay_client::{RelayClient, TokenGrant};

/// Query parameters the browser can arrive with.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// What the handler does once the callback arrives.
pub enum Completion {
    /// Relay-brokered flow: validate `session_id`, then call the relay's
    /// one-time pickup leg before answering the browser.
    RelayPickup { relay: RelayClient, session_id: String },
    /// Direct PKCE flow: validate `state` and hand the authorization code
    /// back for the caller to exchange.
    DeliverCode { state: String },
}

/// Result of a completed callback.
pub enum CallbackOutcome {
    Tokens(TokenGrant),
    Code(String),
}

struct ListenerShared {
    completion: Completion,
    tx: Mutex<Option<oneshot::Sender<anyhow::Result<CallbackOutcome>>>>,
    cancel: CancellationToken,
}

pub struct CallbackListener {
    port: u16,
    rx: oneshot::Receiver<anyhow::Result<CallbackOutcome>>,
    cancel: CancellationToken,
}

impl CallbackListener {
    /// Bind an ephemeral loopback port and start serving `/callback`.
    pub async fn bind(completion: Completion) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let (tx, rx) = oneshot::channel();
        let cancel = CancellationToken::new();
        let shared = Arc::new(ListenerShared {
            completion,
            tx: Mutex::new(Some(tx)),
            cancel: cancel.clone(),
        });

        let app = Router::new().route("/callback", get(handle_callback)).with_state(shared);
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, app)
                .with_graceful_shutdown(server_cancel.cancelled_owned());
            if let Err(e) = serve.await {
                tracing::debug!(err = %e, "callback listener exited with error");
            }
        });

        tracing::debug!(port, "callback listener bound");
        Ok(Self { port, rx, cancel })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the single callback, up to `timeout`. Consumes the listener
    /// and closes the bound port regardless of outcome.
    pub async fn wait(self, timeout: Duration) -> anyhow::Result<CallbackOutcome> {
        let result = tokio::time::timeout(timeout, self.rx).await;
        self.cancel.cancel();
        match result {
            Err(_) => anyhow::bail!(
                "authorization timed out after {}s (browser never came back)",
                timeout.as_secs()
            ),
            Ok(Err(_)) => anyhow::bail!("callback listener closed unexpectedly"),
            Ok(Ok(outcome)) => outcome,
        }
    }
}

fn terminal_page(heading: &str, detail: &str) -> Html<String> {
    Html(format!(
        "<html><body><h2>{heading}</h2><p>{detail}</p></body></html>"
    ))
}

async fn handle_callback(
    State(shared): State<Arc<ListenerShared>>,
    Query(query): Query<CallbackQuery>,
) -> Html<String> {
    // Only the first request counts; anything after the channel is spent
    // gets the generic page (the server is shutting down anyway).
    let Some(tx) = shared.tx.lock().await.take() else {
        return terminal_page("Already handled.", "You can close this tab.");
    };

    let (page, result) = complete(&shared.completion, query).await;
    let _ = tx.send(result);
    shared.cancel.cancel();
    page
}

async fn complete(
    completion: &Completion,
    query: CallbackQuery,
) -> (Html<String>, anyhow::Result<CallbackOutcome>) {
    if let Some(err) = query.error {
        return (
            terminal_page("Authorization failed.", "You can close this tab."),
            Err(anyhow::anyhow!("authorization failed: {err}")),
        );
    }

    match completion {
        Completion::RelayPickup { relay, session_id } => {
            if query.session_id.as_deref() != Some(session_id.as_str()) {
                return (
                    terminal_page("Authorization failed.", "You can close this tab."),
                    Err(anyhow::anyhow!("authorization failed: session mismatch")),
                );
            }
            // One-time pickup from the relay — by this process, not the browser.
            match relay.pickup(session_id).await {
                Ok(grant) => (
                    terminal_page("Authorized!", "You can close this tab and return to the terminal."),
                    Ok(CallbackOutcome::Tokens(grant)),
                ),
                Err(e) => (
                    terminal_page("Token retrieval failed.", "Check the terminal for details."),
                    Err(e),
                ),
            }
        }
        Completion::DeliverCode { state } => {
            if query.state.as_deref() != Some(state.as_str()) {
                return (
                    terminal_page("Authorization failed.", "You can close this tab."),
                    Err(anyhow::anyhow!("authorization failed: state mismatch")),
                );
            }
            match query.code {
                Some(code) if !code.is_empty() => (
                    terminal_page("Authorized!", "You can close this tab and return to the terminal."),
                    Ok(CallbackOutcome::Code(code)),
                ),
                _ => (
                    terminal_page("Authorization failed.", "You can close this tab."),
                    Err(anyhow::anyhow!("authorization failed: no code in callback")),
                ),
            }
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
