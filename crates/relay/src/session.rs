// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory session store for in-flight authorization handshakes.
//!
//! A session correlates the two independent HTTP round trips of a handshake:
//! the `start` leg creates it pending, the `callback` leg attaches tokens
//! (fulfilled), and the `token` pickup leg consumes it. Consumption deletes
//! the session before the tokens are handed back, so a second pickup can
//! never observe them. A background reaper bounds memory growth from
//! abandoned or hostile handshakes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Tokens held for exactly one pickup by the local agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPayload {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// One in-flight handshake. Created pending; `tokens` is set exactly once
/// when the provider callback succeeds.
#[derive(Debug)]
pub struct Session {
    pub callback_port: u16,
    pub created_at: Instant,
    pub tokens: Option<TokenPayload>,
}

/// Concurrency-safe map of session id to session record.
///
/// Injected into the HTTP handlers via [`crate::state::RelayState`]; never a
/// process global. All operations are in-memory and lock-bounded.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new pending session for `start`.
    pub async fn insert(&self, id: String, callback_port: u16) {
        let mut sessions = self.sessions.write().await;
        sessions
            .insert(id, Session { callback_port, created_at: Instant::now(), tokens: None });
    }

    /// Whether a session exists (any state).
    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    /// Attach exchanged tokens to a pending session (`callback` success).
    ///
    /// Returns the callback port to redirect the browser to, or `None` if
    /// the session vanished (reaped mid-handshake).
    pub async fn attach_tokens(&self, id: &str, tokens: TokenPayload) -> Option<u16> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(id)?;
        session.tokens = Some(tokens);
        Some(session.callback_port)
    }

    /// One-time token pickup. Deletes the session before returning the
    /// payload, so a concurrent or repeated pickup observes `None`.
    ///
    /// A pending session (no tokens yet) is left in place and yields `None`:
    /// a premature pickup must not destroy a handshake still in flight.
    pub async fn take_tokens(&self, id: &str) -> Option<TokenPayload> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(id) {
            Some(s) if s.tokens.is_some() => sessions.remove(id).and_then(|s| s.tokens),
            _ => None,
        }
    }

    /// Delete a session in any state (callback failure, domain rejection).
    pub async fn remove(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Delete every session older than `ttl`. Returns how many were reaped.
    pub async fn reap_older_than(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at.elapsed() < ttl);
        before - sessions.len()
    }
}

/// Spawn the background reaper: every `interval`, drop sessions older than
/// `ttl`. Runs until `shutdown` is cancelled.
pub fn spawn_reaper(
    store: Arc<SessionStore>,
    ttl: Duration,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let reaped = store.reap_older_than(ttl).await;
                    if reaped > 0 {
                        tracing::debug!(reaped, "expired sessions reaped");
                    }
                }
                _ = shutdown.cancelled() => return,
            }
        }
    });
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
