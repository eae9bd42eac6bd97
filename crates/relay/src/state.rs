// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::RelayConfig;
use crate::secret::SecretCache;
use crate::session::SessionStore;

/// Shared relay state.
pub struct RelayState {
    pub sessions: Arc<SessionStore>,
    pub config: RelayConfig,
    pub secret: SecretCache,
    pub shutdown: CancellationToken,
    /// Shared outbound client for provider calls; bounded timeout so a slow
    /// provider surfaces as an error rather than a hung response.
    pub http: reqwest::Client,
}

impl RelayState {
    pub fn new(config: RelayConfig, shutdown: CancellationToken) -> Self {
        Self {
            sessions: Arc::new(SessionStore::new()),
            config,
            secret: SecretCache::new(),
            shutdown,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }
}
