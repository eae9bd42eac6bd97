// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential resolution chain: in-memory cache, credential record on disk,
//! silent refresh through the relay, and finally the interactive browser
//! handshake. Earlier rungs are cheap and tried first; only the last one
//! needs the user.

use anyhow::Context;
use tokio::sync::RwLock;

use crate::config::AgentConfig;
use crate::flow::{self, BrowserLauncher};
use crate::persist::{self, StoredCredential};
use crate::relay_client::{RelayClient, TokenGrant};

pub struct CredentialResolver {
    config: AgentConfig,
    cache: RwLock<Option<StoredCredential>>,
    launcher: BrowserLauncher,
}

impl CredentialResolver {
    pub fn new(config: AgentConfig) -> Self {
        Self::with_launcher(config, flow::default_launcher())
    }

    /// Construct with a custom browser launcher.
    pub fn with_launcher(config: AgentConfig, launcher: BrowserLauncher) -> Self {
        Self {
            config,
            cache: RwLock::new(None),
            launcher,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Resolve a fresh access token, walking the chain as far as needed.
    pub async fn access_token(&self) -> anyhow::Result<String> {
        Ok(self.credential().await?.access_token)
    }

    /// Resolve a fresh credential record.
    pub async fn credential(&self) -> anyhow::Result<StoredCredential> {
        if let Some(cred) = self.cache.read().await.as_ref() {
            if cred.is_fresh() {
                return Ok(cred.clone());
            }
        }

        let path = self.config.credential_path();
        let stale = match persist::load(&path) {
            Ok(cred) if cred.is_fresh() => {
                self.remember(cred.clone()).await;
                return Ok(cred);
            }
            Ok(cred) => Some(cred),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "no usable credential record");
                None
            }
        };

        if let Some(stale) = stale {
            if !stale.refresh_token.is_empty() {
                match self.refresh(&stale).await {
                    Ok(cred) => {
                        self.store(&path, cred.clone()).await;
                        return Ok(cred);
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "silent refresh failed, falling back to handshake");
                    }
                }
            }
        }

        let grant = flow::interactive_handshake(&self.config, &self.launcher)
            .await
            .context("authentication failed")?;
        let cred = credential_from_grant(grant, None);
        self.store(&path, cred.clone()).await;
        Ok(cred)
    }

    /// Force a fresh interactive handshake, replacing any stored credential.
    pub async fn login(&self) -> anyhow::Result<StoredCredential> {
        let grant = flow::interactive_handshake(&self.config, &self.launcher)
            .await
            .context("authentication failed")?;
        let cred = credential_from_grant(grant, None);
        let path = self.config.credential_path();
        self.store(&path, cred.clone()).await;
        Ok(cred)
    }

    async fn refresh(&self, stale: &StoredCredential) -> anyhow::Result<StoredCredential> {
        let relay = RelayClient::new(&self.config.relay_url);
        let grant = relay.refresh(&stale.refresh_token).await?;
        Ok(credential_from_grant(grant, Some(&stale.refresh_token)))
    }

    async fn remember(&self, cred: StoredCredential) {
        *self.cache.write().await = Some(cred);
    }

    async fn store(&self, path: &std::path::Path, cred: StoredCredential) {
        if let Err(err) = persist::save(path, &cred) {
            tracing::warn!(path = %path.display(), error = %err, "failed to persist credential record");
        }
        self.remember(cred).await;
    }
}

/// Providers omit the refresh token when the grant renews an existing one;
/// in that case the previous refresh token stays valid and is kept.
fn credential_from_grant(grant: TokenGrant, previous_refresh: Option<&str>) -> StoredCredential {
    let refresh_token = grant
        .refresh_token
        .or_else(|| previous_refresh.map(str::to_owned))
        .unwrap_or_default();
    StoredCredential {
        access_token: grant.access_token,
        refresh_token,
        expiry_date: persist::epoch_ms() + grant.expires_in * 1000,
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
