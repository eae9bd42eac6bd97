// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confidential client-secret resolution.
//!
//! The secret is immutable for the process lifetime and fetched on first
//! use only. Concurrent first uses may each fetch; the duplicates overwrite
//! the cache with an identical value, so a racy fill is sufficient and no
//! critical section is held across the read.

use tokio::sync::RwLock;

use crate::config::RelayConfig;

#[derive(Default)]
pub struct SecretCache {
    cached: RwLock<Option<String>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the client secret: literal config value first, then the
    /// secret file. Cached after the first successful resolution.
    pub async fn resolve(&self, config: &RelayConfig) -> anyhow::Result<String> {
        if let Some(secret) = self.cached.read().await.clone() {
            return Ok(secret);
        }

        let secret = match (&config.client_secret, &config.client_secret_file) {
            (Some(literal), _) => literal.clone(),
            (None, Some(path)) => {
                let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
                    anyhow::anyhow!("reading client secret file {}: {e}", path.display())
                })?;
                raw.trim().to_owned()
            }
            (None, None) => anyhow::bail!(
                "no client secret configured (set RELAY_CLIENT_SECRET or RELAY_CLIENT_SECRET_FILE)"
            ),
        };
        if secret.is_empty() {
            anyhow::bail!("client secret is empty");
        }

        *self.cached.write().await = Some(secret.clone());
        Ok(secret)
    }
}

#[cfg(test)]
#[path = "secret_tests.rs"]
mod tests;
