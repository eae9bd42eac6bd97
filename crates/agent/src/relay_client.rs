// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the relay's agent-facing legs.

use std::time::Duration;

use serde::Deserialize;

/// Token pair returned by the relay (pickup or refresh).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    base: String,
    http: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// The URL the browser must visit to begin a handshake.
    pub fn start_url(&self, session_id: &str, port: u16) -> String {
        format!("{}/auth/start?session_id={session_id}&port={port}", self.base)
    }

    /// One-time token pickup. A 404 means the session never happened, was
    /// already consumed, or expired — never retry, start a fresh handshake.
    pub async fn pickup(&self, session_id: &str) -> anyhow::Result<TokenGrant> {
        let resp = self
            .http
            .post(format!("{}/auth/token", self.base))
            .json(&serde_json::json!({ "session_id": session_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("token pickup failed ({status}): {text}");
        }
        let grant: TokenGrant = resp.json().await?;
        Ok(grant)
    }

    /// Stateless refresh exchange via the relay.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<TokenGrant> {
        let resp = self
            .http
            .post(format!("{}/auth/refresh", self.base))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("refresh failed ({status}): {text}");
        }
        let grant: TokenGrant = resp.json().await?;
        Ok(grant)
    }
}
