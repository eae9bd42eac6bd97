// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Authenticated HTTP helper for collaborating tools: resolves a token and
//! passes it as a bearer credential.

use std::time::Duration;

use crate::resolver::CredentialResolver;

pub struct ApiClient<'a> {
    resolver: &'a CredentialResolver,
    http: reqwest::Client,
}

impl<'a> ApiClient<'a> {
    pub fn new(resolver: &'a CredentialResolver) -> Self {
        Self {
            resolver,
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// GET a JSON resource with a freshly resolved bearer token.
    pub async fn get_json(&self, url: &str) -> anyhow::Result<serde_json::Value> {
        let token = self.resolver.access_token().await?;
        let resp = self.http.get(url).bearer_auth(token).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("request failed ({status}): {text}");
        }
        Ok(resp.json().await?)
    }
}
