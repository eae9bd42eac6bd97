// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for end-to-end handshake tests.
//!
//! Runs a real relay (the full axum router) and a fake identity provider
//! in-process on loopback ports, then drives the browser legs with plain
//! HTTP requests so the whole three-party handshake can be exercised
//! without a display or a network.

use std::sync::Arc;

use axum::routing::post;
use axum::{Form, Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tokio_util::sync::CancellationToken;

use relay::config::RelayConfig;
use relay::state::RelayState;

/// Build an unsigned JWT carrying the given claims in its payload segment.
/// The relay reads claims without verifying signatures, so "sig" suffices.
pub fn unsigned_jwt(claims: &serde_json::Value) -> anyhow::Result<String> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({
        "alg": "none", "typ": "JWT"
    }))?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    Ok(format!("{header}.{payload}.sig"))
}

/// Spawn a fake identity provider token endpoint. Handles both the
/// authorization-code and refresh-token grants; every grant names the
/// given `hd` domain in its ID token.
pub async fn spawn_provider(hd: &str) -> anyhow::Result<String> {
    let id_token = unsigned_jwt(&serde_json::json!({
        "hd": hd,
        "email": format!("user@{hd}"),
    }))?;

    let app = Router::new().route(
        "/token",
        post(move |Form(form): Form<std::collections::HashMap<String, String>>| {
            let id_token = id_token.clone();
            async move {
                match form.get("grant_type").map(String::as_str) {
                    Some("refresh_token") => Json(serde_json::json!({
                        "access_token": "at-refreshed",
                        "expires_in": 3600,
                        "token_type": "Bearer",
                    })),
                    _ => Json(serde_json::json!({
                        "access_token": "at-e2e",
                        "refresh_token": "rt-e2e",
                        "expires_in": 3600,
                        "id_token": id_token,
                        "token_type": "Bearer",
                    })),
                }
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("provider server error: {e}");
        }
    });
    Ok(format!("http://{addr}/token"))
}

/// A relay running on a loopback port, shut down on drop.
pub struct RelayServer {
    pub base_url: String,
    shutdown: CancellationToken,
}

impl RelayServer {
    /// Start the full relay router against the given provider token
    /// endpoint, restricted to `allowed_domain` accounts.
    pub async fn start(provider_token_url: &str, allowed_domain: &str) -> anyhow::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let base_url = format!("http://{addr}");

        let config = RelayConfig {
            host: "127.0.0.1".to_owned(),
            port: addr.port(),
            public_url: base_url.clone(),
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_owned(),
            token_url: provider_token_url.to_owned(),
            client_id: "e2e-client".to_owned(),
            client_secret: Some("e2e-secret".to_owned()),
            client_secret_file: None,
            scopes: "openid email".to_owned(),
            allowed_domain: allowed_domain.to_owned(),
            session_ttl_secs: 600,
            reap_interval_secs: 60,
        };

        let shutdown = CancellationToken::new();
        let state = Arc::new(RelayState::new(config, shutdown.clone()));
        let router = relay::transport::build_router(state);
        let cancel = shutdown.clone();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(cancel.cancelled_owned());
            if let Err(e) = serve.await {
                eprintln!("relay server error: {e}");
            }
        });

        Ok(Self { base_url, shutdown })
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Play the user's browser for one handshake: follow the relay's start
/// redirect to read the session state, grant consent at the provider (by
/// calling the relay callback with a code), then land the final redirect on
/// the agent's loopback listener. Returns the page the "user" ends on.
pub async fn drive_browser(start_url: &str) -> anyhow::Result<String> {
    let browser = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()?;

    // Relay redirects the browser to the provider's consent screen.
    let resp = browser.get(start_url).send().await?;
    anyhow::ensure!(resp.status() == 302, "start leg returned {}", resp.status());
    let consent_url = header_string(&resp, "location")?;
    let state = query_param(&consent_url, "state")
        .ok_or_else(|| anyhow::anyhow!("no state in consent URL: {consent_url}"))?;

    // The user consents; the provider redirects back to the relay callback.
    let relay_base = start_url.split("/auth/start").next().unwrap_or_default();
    let callback = format!("{relay_base}/auth/callback?code=e2e-code&state={state}");
    let resp = browser.get(&callback).send().await?;

    if resp.status() == 302 {
        // Success: the relay bounces the browser to the agent's listener.
        let landing = header_string(&resp, "location")?;
        Ok(browser.get(&landing).send().await?.text().await?)
    } else {
        // Failure pages are rendered directly by the relay.
        Ok(resp.text().await?)
    }
}

fn header_string(resp: &reqwest::Response, name: &str) -> anyhow::Result<String> {
    let value = resp
        .headers()
        .get(name)
        .ok_or_else(|| anyhow::anyhow!("missing {name} header"))?;
    Ok(value.to_str()?.to_owned())
}

/// Extract a query parameter from a URL without decoding.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let query = url.split('?').nth(1)?;
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix(key)?.strip_prefix('=').map(str::to_owned))
}
