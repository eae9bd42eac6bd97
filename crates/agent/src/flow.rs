// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive handshake flows. Both variants bind a loopback listener,
//! open the system browser, and block until the callback lands or the
//! handshake times out.

use std::time::Duration;

use anyhow::Context;

use crate::config::{AgentConfig, HandshakeStrategy};
use crate::listener::{CallbackListener, CallbackOutcome, Completion};
use crate::pkce;
use crate::relay_client::{RelayClient, TokenGrant};

/// Opens the authorization URL in the user's browser. Injectable so tests
/// can drive the browser legs programmatically.
pub type BrowserLauncher = Box<dyn Fn(&str) + Send + Sync>;

/// Default launcher: print the URL and try to open it. Opening can fail on
/// headless machines, the printed URL is the fallback.
pub fn default_launcher() -> BrowserLauncher {
    Box::new(|url| {
        eprintln!("Opening browser for authorization:\n  {url}");
        let _ = open::that(url);
    })
}

/// Random 32-char lowercase hex session identifier.
pub fn new_session_id() -> String {
    use rand::Rng;
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    let mut id = String::with_capacity(32);
    for b in bytes {
        id.push(char::from(HEX[(b >> 4) as usize]));
        id.push(char::from(HEX[(b & 0xf) as usize]));
    }
    id
}

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Run the handshake variant selected by the configuration.
pub async fn interactive_handshake(
    config: &AgentConfig,
    launcher: &BrowserLauncher,
) -> anyhow::Result<TokenGrant> {
    match config.strategy {
        HandshakeStrategy::Relay => relay_handshake(config, launcher).await,
        HandshakeStrategy::DirectPkce => direct_handshake(config, launcher).await,
    }
}

/// Relay-brokered handshake: the relay holds the client secret and performs
/// the code exchange; this process only picks up the finished tokens.
pub async fn relay_handshake(
    config: &AgentConfig,
    launcher: &BrowserLauncher,
) -> anyhow::Result<TokenGrant> {
    let relay = RelayClient::new(&config.relay_url);
    let session_id = new_session_id();

    let listener = CallbackListener::bind(Completion::RelayPickup {
        relay: relay.clone(),
        session_id: session_id.clone(),
    })
    .await?;

    let url = relay.start_url(&session_id, listener.port());
    tracing::debug!(session_id = %session_id, port = listener.port(), "starting relay handshake");
    launcher(&url);

    match listener.wait(config.handshake_timeout()).await? {
        CallbackOutcome::Tokens(grant) => Ok(grant),
        CallbackOutcome::Code(_) => {
            anyhow::bail!("relay handshake returned a raw authorization code")
        }
    }
}

/// Direct PKCE handshake: no relay and no client secret. The provider must
/// allow loopback redirect URIs for the configured client.
pub async fn direct_handshake(
    config: &AgentConfig,
    launcher: &BrowserLauncher,
) -> anyhow::Result<TokenGrant> {
    let client_id = config
        .client_id
        .as_deref()
        .context("client id is required for the direct handshake")?;

    let verifier = pkce::generate_code_verifier();
    let challenge = pkce::compute_code_challenge(&verifier);
    let state = pkce::generate_state();

    let listener = CallbackListener::bind(Completion::DeliverCode {
        state: state.clone(),
    })
    .await?;
    let redirect_uri = format!("http://127.0.0.1:{}/callback", listener.port());

    let url = pkce::build_auth_url(
        &config.auth_url,
        client_id,
        &redirect_uri,
        &config.scopes,
        &challenge,
        &state,
    );
    tracing::debug!(port = listener.port(), "starting direct handshake");
    launcher(&url);

    let code = match listener.wait(config.handshake_timeout()).await? {
        CallbackOutcome::Code(code) => code,
        CallbackOutcome::Tokens(_) => {
            anyhow::bail!("direct handshake returned tokens without an exchange")
        }
    };

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default();
    pkce::exchange_code(
        &http,
        &config.token_url,
        client_id,
        &code,
        &verifier,
        &redirect_uri,
    )
    .await
}
