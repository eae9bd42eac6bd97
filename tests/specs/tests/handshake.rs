// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end handshake tests: real relay router, fake identity provider,
//! real agent resolver, with the browser legs driven over plain HTTP.

use std::path::Path;

use relay_agent::config::HandshakeStrategy;
use relay_agent::flow::BrowserLauncher;
use relay_agent::{persist, AgentConfig, CredentialResolver};
use relay_specs::{drive_browser, spawn_provider, RelayServer};

fn agent_config(relay_url: &str, state_dir: &Path, timeout_secs: u64) -> AgentConfig {
    AgentConfig {
        relay_url: relay_url.to_owned(),
        state_dir: Some(state_dir.to_owned()),
        strategy: HandshakeStrategy::Relay,
        handshake_timeout_secs: timeout_secs,
        auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_owned(),
        token_url: "https://oauth2.googleapis.com/token".to_owned(),
        client_id: None,
        scopes: "openid email".to_owned(),
    }
}

/// Launcher that plays the browser and reports the final page it landed on.
fn browser_launcher() -> (BrowserLauncher, tokio::sync::mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let launcher: BrowserLauncher = Box::new(move |url: &str| {
        let url = url.to_owned();
        let tx = tx.clone();
        tokio::spawn(async move {
            let page = drive_browser(&url).await.unwrap_or_else(|e| format!("browser error: {e}"));
            let _ = tx.send(page);
        });
    });
    (launcher, rx)
}

fn no_browser() -> BrowserLauncher {
    Box::new(|url| panic!("browser must not open for {url}"))
}

#[tokio::test]
async fn full_handshake_persists_a_credential_record() -> anyhow::Result<()> {
    let provider = spawn_provider("example.com").await?;
    let relay = RelayServer::start(&provider, "example.com").await?;
    let dir = tempfile::tempdir()?;

    let (launcher, mut page_rx) = browser_launcher();
    let resolver =
        CredentialResolver::with_launcher(agent_config(&relay.base_url, dir.path(), 10), launcher);

    assert_eq!(resolver.access_token().await?, "at-e2e");

    let page = page_rx.recv().await.ok_or_else(|| anyhow::anyhow!("browser never finished"))?;
    assert!(page.contains("Authorized!"), "unexpected page: {page}");

    let stored = persist::load(&dir.path().join("tokens.json"))?;
    assert_eq!(stored.access_token, "at-e2e");
    assert_eq!(stored.refresh_token, "rt-e2e");
    assert!(stored.is_fresh());
    Ok(())
}

#[tokio::test]
async fn restart_resolves_from_disk_without_a_browser() -> anyhow::Result<()> {
    let provider = spawn_provider("example.com").await?;
    let relay = RelayServer::start(&provider, "example.com").await?;
    let dir = tempfile::tempdir()?;

    let (launcher, _page_rx) = browser_launcher();
    let first =
        CredentialResolver::with_launcher(agent_config(&relay.base_url, dir.path(), 10), launcher);
    first.access_token().await?;

    // A new process finds the record on disk and never opens a browser.
    let second = CredentialResolver::with_launcher(
        agent_config(&relay.base_url, dir.path(), 10),
        no_browser(),
    );
    assert_eq!(second.access_token().await?, "at-e2e");
    Ok(())
}

#[tokio::test]
async fn stale_record_refreshes_through_the_relay() -> anyhow::Result<()> {
    let provider = spawn_provider("example.com").await?;
    let relay = RelayServer::start(&provider, "example.com").await?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    persist::save(
        &path,
        &persist::StoredCredential {
            access_token: "at-expired".to_owned(),
            refresh_token: "rt-e2e".to_owned(),
            expiry_date: 0,
        },
    )?;

    let resolver = CredentialResolver::with_launcher(
        agent_config(&relay.base_url, dir.path(), 10),
        no_browser(),
    );
    assert_eq!(resolver.access_token().await?, "at-refreshed");

    // The provider omitted a refresh token, so the old one is kept.
    let stored = persist::load(&path)?;
    assert_eq!(stored.refresh_token, "rt-e2e");
    Ok(())
}

#[tokio::test]
async fn wrong_domain_is_denied() -> anyhow::Result<()> {
    let provider = spawn_provider("evil.example").await?;
    let relay = RelayServer::start(&provider, "example.com").await?;
    let dir = tempfile::tempdir()?;

    let (launcher, mut page_rx) = browser_launcher();
    let resolver =
        CredentialResolver::with_launcher(agent_config(&relay.base_url, dir.path(), 2), launcher);

    let err = resolver.access_token().await.unwrap_err();
    assert!(err.to_string().contains("authentication failed"), "{err:#}");

    let page = page_rx.recv().await.ok_or_else(|| anyhow::anyhow!("browser never finished"))?;
    assert!(page.contains("Access denied."), "unexpected page: {page}");

    // Nothing was persisted.
    assert!(persist::load(&dir.path().join("tokens.json")).is_err());
    Ok(())
}
