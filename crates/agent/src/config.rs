// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

/// How the interactive handshake reaches the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum HandshakeStrategy {
    /// Route all OAuth through the relay, which owns the registered
    /// redirect endpoint and the confidential client secret.
    Relay,
    /// Talk to the provider directly with PKCE and a loopback redirect.
    /// Requires a client id registered for native/loopback use.
    DirectPkce,
}

/// Configuration for the local agent.
#[derive(Debug, Clone, clap::Args)]
pub struct AgentConfig {
    /// Base URL of the authorization relay.
    #[arg(long, default_value = "http://127.0.0.1:8080", env = "RELAY_AGENT_URL")]
    pub relay_url: String,

    /// Directory for the on-disk credential record. Defaults to the
    /// per-user state directory.
    #[arg(long, env = "RELAY_AGENT_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// Interactive handshake strategy.
    #[arg(long, value_enum, default_value = "relay", env = "RELAY_AGENT_STRATEGY")]
    pub strategy: HandshakeStrategy,

    /// How long to keep the local callback listener open waiting for the
    /// browser, in seconds. Matches the relay's session TTL by default.
    #[arg(long, default_value_t = 600, env = "RELAY_AGENT_HANDSHAKE_TIMEOUT_SECS")]
    pub handshake_timeout_secs: u64,

    /// Provider authorization endpoint (direct-pkce strategy only).
    #[arg(
        long,
        default_value = "https://accounts.google.com/o/oauth2/v2/auth",
        env = "RELAY_AGENT_AUTH_URL"
    )]
    pub auth_url: String,

    /// Provider token endpoint (direct-pkce strategy only).
    #[arg(
        long,
        default_value = "https://oauth2.googleapis.com/token",
        env = "RELAY_AGENT_TOKEN_URL"
    )]
    pub token_url: String,

    /// OAuth client id (direct-pkce strategy only).
    #[arg(long, env = "RELAY_AGENT_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Space-separated OAuth scopes (direct-pkce strategy only).
    #[arg(long, default_value = "openid email", env = "RELAY_AGENT_SCOPES")]
    pub scopes: String,
}

impl AgentConfig {
    pub fn handshake_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.handshake_timeout_secs)
    }

    /// Resolve the state directory for agent data.
    ///
    /// Explicit config first, then `$XDG_STATE_HOME/relay-agent`, then
    /// `$HOME/.local/state/relay-agent`.
    pub fn resolve_state_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("relay-agent");
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".local/state/relay-agent");
        }
        PathBuf::from(".relay-agent")
    }

    /// Path of the on-disk credential record.
    pub fn credential_path(&self) -> PathBuf {
        self.resolve_state_dir().join("tokens.json")
    }
}
