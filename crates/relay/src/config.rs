// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Configuration for the authorization relay.
///
/// The relay holds the confidential OAuth client secret on behalf of local
/// agents that have no public network identity. The in-memory session store
/// assumes a single relay instance; run exactly one replica (or front it
/// with sticky routing) — this is a deployment constraint, not a code knob.
#[derive(Debug, Clone, clap::Parser)]
pub struct RelayConfig {
    /// Host to bind on.
    #[arg(long, default_value = "0.0.0.0", env = "RELAY_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "RELAY_PORT")]
    pub port: u16,

    /// Public base URL of this relay (used as the registered OAuth redirect
    /// base, e.g. https://relay.example.com).
    #[arg(long, env = "RELAY_PUBLIC_URL")]
    pub public_url: String,

    /// Identity provider authorization endpoint.
    #[arg(
        long,
        default_value = "https://accounts.google.com/o/oauth2/v2/auth",
        env = "RELAY_AUTH_URL"
    )]
    pub auth_url: String,

    /// Identity provider token endpoint.
    #[arg(long, default_value = "https://oauth2.googleapis.com/token", env = "RELAY_TOKEN_URL")]
    pub token_url: String,

    /// OAuth client identifier.
    #[arg(long, env = "RELAY_CLIENT_ID")]
    pub client_id: String,

    /// OAuth client secret, passed directly. Prefer `--client-secret-file`.
    #[arg(long, env = "RELAY_CLIENT_SECRET")]
    pub client_secret: Option<String>,

    /// Path to a file containing the OAuth client secret (e.g. a mounted
    /// secret volume). Read once on first use.
    #[arg(long, env = "RELAY_CLIENT_SECRET_FILE")]
    pub client_secret_file: Option<std::path::PathBuf>,

    /// Space-separated OAuth scopes to request.
    #[arg(long, default_value = "openid email", env = "RELAY_SCOPES")]
    pub scopes: String,

    /// Organizational domain allowed to authenticate (the `hd` claim).
    #[arg(long, env = "RELAY_ALLOWED_DOMAIN")]
    pub allowed_domain: String,

    /// Session time-to-live in seconds. Abandoned handshakes are reaped
    /// after this long.
    #[arg(long, default_value_t = 600, env = "RELAY_SESSION_TTL_SECS")]
    pub session_ttl_secs: u64,

    /// Reaper tick interval in seconds.
    #[arg(long, default_value_t = 60, env = "RELAY_REAP_INTERVAL_SECS")]
    pub reap_interval_secs: u64,
}

impl RelayConfig {
    pub fn session_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_ttl_secs)
    }

    pub fn reap_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reap_interval_secs)
    }

    /// The redirect URI registered with the identity provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.public_url.trim_end_matches('/'))
    }
}
