// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity-provider wire types and exchanges.
//!
//! Code and refresh exchanges are form-encoded POSTs to the provider token
//! endpoint, authenticated with the confidential client secret. The ID
//! token's payload is decoded without signature verification: the claims
//! arrive over the relay's own TLS channel to the token endpoint, and the
//! `hd` claim is the enforcement input. A hardened deployment would verify
//! the signature against the provider's published keys first.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Successful token-endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

/// Provider-reported token-endpoint error.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenError {
    /// Human-readable reason for the terminal failure page.
    pub fn reason(&self) -> &str {
        self.error_description.as_deref().unwrap_or(&self.error)
    }
}

/// Either shape the token endpoint can return. Providers report errors with
/// a 200-range or 400-range status, so the body shape is the discriminator.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenExchangeOutcome {
    Ok(TokenResponse),
    Err(TokenError),
}

/// Claims inspected from the ID token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct IdClaims {
    /// Hosted-domain claim: the organizational domain of the account.
    #[serde(default)]
    pub hd: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Build the provider authorization URL for the `start` redirect.
///
/// `prompt=consent` forces refresh-token issuance even on repeat consent;
/// `hd` restricts the account chooser to the expected organization (a hint
/// only — the callback leg enforces the claim).
pub fn build_auth_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    state: &str,
    domain_hint: &str,
) -> String {
    format!(
        "{auth_url}?client_id={client_id}\
         &redirect_uri={redirect_uri}\
         &response_type=code\
         &scope={scope}\
         &access_type=offline\
         &prompt=consent\
         &state={state}\
         &hd={hd}",
        client_id = urlencoding(client_id),
        redirect_uri = urlencoding(redirect_uri),
        scope = urlencoding(scope),
        state = urlencoding(state),
        hd = urlencoding(domain_hint),
    )
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> anyhow::Result<TokenExchangeOutcome> {
    let resp = client
        .post(token_url)
        .form(&[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    let outcome: TokenExchangeOutcome = resp.json().await?;
    Ok(outcome)
}

/// Exchange a refresh token for a fresh access token. Stateless: no session
/// involvement and no domain check — identity was established when the
/// refresh token was issued.
pub async fn exchange_refresh(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> anyhow::Result<TokenExchangeOutcome> {
    let resp = client
        .post(token_url)
        .form(&[
            ("refresh_token", refresh_token),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await?;

    let outcome: TokenExchangeOutcome = resp.json().await?;
    Ok(outcome)
}

/// Decode the claims segment of a JWT without verifying its signature.
pub fn decode_id_claims(id_token: &str) -> anyhow::Result<IdClaims> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed id_token: missing payload segment"))?;
    let bytes = URL_SAFE_NO_PAD.decode(payload)?;
    let claims: IdClaims = serde_json::from_slice(&bytes)?;
    Ok(claims)
}

/// Form-style encoding for URL query parameters (spaces as `+`).
fn urlencoding(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0xf) as usize]));
            }
        }
    }
    out
}

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
