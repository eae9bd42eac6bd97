// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth authorization code + PKCE (RFC 7636) helpers for the direct
//! handshake strategy. No client secret is involved: the code exchange is
//! bound to this process by the verifier.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::relay_client::TokenGrant;

/// Generate a PKCE code verifier (43-128 char URL-safe random string).
pub fn generate_code_verifier() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute code_challenge = base64url_nopad(sha256(verifier)).
pub fn compute_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate a random state parameter.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the provider authorization URL with PKCE parameters.
///
/// `access_type=offline` + `prompt=consent` force refresh-token issuance,
/// same as the relay-brokered variant.
pub fn build_auth_url(
    auth_url: &str,
    client_id: &str,
    redirect_uri: &str,
    scope: &str,
    code_challenge: &str,
    state: &str,
) -> String {
    format!(
        "{auth_url}?client_id={client_id}\
         &redirect_uri={redirect_uri}\
         &response_type=code\
         &scope={scope}\
         &access_type=offline\
         &prompt=consent\
         &code_challenge={code_challenge}\
         &code_challenge_method=S256\
         &state={state}",
        client_id = urlencoding(client_id),
        redirect_uri = urlencoding(redirect_uri),
        scope = urlencoding(scope),
        code_challenge = urlencoding(code_challenge),
        state = urlencoding(state),
    )
}

/// Exchange an authorization code for tokens with the verifier.
pub async fn exchange_code(
    client: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
) -> anyhow::Result<TokenGrant> {
    let resp = client
        .post(token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ])
        .send()
        .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        anyhow::bail!("token exchange failed ({status}): {text}");
    }

    let grant: TokenGrant = resp.json().await?;
    Ok(grant)
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
#[path = "pkce_tests.rs"]
mod tests;
