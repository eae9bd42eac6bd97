// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local credential agent: resolves OAuth access tokens through a cache,
//! an on-disk record, a silent relay refresh, and an interactive browser
//! handshake, in that order. The agent never holds a client secret; the
//! relay performs every confidential exchange on its behalf.

pub mod api;
pub mod config;
pub mod flow;
pub mod listener;
pub mod persist;
pub mod pkce;
pub mod relay_client;
pub mod resolver;

pub use config::{AgentConfig, HandshakeStrategy};
pub use resolver::CredentialResolver;
