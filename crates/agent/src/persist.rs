// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk credential record: load/save to JSON with atomic writes and
//! owner-only permissions.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Safety margin before the recorded expiry at which a token is already
/// treated as expired.
pub const EXPIRY_MARGIN_MS: u64 = 60_000;

/// The last obtained token pair, persisted across agent processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, epoch milliseconds.
    pub expiry_date: u64,
}

impl StoredCredential {
    /// Whether the access token is still usable beyond the safety margin.
    pub fn is_fresh(&self) -> bool {
        self.fresh_at(epoch_ms())
    }

    pub(crate) fn fresh_at(&self, now_ms: u64) -> bool {
        self.expiry_date > now_ms + EXPIRY_MARGIN_MS
    }
}

/// Load the credential record. Any failure (missing, unreadable, corrupt)
/// is an error; callers treat it as "absent" and re-authenticate.
pub fn load(path: &Path) -> anyhow::Result<StoredCredential> {
    let contents = std::fs::read_to_string(path)?;
    let cred: StoredCredential = serde_json::from_str(&contents)?;
    Ok(cred)
}

/// Save the credential record atomically (write tmp + rename).
///
/// The containing directory is created with owner-only permissions if
/// absent, and the file itself is chmod 0600 before the rename makes it
/// visible. Uses a unique temp filename (PID + counter) so concurrent saves
/// cannot corrupt each other.
pub fn save(path: &Path, cred: &StoredCredential) -> anyhow::Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    if let Some(dir) = path.parent() {
        if !dir.exists() {
            let mut builder = std::fs::DirBuilder::new();
            builder.recursive(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::DirBuilderExt;
                builder.mode(0o700);
            }
            builder.create(dir)?;
        }
    }

    let json = serde_json::to_string_pretty(cred)?;
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);
    std::fs::write(&tmp_path, json)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Current epoch millis.
pub fn epoch_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

#[cfg(test)]
#[path = "persist_tests.rs"]
mod tests;
