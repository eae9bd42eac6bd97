// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn cred(expiry_date: u64) -> StoredCredential {
    StoredCredential {
        access_token: "at".into(),
        refresh_token: "rt".into(),
        expiry_date,
    }
}

#[test]
fn save_then_load_roundtrip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state/tokens.json");

    save(&path, &cred(1234))?;
    let loaded = load(&path)?;
    assert_eq!(loaded.access_token, "at");
    assert_eq!(loaded.refresh_token, "rt");
    assert_eq!(loaded.expiry_date, 1234);
    Ok(())
}

#[cfg(unix)]
#[test]
fn record_is_owner_only() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("state/tokens.json");
    save(&path, &cred(1))?;

    let file_mode = std::fs::metadata(&path)?.permissions().mode() & 0o777;
    assert_eq!(file_mode, 0o600, "token file must be owner-only");

    let dir_mode = std::fs::metadata(dir.path().join("state"))?.permissions().mode() & 0o777;
    assert_eq!(dir_mode, 0o700, "state dir must be owner-only");
    Ok(())
}

#[test]
fn save_overwrites_atomically() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");

    save(&path, &cred(1))?;
    save(&path, &cred(2))?;
    assert_eq!(load(&path)?.expiry_date, 2);

    // No temp droppings left behind.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
    Ok(())
}

#[test]
fn corrupt_record_fails_to_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("tokens.json");
    std::fs::write(&path, "{not json")?;
    assert!(load(&path).is_err());
    assert!(load(&dir.path().join("missing.json")).is_err());
    Ok(())
}

#[test]
fn freshness_respects_the_safety_margin() {
    let now = 1_000_000;
    // Expires 120s out: fresh.
    assert!(cred(now + 120_000).fresh_at(now));
    // Expires 30s out: inside the 60s margin, stale.
    assert!(!cred(now + 30_000).fresh_at(now));
    // Expired an hour ago: stale.
    assert!(!cred(now.saturating_sub(3_600_000)).fresh_at(now));
}
