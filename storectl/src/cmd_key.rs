//! `storectl key set/list/current`.
//!
//! [`symkey::SymKeyStore`] is purely in-memory, so this sandbox owns the
//! on-disk persistence itself: one JSON file per key under `keys/`, plus a
//! `keys/current` pointer file naming the active digest.

use serde::{Deserialize, Serialize};

use symkey::{KeyInput, SymKeyStore};

use crate::error::{CliError, Result};
use crate::sandbox::Sandbox;

#[derive(Debug, Serialize, Deserialize)]
struct StoredKey {
    digest64: String,
    base64: String,
    expiry: u64,
}

fn key_path(sandbox: &Sandbox, digest64: &str) -> std::path::PathBuf {
    let safe = digest64.replace(['/', '+', '='], "_");
    sandbox.keys_dir().join(format!("{safe}.json"))
}

fn current_path(sandbox: &Sandbox) -> std::path::PathBuf {
    sandbox.keys_dir().join("current")
}

pub fn set(sandbox: &Sandbox, base64_key: &str, expiry: u64) -> Result<()> {
    let store = SymKeyStore::new();
    let key = store.set_key(KeyInput::Base64(base64_key), expiry)?;

    let stored = StoredKey {
        digest64: key.digest64().to_string(),
        base64: key.base64().to_string(),
        expiry,
    };
    crate::sandbox::save_json(&key_path(sandbox, key.digest64()), &stored)?;
    std::fs::write(current_path(sandbox), key.digest64())?;

    println!("installed key digest={} expiry={}", key.digest64(), expiry);
    Ok(())
}

pub fn list(sandbox: &Sandbox) -> Result<()> {
    let dir = sandbox.keys_dir();
    if !dir.exists() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let stored: StoredKey = crate::sandbox::read_json(&path)?;
        println!("{} expiry={}", stored.digest64, stored.expiry);
    }
    Ok(())
}

pub fn current(sandbox: &Sandbox) -> Result<()> {
    let digest64 = std::fs::read_to_string(current_path(sandbox))
        .map_err(|_| CliError::Msg("no current key installed".into()))?;
    let stored: StoredKey = crate::sandbox::read_json(&key_path(sandbox, digest64.trim()))?;
    println!("{} expiry={}", stored.digest64, stored.expiry);
    Ok(())
}
