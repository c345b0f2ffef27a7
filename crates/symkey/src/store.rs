use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use crate::crypto::{base64_decode, base64_encode, hmac_sha256};
use crate::env::Env;
use crate::error::SymKeyError;
use crate::key::{KeyInput, KeyState, SymKey, unix_now};

/// Internal housekeeping field carrying which key signed a capability, so
/// `extract_capability` can find it again without a separate side channel.
const KEY_DIGEST_FIELD: &str = "_cap_key_digest64";
const EXPIRY_FIELD: &str = "expiry";
const CAP_SYM_FIELD: &str = "cap.sym";
const CAP_MSG_FIELD: &str = "cap.msg";

#[derive(Default)]
struct Inner {
    keys: HashMap<String, SymKey>,
    /// Insertion order of digests, oldest first.
    order: Vec<String>,
    current: Option<String>,
}

/// Insertion-ordered `digest64 -> SymKey` store plus the capability engine
/// built on top of it. All mutating operations serialize on one lock;
/// `get_key`/`current_key` only take a read borrow.
#[derive(Default)]
pub struct SymKeyStore {
    inner: RwLock<Inner>,
}

impl SymKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a key, replacing the expiry of an existing key with the same
    /// digest if present, and making it the current key.
    pub fn set_key(&self, input: KeyInput<'_>, expiry: u64) -> Result<SymKey, SymKeyError> {
        let raw = input.into_raw20()?;
        let key = SymKey::from_raw(raw, expiry);
        let digest64 = key.digest64().to_string();

        let mut inner = self.inner.write().expect("symkey store lock poisoned");
        if !inner.keys.contains_key(&digest64) {
            inner.order.push(digest64.clone());
        }
        inner.keys.insert(digest64.clone(), key.clone());
        inner.current = Some(digest64);
        log::debug!("installed symmetric key digest={}", key.digest64());
        Ok(key)
    }

    /// Exact lookup by digest, regardless of validity state.
    pub fn get_key(&self, digest64: &str) -> Option<SymKey> {
        let inner = self.inner.read().expect("symkey store lock poisoned");
        inner.keys.get(digest64).cloned()
    }

    /// Returns the current key iff it is still [`KeyState::Valid`].
    pub fn current_key(&self) -> Option<SymKey> {
        let inner = self.inner.read().expect("symkey store lock poisoned");
        let digest64 = inner.current.as_ref()?;
        let key = inner.keys.get(digest64)?;
        (key.state() == KeyState::Valid).then(|| key.clone())
    }

    /// Removes every key past `expiry + DELETION_OFFSET`. Deletion lags
    /// expiry deliberately to tolerate clock skew between cooperating
    /// processes.
    pub fn purge_deleted(&self) {
        let mut inner = self.inner.write().expect("symkey store lock poisoned");
        let now = unix_now();
        let dead: Vec<String> = inner
            .keys
            .iter()
            .filter(|(_, k)| k.state_at(now) == KeyState::Deleted)
            .map(|(d, _)| d.clone())
            .collect();
        for digest in &dead {
            inner.keys.remove(digest);
            inner.order.retain(|d| d != digest);
            if inner.current.as_deref() == Some(digest.as_str()) {
                inner.current = None;
            }
        }
    }

    /// Number of keys currently held (irrespective of validity).
    pub fn len(&self) -> usize {
        self.inner.read().expect("symkey store lock poisoned").order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Seals `in_env` into a signed, time-bounded capability using the
    /// current key. Fails with [`SymKeyError::NoCurrentKey`] if there is no
    /// valid current key.
    pub fn create_capability(&self, in_env: &Env, validity: Duration) -> Result<Env, SymKeyError> {
        let key = self.current_key().ok_or(SymKeyError::NoCurrentKey)?;
        let expiry = unix_now() + validity.as_secs();

        let mut payload = in_env.clone();
        payload.set(EXPIRY_FIELD, expiry.to_string());
        payload.set(KEY_DIGEST_FIELD, key.digest64());

        let payload_bytes = payload.encode().into_bytes();
        let mac = hmac_sha256(key.raw(), &payload_bytes, 32);

        let mut out = Env::new();
        out.set(CAP_SYM_FIELD, hex_encode(&mac));
        out.set(CAP_MSG_FIELD, base64_encode(&payload_bytes));
        Ok(out)
    }

    /// Verifies and unseals a capability produced by [`Self::create_capability`].
    pub fn extract_capability(&self, in_env: &Env) -> Result<Env, SymKeyError> {
        let cap_sym = in_env
            .get(CAP_SYM_FIELD)
            .ok_or_else(|| SymKeyError::Corrupt("missing cap.sym".into()))?;
        let cap_msg = in_env
            .get(CAP_MSG_FIELD)
            .ok_or_else(|| SymKeyError::Corrupt("missing cap.msg".into()))?;

        let payload_bytes = base64_decode(cap_msg)
            .map_err(|_| SymKeyError::Corrupt("cap.msg is not valid base64".into()))?;
        let payload = Env::decode(
            std::str::from_utf8(&payload_bytes)
                .map_err(|_| SymKeyError::Corrupt("cap.msg payload is not utf8".into()))?,
        );

        let digest64 = payload
            .get(KEY_DIGEST_FIELD)
            .ok_or_else(|| SymKeyError::Corrupt("payload missing signing key digest".into()))?;
        let key = self
            .get_key(digest64)
            .ok_or_else(|| SymKeyError::UnknownDigest(digest64.to_string()))?;

        let expected_mac = hmac_sha256(key.raw(), &payload_bytes, 32);
        if hex_encode(&expected_mac) != cap_sym {
            log::warn!("capability signature mismatch for key digest={digest64}");
            return Err(SymKeyError::SignatureMismatch);
        }

        let expiry: u64 = payload
            .get(EXPIRY_FIELD)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| SymKeyError::Corrupt("payload missing expiry".into()))?;
        let now = unix_now();
        if !capability_is_live(expiry, now) {
            return Err(SymKeyError::Expired);
        }

        let mut out = Env::new();
        for (k, v) in payload.iter() {
            if k != KEY_DIGEST_FIELD {
                out.set(k, v);
            }
        }
        Ok(out)
    }
}

/// Pure boundary check mirroring the receiving side's rule in
/// `extract_capability`: `now < expiry`. The grace period only postpones a
/// *key's* retirement from signing (see [`crate::key::GRACE_SECS`]); a
/// capability's own expiry is exact, with no extra slack. Exposed standalone
/// so the expiry boundary can be property-tested without needing real
/// wall-clock sleeps.
pub fn capability_is_live(expiry: u64, now: u64) -> bool {
    now < expiry
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut acc, b| {
        acc.push_str(&format!("{b:02x}"));
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn store_with_key(expiry: u64) -> SymKeyStore {
        let store = SymKeyStore::new();
        store.set_key(KeyInput::Raw(&[7u8; 20]), expiry).unwrap();
        store
    }

    #[test]
    fn set_key_rejects_wrong_length() {
        let store = SymKeyStore::new();
        let err = store.set_key(KeyInput::Raw(&[0u8; 4]), 0).unwrap_err();
        assert_eq!(err, SymKeyError::InvalidKeyLength(4));
    }

    #[test]
    fn reinstalling_same_digest_replaces_expiry_and_stays_single_entry() {
        let store = SymKeyStore::new();
        store.set_key(KeyInput::Raw(&[9u8; 20]), 100).unwrap();
        store.set_key(KeyInput::Raw(&[9u8; 20]), 200).unwrap();
        assert_eq!(store.len(), 1);
        let key = store.current_key().unwrap();
        assert_eq!(key.expiry, 200);
    }

    #[test]
    fn seal_and_extract_preserve_fields() {
        let store = store_with_key(0);
        let mut env = Env::new();
        env.set("a", "1").set("b", "2");

        let cap = store.create_capability(&env, Duration::from_secs(60)).unwrap();
        assert!(cap.get("cap.sym").is_some());
        assert!(cap.get("cap.msg").is_some());

        let out = store.extract_capability(&cap).unwrap();
        assert_eq!(out.get("a"), Some("1"));
        assert_eq!(out.get("b"), Some("2"));
    }

    #[test]
    fn expired_capability_is_rejected() {
        let store = store_with_key(0);
        let env = Env::new();
        let cap = store.create_capability(&env, Duration::from_secs(1)).unwrap();
        assert!(store.extract_capability(&cap).is_ok());

        sleep(Duration::from_secs(2));
        assert_eq!(
            store.extract_capability(&cap).unwrap_err(),
            SymKeyError::Expired
        );
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let store = store_with_key(0);
        let env = Env::new();
        let mut cap = store.create_capability(&env, Duration::from_secs(60)).unwrap();
        cap.set("cap.sym", "0000000000000000000000000000000000000000000000000000000000000000");
        assert_eq!(
            store.extract_capability(&cap).unwrap_err(),
            SymKeyError::SignatureMismatch
        );
    }

    #[test]
    fn no_current_key_refuses_creation() {
        let store = SymKeyStore::new();
        let err = store
            .create_capability(&Env::new(), Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(err, SymKeyError::NoCurrentKey);
    }

    #[test]
    fn capability_expiry_boundary() {
        // t0 = 0, validity Delta = 100 -> expiry = 100. The capability's own
        // expiry carries no grace; a key still being in its grace window at
        // that instant doesn't extend the capability's lifetime.
        let expiry = 100;
        assert!(capability_is_live(expiry, expiry - 1));
        assert!(!capability_is_live(expiry, expiry));
        assert!(!capability_is_live(expiry, expiry + 1));
    }

    #[test]
    fn purge_deleted_removes_only_past_deletion_offset() {
        let store = SymKeyStore::new();
        // Expired well beyond grace and deletion offset already.
        let now = unix_now();
        store
            .set_key(KeyInput::Raw(&[3u8; 20]), now.saturating_sub(1000))
            .unwrap();
        store.purge_deleted();
        assert_eq!(store.len(), 0);
    }
}
