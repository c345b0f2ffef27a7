use crate::crypto::{base64_encode, sha256};
use crate::error::SymKeyError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Grace period subtracted from a key's expiry before it is refused for
/// creating new capabilities (but still accepted for extraction/decryption
/// of ones signed earlier).
pub const GRACE_SECS: u64 = 5;
/// How long a key is kept in the store after it has fully expired, to
/// tolerate clock skew between MGM and FST processes.
pub const DELETION_OFFSET_SECS: u64 = 60;

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_secs()
}

/// Lifecycle state of a [`SymKey`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    /// Usable both for signing new capabilities and for verifying old ones.
    Valid,
    /// Expired (or inside the grace window) but not yet past the deletion
    /// offset: verification of existing capabilities still works, but no
    /// new capability may be created with this key.
    Grace,
    /// Past `expiry + DELETION_OFFSET`; eligible for removal from the store.
    Deleted,
}

/// A symmetric key: 20 raw bytes, its base64 form, a digest used to address
/// it, and an expiry (`0` = never expires).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymKey {
    pub(crate) raw: [u8; 20],
    pub(crate) base64: String,
    pub(crate) digest: [u8; 32],
    pub(crate) digest64: String,
    pub expiry: u64,
}

impl SymKey {
    pub(crate) fn from_raw(raw: [u8; 20], expiry: u64) -> Self {
        let digest = sha256(&raw);
        let digest64 = base64_encode(&digest);
        let base64 = base64_encode(&raw);
        SymKey {
            raw,
            base64,
            digest,
            digest64,
            expiry,
        }
    }

    pub fn raw(&self) -> &[u8; 20] {
        &self.raw
    }

    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn digest64(&self) -> &str {
        &self.digest64
    }

    /// State of this key at unix time `now`.
    pub fn state_at(&self, now: u64) -> KeyState {
        if self.expiry == 0 {
            return KeyState::Valid;
        }
        if now > self.expiry + DELETION_OFFSET_SECS {
            KeyState::Deleted
        } else if now + GRACE_SECS < self.expiry {
            KeyState::Valid
        } else {
            KeyState::Grace
        }
    }

    pub fn state(&self) -> KeyState {
        self.state_at(unix_now())
    }

    pub fn is_valid(&self) -> bool {
        self.state() == KeyState::Valid
    }
}

/// Parses a raw key from either 20 raw bytes or its base64 encoding.
pub enum KeyInput<'a> {
    Raw(&'a [u8]),
    Base64(&'a str),
}

impl<'a> KeyInput<'a> {
    pub(crate) fn into_raw20(self) -> Result<[u8; 20], SymKeyError> {
        let bytes = match self {
            KeyInput::Raw(b) => b.to_vec(),
            KeyInput::Base64(s) => crate::crypto::base64_decode(s)
                .map_err(|_| SymKeyError::Corrupt("invalid base64 key".into()))?,
        };
        if bytes.len() != 20 {
            return Err(SymKeyError::InvalidKeyLength(bytes.len()));
        }
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes);
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_iff_expiry_zero_or_beyond_grace() {
        let key = SymKey::from_raw([1; 20], 0);
        assert_eq!(key.state_at(1_000_000), KeyState::Valid);

        let key = SymKey::from_raw([1; 20], 100);
        assert_eq!(key.state_at(100 - GRACE_SECS - 1), KeyState::Valid);
        assert_eq!(key.state_at(100 - GRACE_SECS), KeyState::Grace);
        assert_eq!(key.state_at(100), KeyState::Grace);
        assert_eq!(key.state_at(100 + DELETION_OFFSET_SECS), KeyState::Grace);
        assert_eq!(
            key.state_at(100 + DELETION_OFFSET_SECS + 1),
            KeyState::Deleted
        );
    }

    #[test]
    fn rejects_wrong_length() {
        let err = KeyInput::Raw(&[0u8; 5]).into_raw20().unwrap_err();
        assert_eq!(err, SymKeyError::InvalidKeyLength(5));
    }
}
