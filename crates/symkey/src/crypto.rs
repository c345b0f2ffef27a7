//! Standalone hashing/signing helpers, usable independently of capabilities.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Computes the HMAC-SHA256 of `data` under `key`.
///
/// `block_size`/`result_size` are accepted for interface parity with the
/// original capability engine but are not tunable for HMAC-SHA256 (RFC 2104
/// fixes the block size at 64 bytes and SHA-256 always yields 32 bytes); a
/// mismatched `result_size` truncates the output.
pub fn hmac_sha256(key: &[u8], data: &[u8], result_size: usize) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    let full = mac.finalize().into_bytes();
    full[..result_size.min(full.len())].to_vec()
}

/// Computes the SHA-256 digest of `data`, returned as lowercase hex.
pub fn sha256_hex(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().fold(String::new(), |mut acc, b| {
        acc.push_str(&format!("{b:02x}"));
        acc
    })
}

/// Computes the raw SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn base64_encode(data: &[u8]) -> String {
    BASE64.encode(data)
}

pub fn base64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(s)
}

/// Encodes `data` with the `base64:` prefix convention used on the wire.
pub fn base64_prefixed(data: &[u8]) -> String {
    format!("base64:{}", base64_encode(data))
}

/// Decodes a `base64:`-prefixed string back to raw bytes. Strings without
/// the prefix are returned as their raw UTF-8 bytes, unchanged.
pub fn debase64_prefixed(s: &str) -> Vec<u8> {
    match s.strip_prefix("base64:") {
        Some(rest) => base64_decode(rest).unwrap_or_else(|_| rest.as_bytes().to_vec()),
        None => s.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_prefix_round_trips() {
        let raw = b"hello capability";
        let wire = base64_prefixed(raw);
        assert!(wire.starts_with("base64:"));
        assert_eq!(debase64_prefixed(&wire), raw);
    }

    #[test]
    fn unprefixed_string_passes_through() {
        assert_eq!(debase64_prefixed("plain"), b"plain");
    }

    #[test]
    fn sha256_hex_is_stable() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
