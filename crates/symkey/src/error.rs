use thiserror::Error;

/// Error taxonomy for key storage and capability sealing/verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymKeyError {
    #[error("key material must be exactly 20 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("no current key installed, or current key is not valid")]
    NoCurrentKey,

    #[error("no key found for digest {0}")]
    UnknownDigest(String),

    #[error("capability expired")]
    Expired,

    #[error("capability signature verification failed")]
    SignatureMismatch,

    #[error("capability payload is corrupt: {0}")]
    Corrupt(String),
}
