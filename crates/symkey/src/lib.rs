//! Symmetric-key store and capability engine.
//!
//! Mints and verifies opaque, HMAC-signed, time-bounded capabilities that
//! authorise a single replica transfer between two storage nodes. This is
//! the shared credential mechanism every other component in this workspace
//! (FSCK repair, the balance scheduler, the rebalancer) relies on to
//! authenticate the transfers it schedules.

mod crypto;
mod env;
mod error;
mod key;
mod store;

pub use crypto::{
    base64_decode, base64_encode, base64_prefixed, debase64_prefixed, hmac_sha256, sha256,
    sha256_hex,
};
pub use env::Env;
pub use error::SymKeyError;
pub use key::{DELETION_OFFSET_SECS, GRACE_SECS, KeyInput, KeyState, SymKey};
pub use store::{SymKeyStore, capability_is_live};

pub type Result<T> = std::result::Result<T, SymKeyError>;
