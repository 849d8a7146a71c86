//! Utility functions and helpers
//!
//! Hashing, canonical encoding, timestamps and the base58/key helpers
//! used by the wallet.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, current_timestamp, new_key_pair, ripemd160_digest,
    sha256_digest,
};

pub use serialization::{deserialize, serialize};
