//! Identity collaborator
//!
//! Key pairs, address derivation and checksum validation. The ledger core
//! treats addresses as opaque strings; only the command layer checks them.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{
    convert_address, derive_address, hash_pub_key, pub_key_hash_from_address, validate_address,
    Wallet, ADDRESS_CHECK_SUM_LEN,
};
pub use wallets::Wallets;
