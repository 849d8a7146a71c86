//! # Alpha Ledger
//!
//! A single-node ledger: an append-only chain of proof-of-work blocks
//! holding value transfers in the unspent-output model.
//!
//! ## Layout
//! - `core/`: blocks, proof of work, transactions, spend authorization and
//!   the sled-backed chain store
//! - `storage/`: unspent output lookups (full chain scan and an optional
//!   incremental index)
//! - `wallet/`: key pairs and address derivation/validation
//! - `config/`: settings read from the environment
//! - `utils/`: hashing, canonical encoding, timestamps
//! - `cli/`: command-line argument definitions
//!
//! Balances are recomputed by walking the whole chain. That is slow on a
//! long chain but needs no extra state to stay correct; `UtxoIndex` trades
//! a second sled tree for faster reads.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

pub use cli::{Command, Opt};
pub use config::{Config, GLOBAL_CONFIG};
pub use core::{
    AddressAuthorizer, Authorizer, Block, Blockchain, BlockchainIterator, ProofOfWork, TXInput,
    TXOutput, Transaction,
};
pub use error::{BlockchainError, Result};
pub use storage::{UTXOSet, UtxoEntry, UtxoIndex, UtxoSource};
pub use utils::{current_timestamp, sha256_digest};
pub use wallet::{derive_address, pub_key_hash_from_address, validate_address, Wallet, Wallets};
