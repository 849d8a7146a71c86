//! Configuration management
//!
//! Chain location, block reward, wallet file and UTXO index settings,
//! read from `LEDGER_*` environment variables.

pub mod settings;

pub use settings::{Config, DEFAULT_DB_PATH, DEFAULT_REWARD, DEFAULT_WALLET_FILE, GLOBAL_CONFIG};
