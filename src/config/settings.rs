use crate::error::{BlockchainError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::RwLock;

pub static GLOBAL_CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub const DEFAULT_DB_PATH: &str = "data";
pub const DEFAULT_WALLET_FILE: &str = "wallet.dat";
pub const DEFAULT_REWARD: f64 = 12.5;

const DB_PATH_KEY: &str = "LEDGER_DB_PATH";
const REWARD_KEY: &str = "LEDGER_REWARD";
const WALLET_FILE_KEY: &str = "LEDGER_WALLET_FILE";
const UTXO_INDEX_KEY: &str = "LEDGER_UTXO_INDEX";

/// Process-wide settings, seeded from the environment and overridable at runtime.
pub struct Config {
    inner: RwLock<HashMap<String, String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Config {
        let mut map = HashMap::new();
        for key in [DB_PATH_KEY, REWARD_KEY, WALLET_FILE_KEY, UTXO_INDEX_KEY] {
            if let Ok(value) = env::var(key) {
                map.insert(String::from(key), value);
            }
        }

        Config {
            inner: RwLock::new(map),
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let inner = self
            .inner
            .read()
            .expect("Failed to acquire read lock on config - this should never happen");
        inner.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on config - this should never happen");
        inner.insert(String::from(key), value);
    }

    /// Directory of the chain database
    pub fn get_db_path(&self) -> PathBuf {
        PathBuf::from(
            self.get(DB_PATH_KEY)
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
        )
    }

    pub fn set_db_path(&self, path: &str) {
        self.set(DB_PATH_KEY, path.to_string());
    }

    /// Reward paid by every coinbase transaction
    pub fn get_reward(&self) -> Result<f64> {
        let Some(raw) = self.get(REWARD_KEY) else {
            return Ok(DEFAULT_REWARD);
        };
        let reward: f64 = raw
            .trim()
            .parse()
            .map_err(|e| BlockchainError::Config(format!("Invalid {REWARD_KEY} '{raw}': {e}")))?;
        if !reward.is_finite() || reward <= 0.0 {
            return Err(BlockchainError::Config(format!(
                "{REWARD_KEY} must be positive, got {raw}"
            )));
        }
        Ok(reward)
    }

    pub fn set_reward(&self, reward: f64) {
        self.set(REWARD_KEY, reward.to_string());
    }

    pub fn get_wallet_file(&self) -> PathBuf {
        PathBuf::from(
            self.get(WALLET_FILE_KEY)
                .unwrap_or_else(|| DEFAULT_WALLET_FILE.to_string()),
        )
    }

    pub fn set_wallet_file(&self, path: &str) {
        self.set(WALLET_FILE_KEY, path.to_string());
    }

    /// Whether appended blocks are also applied to the incremental UTXO index
    pub fn use_utxo_index(&self) -> bool {
        matches!(
            self.get(UTXO_INDEX_KEY).as_deref().map(str::trim),
            Some("1") | Some("true") | Some("yes")
        )
    }

    pub fn set_utxo_index(&self, enabled: bool) {
        self.set(UTXO_INDEX_KEY, enabled.to_string());
    }
}
