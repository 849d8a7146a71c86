use crate::config::GLOBAL_CONFIG;
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use crate::wallet::Wallet;
use log::{error, info};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Key pairs created on this machine, persisted to a single wallet file
pub struct Wallets {
    wallets: HashMap<String, Wallet>,
    path: PathBuf,
}

impl Wallets {
    /// Wallets stored in the configured wallet file
    pub fn new() -> Result<Wallets> {
        Self::with_path(GLOBAL_CONFIG.get_wallet_file())
    }

    /// Load the wallet file at `path`. A missing file means no wallets yet;
    /// a file that exists but cannot be read or decoded is an error.
    pub fn with_path<P: AsRef<Path>>(path: P) -> Result<Wallets> {
        let mut wallets = Wallets {
            wallets: HashMap::new(),
            path: path.as_ref().to_path_buf(),
        };
        wallets.load_from_file()?;
        Ok(wallets)
    }

    /// Create a key pair and persist it. The address is only returned once
    /// the wallet file holding its key has been written.
    pub fn create_wallet(&mut self) -> Result<String> {
        let wallet = Wallet::new()?;
        let address = wallet.get_address();
        self.wallets.insert(address.clone(), wallet);
        if let Err(e) = self.save_to_file() {
            self.wallets.remove(&address);
            error!("Could not save wallets to {}: {e}", self.path.display());
            return Err(e);
        }
        info!("Created wallet {address}");
        Ok(address)
    }

    pub fn get_addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.wallets.keys().cloned().collect();
        addresses.sort();
        addresses
    }

    pub fn get_wallet(&self, address: &str) -> Option<&Wallet> {
        self.wallets.get(address)
    }

    fn load_from_file(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let mut file = File::open(&self.path)?;
        let mut buf = vec![];
        file.read_to_end(&mut buf)?;
        self.wallets = deserialize(&buf[..]).map_err(|e| {
            BlockchainError::Wallet(format!(
                "wallet file {} is unreadable: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }

    // Written next to the target and renamed over it, so a failed write
    // never leaves a truncated wallet file behind.
    fn save_to_file(&self) -> Result<()> {
        let mut tmp_name = self.path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        let wallets_bytes = serialize(&self.wallets)?;
        writer.write_all(wallets_bytes.as_slice())?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| BlockchainError::Io(e.to_string()))?
            .sync_all()?;

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::validate_address;
    use tempfile::tempdir;

    #[test]
    fn test_wallets_persist_across_loads() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("wallet.dat");

        let mut wallets = Wallets::with_path(&path).unwrap();
        let first = wallets.create_wallet().unwrap();
        let second = wallets.create_wallet().unwrap();
        assert!(validate_address(&first));

        let reloaded = Wallets::with_path(&path).unwrap();
        let addresses = reloaded.get_addresses();
        assert_eq!(addresses.len(), 2);
        assert!(addresses.contains(&first));
        assert!(addresses.contains(&second));
        assert_eq!(
            reloaded.get_wallet(&first).unwrap().get_address(),
            first
        );
    }

    #[test]
    fn test_missing_file_means_no_wallets() {
        let temp_dir = tempdir().unwrap();
        let wallets = Wallets::with_path(temp_dir.path().join("absent.dat")).unwrap();
        assert!(wallets.get_addresses().is_empty());
        assert!(wallets.get_wallet("M1").is_none());
    }

    #[test]
    fn test_failed_save_returns_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("missing_dir").join("wallet.dat");

        let mut wallets = Wallets::with_path(&path).unwrap();
        assert!(wallets.create_wallet().is_err());
        assert!(wallets.get_addresses().is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_file_is_rejected_and_left_intact() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("wallet.dat");

        let mut wallets = Wallets::with_path(&path).unwrap();
        wallets.create_wallet().unwrap();
        wallets.create_wallet().unwrap();

        let mut bytes = fs::read(&path).unwrap();
        bytes.pop();
        fs::write(&path, &bytes).unwrap();

        let result = Wallets::with_path(&path);
        assert!(matches!(result, Err(BlockchainError::Wallet(_))));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }
}
