use crate::core::{AddressAuthorizer, Authorizer, Block, Blockchain};
use crate::error::{BlockchainError, Result};
use crate::storage::{UtxoEntry, UtxoSource};
use crate::utils::{deserialize, serialize};
use data_encoding::HEXLOWER;
use log::{debug, info};
use sled::Tree;
use std::collections::HashMap;

const UTXO_TREE: &str = "chainstate";
const UTXO_META_TREE: &str = "chainstate_meta";
const INDEXED_TIP_KEY: &str = "indexed_tip";

/// Incremental UTXO index kept in its own sled tree: transaction id ->
/// outputs of that transaction not spent yet.
///
/// Purely a cache. It records the chain tip it reflects and rebuilds itself
/// whenever that tip is not the chain's, so it reports the same balances as
/// a full chain scan with the same authorizer.
pub struct UtxoIndex {
    blockchain: Blockchain,
    utxo_tree: Tree,
    meta_tree: Tree,
    authorizer: Box<dyn Authorizer>,
}

impl UtxoIndex {
    pub fn new(blockchain: Blockchain) -> Result<UtxoIndex> {
        Self::with_authorizer(blockchain, Box::new(AddressAuthorizer))
    }

    pub fn with_authorizer(
        blockchain: Blockchain,
        authorizer: Box<dyn Authorizer>,
    ) -> Result<UtxoIndex> {
        let open = |name: &str| {
            blockchain.get_db().open_tree(name).map_err(|e| {
                BlockchainError::Database(format!("Failed to open {name} tree: {e}"))
            })
        };
        let utxo_tree = open(UTXO_TREE)?;
        let meta_tree = open(UTXO_META_TREE)?;
        Ok(UtxoIndex {
            blockchain,
            utxo_tree,
            meta_tree,
            authorizer,
        })
    }

    /// Hash of the block the index was last brought up to, if any
    pub fn indexed_tip(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.meta_tree.get(INDEXED_TIP_KEY)?.map(|tip| tip.to_vec()))
    }

    pub fn is_current(&self) -> Result<bool> {
        Ok(self.indexed_tip()? == Some(self.blockchain.get_tip_hash()))
    }

    fn ensure_current(&self) -> Result<()> {
        if !self.is_current()? {
            info!("UTXO index is behind the chain tip, rebuilding");
            self.reindex()?;
        }
        Ok(())
    }

    // Cleared before the index is touched and set again afterwards, so an
    // interrupted write is always seen as stale.
    fn set_indexed_tip(&self, tip: Option<&[u8]>) -> Result<()> {
        match tip {
            Some(hash) => self.meta_tree.insert(INDEXED_TIP_KEY, hash)?,
            None => self.meta_tree.remove(INDEXED_TIP_KEY)?,
        };
        self.meta_tree.flush()?;
        Ok(())
    }

    fn load(&self, txid: &[u8]) -> Result<Vec<UtxoEntry>> {
        match self.utxo_tree.get(txid)? {
            Some(bytes) => deserialize(bytes.as_ref()),
            None => Ok(vec![]),
        }
    }

    fn store(&self, txid: &[u8], entries: &[UtxoEntry]) -> Result<()> {
        if entries.is_empty() {
            self.utxo_tree.remove(txid)?;
        } else {
            self.utxo_tree.insert(txid, serialize(&entries.to_vec())?)?;
        }
        Ok(())
    }

    /// Rebuild the index from a full walk of the chain
    pub fn reindex(&self) -> Result<()> {
        self.set_indexed_tip(None)?;
        self.utxo_tree.clear()?;

        // (txid, index) -> unlock proofs presented for that output
        let mut spends: HashMap<(Vec<u8>, i64), Vec<String>> = HashMap::new();
        let mut unspent: HashMap<Vec<u8>, Vec<UtxoEntry>> = HashMap::new();
        let mut walked_tip: Option<Vec<u8>> = None;

        for block in self.blockchain.iterator() {
            let block = block?;
            if walked_tip.is_none() {
                walked_tip = Some(block.get_hash().to_vec());
            }
            for tx in block.get_transactions() {
                for (idx, out) in tx.get_vout().iter().enumerate() {
                    let idx = idx as i64;
                    let spent = spends
                        .get(&(tx.get_id().to_vec(), idx))
                        .is_some_and(|proofs| {
                            proofs
                                .iter()
                                .any(|proof| self.authorizer.check(proof, out.get_lock_script()))
                        });
                    if !spent {
                        unspent
                            .entry(tx.get_id().to_vec())
                            .or_default()
                            .push(UtxoEntry::new(tx.get_id(), idx, out.clone()));
                    }
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    spends
                        .entry((txin.get_txid().to_vec(), txin.get_vout()))
                        .or_default()
                        .push(txin.get_unlock_proof().to_string());
                }
            }
        }

        for (txid, entries) in &unspent {
            self.store(txid, entries)?;
        }
        self.utxo_tree.flush()?;
        self.set_indexed_tip(walked_tip.as_deref())?;
        info!("Rebuilt UTXO index for {} transactions", unspent.len());
        Ok(())
    }

    /// Apply one newly appended block. When the index does not stand on the
    /// block's parent it is rebuilt from the chain instead.
    pub fn update(&self, block: &Block) -> Result<()> {
        let indexed_tip = self.indexed_tip()?;
        if indexed_tip.as_deref() == Some(block.get_hash()) {
            debug!("Block {} is already indexed", HEXLOWER.encode(block.get_hash()));
            return Ok(());
        }
        if indexed_tip.as_deref() != Some(block.get_pre_block_hash()) {
            info!(
                "UTXO index does not precede block {}, rebuilding",
                HEXLOWER.encode(block.get_hash())
            );
            return self.reindex();
        }

        self.set_indexed_tip(None)?;
        for tx in block.get_transactions() {
            if !tx.is_coinbase() {
                for txin in tx.get_vin() {
                    let mut entries = self.load(txin.get_txid())?;
                    let before = entries.len();
                    entries.retain(|entry| {
                        entry.get_index() != txin.get_vout()
                            || !self
                                .authorizer
                                .check(txin.get_unlock_proof(), entry.get_output().get_lock_script())
                    });
                    if entries.len() == before {
                        debug!(
                            "Input {}:{} does not consume an indexed output",
                            HEXLOWER.encode(txin.get_txid()),
                            txin.get_vout()
                        );
                        continue;
                    }
                    self.store(txin.get_txid(), &entries)?;
                }
            }

            let new_outputs: Vec<UtxoEntry> = tx
                .get_vout()
                .iter()
                .enumerate()
                .map(|(idx, out)| UtxoEntry::new(tx.get_id(), idx as i64, out.clone()))
                .collect();
            self.store(tx.get_id(), &new_outputs)?;
        }
        self.utxo_tree.flush()?;
        self.set_indexed_tip(Some(block.get_hash()))
    }

    pub fn count_transactions(&self) -> Result<usize> {
        let mut counter = 0;
        for item in self.utxo_tree.iter() {
            item?;
            counter += 1;
        }
        Ok(counter)
    }
}

impl UtxoSource for UtxoIndex {
    fn find_unspent(&self, address: &str) -> Result<Vec<UtxoEntry>> {
        self.ensure_current()?;

        let mut utxos = vec![];
        for item in self.utxo_tree.iter() {
            let (_, v) = item?;
            let entries: Vec<UtxoEntry> = deserialize(v.as_ref())?;
            utxos.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.get_output().is_locked_with(address)),
            );
        }
        Ok(utxos)
    }
}
