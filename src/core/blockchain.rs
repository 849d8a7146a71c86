// The chain store: every block lives in a sled tree keyed by its hash,
// next to one reserved key pointing at the tip. Blocks are only ever
// added, and the tip moves in the same transaction that writes the block.

use crate::config::GLOBAL_CONFIG;
use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use data_encoding::HEXLOWER;
use log::{debug, info};
use sled::transaction::{abort, ConflictableTransactionError, TransactionError};
use sled::{Db, Tree};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

const TIP_BLOCK_HASH_KEY: &str = "tip_block_hash";
const BLOCKS_TREE: &str = "blocks";

/// Note carried by the genesis coinbase input
pub const GENESIS_NOTE: &str = "I am alpha.";

#[derive(Clone)]
pub struct Blockchain {
    tip_hash: Arc<RwLock<Vec<u8>>>,
    db: Db,
    blocks: Tree,
    db_path: PathBuf,
}

impl Blockchain {
    /// Create the chain at the configured location with the configured reward
    pub fn create_blockchain(genesis_address: &str) -> Result<Blockchain> {
        Self::create_blockchain_with_path(
            genesis_address,
            GLOBAL_CONFIG.get_db_path(),
            GLOBAL_CONFIG.get_reward()?,
        )
    }

    /// Open the chain at the configured location
    pub fn new_blockchain() -> Result<Blockchain> {
        Self::new_blockchain_with_path(GLOBAL_CONFIG.get_db_path())
    }

    /// Mine a genesis block paying `reward` to `genesis_address` and persist it
    /// as the tip. Fails with `AlreadyExists` and writes nothing when a chain
    /// is already present at `db_path`.
    pub fn create_blockchain_with_path<P: AsRef<Path>>(
        genesis_address: &str,
        db_path: P,
        reward: f64,
    ) -> Result<Blockchain> {
        let path = db_path.as_ref().to_path_buf();
        let (db, blocks) = Self::open_store(&path)?;

        if blocks.get(TIP_BLOCK_HASH_KEY)?.is_some() {
            return Err(BlockchainError::AlreadyExists);
        }

        info!("Creating genesis block for address: {genesis_address}");
        let coinbase_tx = Transaction::new_coinbase_tx(genesis_address, GENESIS_NOTE, reward)?;
        let block = Block::generate_genesis_block(&coinbase_tx)?;
        Self::commit_block(&blocks, &block, None, || Ok(()))?;

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(block.get_hash().to_vec())),
            db,
            blocks,
            db_path: path,
        })
    }

    /// Open an existing chain. Fails with `NotFound` when none was created.
    pub fn new_blockchain_with_path<P: AsRef<Path>>(db_path: P) -> Result<Blockchain> {
        let path = db_path.as_ref().to_path_buf();
        let (db, blocks) = Self::open_store(&path)?;

        let tip_hash = blocks.get(TIP_BLOCK_HASH_KEY)?.ok_or_else(|| {
            BlockchainError::NotFound(format!(
                "no blockchain at {}, create one first",
                path.display()
            ))
        })?;

        Ok(Blockchain {
            tip_hash: Arc::new(RwLock::new(tip_hash.to_vec())),
            db,
            blocks,
            db_path: path,
        })
    }

    fn open_store(path: &Path) -> Result<(Db, Tree)> {
        let db = sled::open(path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| BlockchainError::Database(format!("Failed to open blocks tree: {e}")))?;
        Ok((db, blocks))
    }

    // Writes the block and moves the tip in one sled transaction. The stored
    // tip must still equal `expected_tip` (None: no chain yet). The hook runs
    // between the two writes; an error from it aborts both.
    fn commit_block<F>(
        blocks: &Tree,
        block: &Block,
        expected_tip: Option<&[u8]>,
        after_block_write: F,
    ) -> Result<()>
    where
        F: Fn() -> Result<()>,
    {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        blocks
            .transaction(|tx_db| {
                let current_tip = tx_db.get(TIP_BLOCK_HASH_KEY)?;
                match (expected_tip, current_tip) {
                    (None, Some(_)) => return abort(BlockchainError::AlreadyExists),
                    (Some(_), None) => {
                        return abort(BlockchainError::NotFound("chain tip".to_string()))
                    }
                    (Some(expected), Some(actual)) if expected != &actual[..] => {
                        return abort(BlockchainError::Database(format!(
                            "tip moved to {} while appending",
                            HEXLOWER.encode(&actual)
                        )))
                    }
                    _ => {}
                }

                tx_db.insert(block_hash, block_data.as_slice())?;
                after_block_write().map_err(ConflictableTransactionError::Abort)?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            })
            .map_err(|e: TransactionError<BlockchainError>| match e {
                TransactionError::Abort(err) => err,
                TransactionError::Storage(err) => {
                    BlockchainError::Database(format!("Failed to update blocks tree: {err}"))
                }
            })?;

        blocks.flush()?;
        Ok(())
    }

    pub fn get_db(&self) -> &Db {
        &self.db
    }

    pub fn get_db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_tip_hash(&self) -> Vec<u8> {
        self.tip_hash
            .read()
            .expect("Failed to acquire read lock on tip_hash - this should never happen")
            .clone()
    }

    fn set_tip_hash(&self, new_tip_hash: &[u8]) {
        let mut tip_hash = self
            .tip_hash
            .write()
            .expect("Failed to acquire write lock on tip_hash - this should never happen");
        *tip_hash = new_tip_hash.to_vec();
    }

    /// Append a block holding `transactions` on top of the current tip.
    ///
    /// Mining runs before anything is written. The block and the new tip
    /// pointer then land in a single store transaction, and the in-memory tip
    /// only moves once that transaction has committed.
    pub fn mine_block(&self, transactions: &[Transaction]) -> Result<Block> {
        let tip = self.get_tip_hash();
        let block = Block::new_block(tip.clone(), transactions)?;
        Self::commit_block(&self.blocks, &block, Some(&tip), || Ok(()))?;
        self.set_tip_hash(block.get_hash());

        info!(
            "Appended block {} with {} transactions",
            HEXLOWER.encode(block.get_hash()),
            transactions.len()
        );
        Ok(block)
    }

    /// Walk from the tip back to genesis. Each call starts a fresh walk.
    pub fn iterator(&self) -> BlockchainIterator {
        BlockchainIterator::new(self.get_tip_hash(), self.blocks.clone())
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        match self.blocks.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    pub fn block_count(&self) -> Result<usize> {
        let mut count = 0;
        for block in self.iterator() {
            block?;
            count += 1;
        }
        Ok(count)
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block
                .get_transactions()
                .iter()
                .find(|tx| tx.get_id() == txid)
            {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    /// Re-check every persisted block: stored under its own hash, proof of
    /// work below target, tx root matching its transactions. Returns the
    /// number of blocks checked.
    pub fn audit(&self) -> Result<usize> {
        let mut expected_hash = self.get_tip_hash();
        let mut checked = 0;

        for block in self.iterator() {
            let block = block?;
            let hash_hex = HEXLOWER.encode(block.get_hash());

            if block.get_hash() != expected_hash.as_slice() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {hash_hex} stored under {}",
                    HEXLOWER.encode(&expected_hash)
                )));
            }
            if !ProofOfWork::validate(&block) {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {hash_hex} fails proof of work"
                )));
            }
            if !block.verify_tx_root() {
                return Err(BlockchainError::InvalidBlock(format!(
                    "block {hash_hex} has a mismatched tx root"
                )));
            }

            debug!("Audited block {hash_hex}");
            expected_hash = block.get_pre_block_hash().to_vec();
            checked += 1;
        }
        Ok(checked)
    }
}

/// Lazy tip-to-genesis walk, one store lookup per step. A block that is
/// missing or cannot be decoded is reported once and ends the walk.
pub struct BlockchainIterator {
    blocks: Tree,
    current_hash: Option<Vec<u8>>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, blocks: Tree) -> BlockchainIterator {
        BlockchainIterator {
            blocks,
            current_hash: Some(tip_hash),
        }
    }

    fn lookup(&self, hash: &[u8]) -> Result<Block> {
        let data = self.blocks.get(hash)?.ok_or_else(|| {
            BlockchainError::Database(format!(
                "block {} is referenced by the chain but missing from the store",
                HEXLOWER.encode(hash)
            ))
        })?;
        Block::deserialize(data.as_ref())
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_hash = self.current_hash.take()?;
        let block = match self.lookup(&current_hash) {
            Ok(block) => block,
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            self.current_hash = Some(block.get_pre_block_hash().to_vec());
        }
        Some(Ok(block))
    }
}
