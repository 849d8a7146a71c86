use crate::core::{ProofOfWork, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

/// Header format version
pub const BLOCK_VERSION: u64 = 0;
/// Difficulty bits recorded in every header. The target itself is fixed.
pub const DIFFICULTY_BITS: u64 = 16;

// A mined block is never mutated. Field order is the persisted format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    version: u64,
    pre_block_hash: Vec<u8>, // empty for the genesis block
    tx_root: Vec<u8>,
    timestamp: i64,
    bits: u64,
    nonce: u64,
    hash: Vec<u8>,
    transactions: Vec<Transaction>,
}

impl Block {
    /// Assemble a block on top of `pre_block_hash` and mine it. Blocks the
    /// caller until proof of work is found.
    pub fn new_block(pre_block_hash: Vec<u8>, transactions: &[Transaction]) -> Result<Block> {
        if transactions.is_empty() {
            return Err(BlockchainError::InvalidBlock(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            version: BLOCK_VERSION,
            pre_block_hash,
            tx_root: Self::hash_transactions(transactions),
            timestamp: current_timestamp()?,
            bits: DIFFICULTY_BITS,
            nonce: 0,
            hash: vec![],
            transactions: transactions.to_vec(),
        };

        let (hash, nonce) = ProofOfWork::new_proof_of_work(&block).run();
        block.hash = hash;
        block.nonce = nonce;
        info!(
            "Proof-of-work completed for block {} (nonce {nonce})",
            HEXLOWER.encode(&block.hash)
        );

        Ok(block)
    }

    pub fn generate_genesis_block(transaction: &Transaction) -> Result<Block> {
        Block::new_block(vec![], std::slice::from_ref(transaction))
    }

    /// Single hash over the concatenated transaction ids. This is not a
    /// Merkle tree, and switching to one would change every block hash.
    pub fn hash_transactions(transactions: &[Transaction]) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in transactions {
            txhashs.extend(transaction.get_id());
        }
        sha256_digest(txhashs.as_slice())
    }

    pub fn verify_tx_root(&self) -> bool {
        Self::hash_transactions(&self.transactions) == self.tx_root
    }

    pub fn is_genesis(&self) -> bool {
        self.pre_block_hash.is_empty()
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_version(&self) -> u64 {
        self.version
    }

    pub fn get_pre_block_hash(&self) -> &[u8] {
        self.pre_block_hash.as_slice()
    }

    pub fn get_tx_root(&self) -> &[u8] {
        self.tx_root.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_bits(&self) -> u64 {
        self.bits
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coinbase(to: &str) -> Transaction {
        Transaction::new_coinbase_tx(to, "note", 12.5).unwrap()
    }

    #[test]
    fn test_new_block_is_mined() {
        let block = Block::new_block(vec![1; 32], &[coinbase("M1")]).unwrap();

        assert_eq!(block.get_version(), BLOCK_VERSION);
        assert_eq!(block.get_bits(), DIFFICULTY_BITS);
        assert_eq!(block.get_hash().len(), 32);
        assert!(ProofOfWork::validate(&block));
        assert!(!block.is_genesis());
    }

    #[test]
    fn test_genesis_has_empty_prev_hash() {
        let block = Block::generate_genesis_block(&coinbase("M1")).unwrap();
        assert!(block.is_genesis());
        assert!(block.get_pre_block_hash().is_empty());
    }

    #[test]
    fn test_empty_block_is_rejected() {
        let result = Block::new_block(vec![], &[]);
        assert!(matches!(result, Err(BlockchainError::InvalidBlock(_))));
    }

    #[test]
    fn test_tx_root_is_hash_of_concatenated_ids() {
        let txs = vec![coinbase("M1"), coinbase("M2")];
        let mut concat = txs[0].get_id().to_vec();
        concat.extend(txs[1].get_id());

        let block = Block::new_block(vec![], &txs).unwrap();
        assert_eq!(block.get_tx_root(), sha256_digest(&concat).as_slice());
        assert!(block.verify_tx_root());
    }

    #[test]
    fn test_serialize_round_trip_keeps_every_field() {
        let block = Block::new_block(vec![3; 32], &[coinbase("M1")]).unwrap();
        let decoded = Block::deserialize(&block.serialize().unwrap()).unwrap();

        assert_eq!(decoded, block);
        assert_eq!(decoded.get_hash(), block.get_hash());
        assert_eq!(decoded.get_nonce(), block.get_nonce());
        assert!(ProofOfWork::validate(&decoded));
    }

    #[test]
    fn test_truncated_bytes_fail_to_decode() {
        let block = Block::new_block(vec![], &[coinbase("M1")]).unwrap();
        let bytes = block.serialize().unwrap();
        let result = Block::deserialize(&bytes[..bytes.len() / 2]);
        assert!(matches!(result, Err(BlockchainError::Decode(_))));
    }

    #[test]
    fn test_validate_rejects_nonce_that_misses_target() {
        let mut block = Block::new_block(vec![], &[coinbase("M1")]).unwrap();
        block.nonce += 1;
        while ProofOfWork::validate(&block) {
            block.nonce += 1;
        }
        assert!(!ProofOfWork::validate(&block));
    }

    #[test]
    fn test_validate_rejects_rewritten_hash() {
        let mut block = Block::new_block(vec![], &[coinbase("M1")]).unwrap();
        // Below target, but not the digest of this header
        block.hash = vec![0; 32];
        assert!(!ProofOfWork::validate(&block));
    }
}
