use crate::core::Block;
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::debug;
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use std::ops::Shl;

// Literal target 0x0001 followed by 60 zero nibbles: a valid header hash
// starts with 16 zero bits. It does not depend on the block's `bits` field.
const TARGET_SHIFT: usize = 240;

static TARGET: Lazy<BigUint> = Lazy::new(|| BigUint::from(1u8).shl(TARGET_SHIFT));

pub struct ProofOfWork<'a> {
    block: &'a Block,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> ProofOfWork<'a> {
        ProofOfWork { block }
    }

    pub fn target() -> &'static BigUint {
        &TARGET
    }

    /// Validate proof-of-work for a block: the header digest at the block's
    /// nonce must be below target and equal to the hash the block carries.
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block);
        let hash = sha256_digest(pow.prepare_data(block.get_nonce()).as_slice());
        Self::meets_target(&hash) && hash.as_slice() == block.get_hash()
    }

    fn meets_target(hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < *TARGET
    }

    // version, prev hash, tx root, timestamp, bits, nonce. The block hash
    // is never part of its own preimage.
    pub(crate) fn prepare_data(&self, nonce: u64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_version().to_le_bytes());
        data_bytes.extend(self.block.get_pre_block_hash());
        data_bytes.extend(self.block.get_tx_root());
        data_bytes.extend(self.block.get_timestamp().to_le_bytes());
        data_bytes.extend(self.block.get_bits().to_le_bytes());
        data_bytes.extend(nonce.to_le_bytes());
        data_bytes
    }

    /// Sequential nonce search starting at zero. Returns the first header
    /// hash below the target together with its nonce.
    pub fn run(&self) -> (Vec<u8>, u64) {
        let mut nonce: u64 = 0;
        loop {
            let hash = sha256_digest(self.prepare_data(nonce).as_slice());
            if Self::meets_target(&hash) {
                debug!("Found nonce {nonce}: {}", HEXLOWER.encode(&hash));
                return (hash, nonce);
            }
            nonce = nonce.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;

    fn create_test_block(pre_block_hash: Vec<u8>) -> Block {
        let coinbase_tx = Transaction::new_coinbase_tx("M1", "test note", 12.5).unwrap();
        Block::new_block(pre_block_hash, &[coinbase_tx]).unwrap()
    }

    #[test]
    fn test_target_has_sixteen_leading_zero_bits() {
        let mut expected = vec![0u8; 32];
        expected[1] = 0x01;
        assert_eq!(*ProofOfWork::target(), BigUint::from_bytes_be(&expected));
    }

    #[test]
    fn test_mined_block_validates() {
        let block = create_test_block(vec![]);
        assert!(ProofOfWork::validate(&block));
        assert!(block.get_hash()[..2].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_mined_hash_matches_header_preimage() {
        let block = create_test_block(vec![7u8; 32]);
        let pow = ProofOfWork::new_proof_of_work(&block);
        let recomputed = sha256_digest(&pow.prepare_data(block.get_nonce()));
        assert_eq!(recomputed, block.get_hash());
    }

    #[test]
    fn test_prepare_data_consistency() {
        let block = create_test_block(vec![]);
        let pow = ProofOfWork::new_proof_of_work(&block);

        let data1 = pow.prepare_data(12345);
        let data2 = pow.prepare_data(12345);
        assert_eq!(data1, data2);

        let data3 = pow.prepare_data(54321);
        assert_ne!(data1, data3);
    }

    #[test]
    fn test_prepare_data_layout() {
        let block = create_test_block(vec![9u8; 32]);
        let pow = ProofOfWork::new_proof_of_work(&block);
        let data = pow.prepare_data(1);

        // version + prev hash + tx root + timestamp + bits + nonce
        assert_eq!(data.len(), 8 + 32 + 32 + 8 + 8 + 8);
        assert_eq!(&data[8..40], &[9u8; 32]);
        assert_eq!(&data[40..72], block.get_tx_root());
        assert_eq!(&data[data.len() - 8..], &1u64.to_le_bytes());
    }

    #[test]
    fn test_genesis_preimage_has_no_prev_hash_bytes() {
        let block = create_test_block(vec![]);
        let data = ProofOfWork::new_proof_of_work(&block).prepare_data(0);
        assert_eq!(data.len(), 8 + 32 + 8 + 8 + 8);
    }
}
