//! Core ledger functionality
//!
//! Blocks, the proof-of-work puzzle, transactions, spend authorization and
//! the persistent chain store.

pub mod authorizer;
pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use authorizer::{AddressAuthorizer, Authorizer};
pub use block::{Block, BLOCK_VERSION, DIFFICULTY_BITS};
pub use blockchain::{Blockchain, BlockchainIterator, GENESIS_NOTE};
pub use proof_of_work::ProofOfWork;
pub use transaction::{TXInput, TXOutput, Transaction, COINBASE_VOUT};
