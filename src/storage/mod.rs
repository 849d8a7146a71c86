//! Unspent output lookups
//!
//! `UTXOSet` answers every query with a full scan of the chain and is the
//! reference answer. `UtxoIndex` keeps the same information up to date in
//! a sled tree so balance queries need not walk the chain.

pub mod utxo_index;
pub mod utxo_set;

pub use utxo_index::UtxoIndex;
pub use utxo_set::{SpendableOutputs, UTXOSet, UtxoEntry, UtxoSource};
