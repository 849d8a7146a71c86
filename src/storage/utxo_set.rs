// Unspent outputs are never stored by the chain itself. UTXOSet rebuilds
// them for one address by walking the whole chain from the tip, which is
// always correct and costs one full scan per query.

use crate::core::{AddressAuthorizer, Authorizer, Blockchain, TXOutput};
use crate::error::Result;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ops::ControlFlow;

/// Selected outputs: hex transaction id -> output indices
pub type SpendableOutputs = BTreeMap<String, BTreeSet<i64>>;

/// An output nobody has spent yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct UtxoEntry {
    txid: Vec<u8>,
    index: i64,
    output: TXOutput,
}

impl UtxoEntry {
    pub fn new(txid: &[u8], index: i64, output: TXOutput) -> UtxoEntry {
        UtxoEntry {
            txid: txid.to_vec(),
            index,
            output,
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_index(&self) -> i64 {
        self.index
    }

    pub fn get_output(&self) -> &TXOutput {
        &self.output
    }
}

/// Anything that can report the unspent outputs of an address.
pub trait UtxoSource {
    /// Every unspent output locked to `address`, in the source's natural order
    fn find_unspent(&self, address: &str) -> Result<Vec<UtxoEntry>>;

    /// Greedy coin selection: take outputs in `find_unspent` order until
    /// their sum reaches `amount`. Returns the sum and the selection; the sum
    /// is below `amount` only when every output was taken.
    fn find_spendable_outputs(&self, address: &str, amount: f64) -> Result<(f64, SpendableOutputs)> {
        let mut selector = GreedySelector::new(amount);
        for entry in self.find_unspent(address)? {
            if selector.take(&entry).is_break() {
                break;
            }
        }
        Ok(selector.finish())
    }

    fn balance(&self, address: &str) -> Result<f64> {
        Ok(self
            .find_unspent(address)?
            .iter()
            .fold(0.0, |total, entry| total + entry.output.get_value()))
    }
}

struct GreedySelector {
    amount: f64,
    accumulated: f64,
    selection: SpendableOutputs,
}

impl GreedySelector {
    fn new(amount: f64) -> GreedySelector {
        GreedySelector {
            amount,
            accumulated: 0.0,
            selection: BTreeMap::new(),
        }
    }

    fn take(&mut self, entry: &UtxoEntry) -> ControlFlow<()> {
        self.accumulated += entry.output.get_value();
        self.selection
            .entry(HEXLOWER.encode(&entry.txid))
            .or_default()
            .insert(entry.index);
        if self.accumulated >= self.amount {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn finish(self) -> (f64, SpendableOutputs) {
        (self.accumulated, self.selection)
    }
}

pub struct UTXOSet {
    blockchain: Blockchain,
    authorizer: Box<dyn Authorizer>,
}

impl UTXOSet {
    pub fn new(blockchain: Blockchain) -> UTXOSet {
        Self::with_authorizer(blockchain, Box::new(AddressAuthorizer))
    }

    pub fn with_authorizer(blockchain: Blockchain, authorizer: Box<dyn Authorizer>) -> UTXOSet {
        UTXOSet {
            blockchain,
            authorizer,
        }
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    // Walks tip to genesis, handing every unspent output of `address` to
    // `visit` until it breaks. Spends are recorded as they are met; since
    // an input only references an older output, the spend is always seen
    // before the output it consumes.
    fn scan<F>(&self, address: &str, mut visit: F) -> Result<()>
    where
        F: FnMut(UtxoEntry) -> ControlFlow<()>,
    {
        let mut spent_txos: HashMap<Vec<u8>, HashSet<i64>> = HashMap::new();

        for block in self.blockchain.iterator() {
            let block = block?;
            for tx in block.get_transactions() {
                for (idx, out) in tx.get_vout().iter().enumerate() {
                    if !out.is_locked_with(address) {
                        continue;
                    }
                    let idx = idx as i64;
                    let spent = spent_txos
                        .get(tx.get_id())
                        .is_some_and(|outs| outs.contains(&idx));
                    if spent {
                        continue;
                    }
                    if visit(UtxoEntry::new(tx.get_id(), idx, out.clone())).is_break() {
                        return Ok(());
                    }
                }

                if tx.is_coinbase() {
                    continue;
                }
                for txin in tx.get_vin() {
                    if self.authorizer.check(txin.get_unlock_proof(), address) {
                        spent_txos
                            .entry(txin.get_txid().to_vec())
                            .or_default()
                            .insert(txin.get_vout());
                    }
                }
            }
        }
        Ok(())
    }
}

impl UtxoSource for UTXOSet {
    fn find_unspent(&self, address: &str) -> Result<Vec<UtxoEntry>> {
        let mut utxos = vec![];
        self.scan(address, |entry| {
            utxos.push(entry);
            ControlFlow::Continue(())
        })?;
        Ok(utxos)
    }

    // Stops walking the chain as soon as the amount is covered
    fn find_spendable_outputs(&self, address: &str, amount: f64) -> Result<(f64, SpendableOutputs)> {
        let mut selector = GreedySelector::new(amount);
        self.scan(address, |entry| selector.take(&entry))?;
        Ok(selector.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use tempfile::tempdir;

    fn chain_with_reward(dir: &std::path::Path) -> Blockchain {
        Blockchain::create_blockchain_with_path("M1", dir.join("chain"), 12.5).unwrap()
    }

    fn coinbase(to: &str) -> Transaction {
        Transaction::new_coinbase_tx(to, "reward", 12.5).unwrap()
    }

    #[test]
    fn test_genesis_balance() {
        let temp_dir = tempdir().unwrap();
        let utxo_set = UTXOSet::new(chain_with_reward(temp_dir.path()));

        assert_eq!(utxo_set.balance("M1").unwrap(), 12.5);
        let empty = utxo_set.balance("P1").unwrap();
        assert_eq!(empty, 0.0);
        assert!(empty.is_sign_positive());
        assert_eq!(format!("{empty}"), "0");

        let unspent = utxo_set.find_unspent("M1").unwrap();
        assert_eq!(unspent.len(), 1);
        assert_eq!(unspent[0].get_index(), 0);
        assert_eq!(unspent[0].get_output(), &TXOutput::new(12.5, "M1"));
    }

    #[test]
    fn test_unspent_are_reported_newest_first() {
        let temp_dir = tempdir().unwrap();
        let blockchain = chain_with_reward(temp_dir.path());
        let newer = coinbase("M1");
        blockchain.mine_block(std::slice::from_ref(&newer)).unwrap();

        let utxo_set = UTXOSet::new(blockchain);
        let unspent = utxo_set.find_unspent("M1").unwrap();
        assert_eq!(unspent.len(), 2);
        assert_eq!(unspent[0].get_txid(), newer.get_id());
    }

    #[test]
    fn test_spent_outputs_are_excluded() {
        let temp_dir = tempdir().unwrap();
        let blockchain = chain_with_reward(temp_dir.path());
        let utxo_set = UTXOSet::new(blockchain.clone());

        let tx =
            Transaction::new_utxo_transaction("M1", "P1", 12.5, &utxo_set, &AddressAuthorizer)
                .unwrap();
        blockchain.mine_block(&[coinbase("X"), tx]).unwrap();

        assert!(utxo_set.find_unspent("M1").unwrap().is_empty());
        assert_eq!(utxo_set.balance("P1").unwrap(), 12.5);
    }

    #[test]
    fn test_spendable_stops_once_amount_is_covered() {
        let temp_dir = tempdir().unwrap();
        let blockchain = chain_with_reward(temp_dir.path());
        let newest = coinbase("M1");
        blockchain.mine_block(&[coinbase("M1")]).unwrap();
        blockchain.mine_block(std::slice::from_ref(&newest)).unwrap();

        let utxo_set = UTXOSet::new(blockchain);
        let (accumulated, selection) = utxo_set.find_spendable_outputs("M1", 10.0).unwrap();

        assert_eq!(accumulated, 12.5);
        assert_eq!(selection.len(), 1);
        assert_eq!(
            selection.get(&HEXLOWER.encode(newest.get_id())),
            Some(&BTreeSet::from([0]))
        );

        let (accumulated, selection) = utxo_set.find_spendable_outputs("M1", 30.0).unwrap();
        assert_eq!(accumulated, 37.5);
        assert_eq!(selection.len(), 3);
    }

    // Rejects every proof, so no spend is ever counted
    struct DenyAll;

    impl Authorizer for DenyAll {
        fn prove(&self, identity: &str) -> String {
            identity.to_string()
        }

        fn check(&self, _proof: &str, _address: &str) -> bool {
            false
        }
    }

    #[test]
    fn test_scan_consults_the_authorizer() {
        let temp_dir = tempdir().unwrap();
        let blockchain = chain_with_reward(temp_dir.path());
        let utxo_set = UTXOSet::new(blockchain.clone());
        let tx =
            Transaction::new_utxo_transaction("M1", "P1", 5.0, &utxo_set, &AddressAuthorizer)
                .unwrap();
        blockchain.mine_block(&[coinbase("X"), tx]).unwrap();

        let denying = UTXOSet::with_authorizer(blockchain, Box::new(DenyAll));
        // The genesis output still counts: its spend is not recognized
        assert_eq!(denying.balance("M1").unwrap(), 12.5 + 7.5);
        assert_eq!(utxo_set.balance("M1").unwrap(), 7.5);
    }
}
