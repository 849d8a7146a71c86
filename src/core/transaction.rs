// Value transfer in the UTXO model: every transaction consumes earlier
// outputs through its inputs and creates new outputs locked to addresses.
// A coinbase transaction has a single placeholder input and mints the
// block reward.

use crate::core::Authorizer;
use crate::error::{BlockchainError, Result};
use crate::storage::UtxoSource;
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::debug;
use serde::{Deserialize, Serialize};

/// Output index carried by the placeholder input of a coinbase transaction
pub const COINBASE_VOUT: i64 = -1;

// An input points at output `vout` of transaction `txid` and carries the
// spender's unlock proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXInput {
    txid: Vec<u8>,
    vout: i64,
    unlock_proof: String,
}

impl TXInput {
    pub fn new(txid: &[u8], vout: i64, unlock_proof: &str) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout,
            unlock_proof: unlock_proof.to_string(),
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    pub fn get_unlock_proof(&self) -> &str {
        self.unlock_proof.as_str()
    }
}

// "Pay `value` to whoever can unlock `lock_script`"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: f64,
    lock_script: String,
}

impl TXOutput {
    pub fn new(value: f64, address: &str) -> TXOutput {
        TXOutput {
            value,
            lock_script: address.to_string(),
        }
    }

    pub fn get_value(&self) -> f64 {
        self.value
    }

    pub fn get_lock_script(&self) -> &str {
        self.lock_script.as_str()
    }

    pub fn is_locked_with(&self, address: &str) -> bool {
        self.lock_script == address
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
    timestamp: i64,
}

impl Transaction {
    /// Reward transaction paying `reward` to `to`. The note takes the place
    /// of an unlock proof since nothing is being spent.
    pub fn new_coinbase_tx(to: &str, note: &str, reward: f64) -> Result<Transaction> {
        let tx_input = TXInput::new(&[], COINBASE_VOUT, note);
        let txout = TXOutput::new(reward, to);

        let mut tx = Transaction {
            id: vec![],
            vin: vec![tx_input],
            vout: vec![txout],
            timestamp: current_timestamp()?,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Build a transfer of `amount` from `from` to `to`.
    ///
    /// Outputs are picked greedily in the order `source` reports them until
    /// they cover `amount`. Anything above `amount` comes back to `from` as a
    /// change output. Each input's unlock proof is produced by `authorizer`.
    pub fn new_utxo_transaction<S: UtxoSource + ?Sized>(
        from: &str,
        to: &str,
        amount: f64,
        source: &S,
        authorizer: &dyn Authorizer,
    ) -> Result<Transaction> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(BlockchainError::Transaction(format!(
                "Amount must be positive, got {amount}"
            )));
        }

        let (accumulated, valid_outputs) = source.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(BlockchainError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let proof = authorizer.prove(from);
        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                BlockchainError::Transaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out in outs {
                inputs.push(TXInput::new(&txid, out, &proof));
            }
        }

        let mut outputs = vec![TXOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TXOutput::new(accumulated - amount, from));
        }

        let mut tx = Transaction {
            id: vec![],
            vin: inputs,
            vout: outputs,
            timestamp: current_timestamp()?,
        };
        tx.id = tx.hash()?;
        debug!(
            "Built transfer {} spending {} inputs",
            HEXLOWER.encode(&tx.id),
            tx.vin.len()
        );
        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    // Digest of the transaction with an empty id
    fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
            timestamp: self.timestamp,
        };
        Ok(sha256_digest(&tx_copy.serialize()?))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }

    pub fn get_output_value(&self) -> f64 {
        self.vout.iter().fold(0.0, |total, out| total + out.get_value())
    }
}
