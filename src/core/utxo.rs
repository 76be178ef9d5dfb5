//! Unspent transaction outputs
//!
//! A `UTXO` names one spendable output by the hash of the transaction that
//! created it and the output's position. The `UtxoPool` maps every currently
//! spendable UTXO to the output it represents.

use crate::core::transaction::{TotalAmount, Transaction, TransactionOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identity of one output: (creating transaction hash, output index)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UTXO {
    pub tx_hash: String,
    pub index: u32,
}

impl UTXO {
    pub fn new(tx_hash: &str, index: u32) -> Self {
        Self {
            tx_hash: tx_hash.to_string(),
            index,
        }
    }
}

impl fmt::Display for UTXO {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tx_hash, self.index)
    }
}

/// Set of spendable outputs.
///
/// Cloning produces a deep, independent copy; this is how branches of the
/// chain tree are kept isolated from one another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UtxoPool {
    entries: HashMap<UTXO, TransactionOutput>,
}

impl UtxoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, utxo: &UTXO) -> bool {
        self.entries.contains_key(utxo)
    }

    pub fn get(&self, utxo: &UTXO) -> Option<&TransactionOutput> {
        self.entries.get(utxo)
    }

    /// Add an output, replacing any output already stored under `utxo`
    pub fn add(&mut self, utxo: UTXO, output: TransactionOutput) {
        self.entries.insert(utxo, output);
    }

    pub fn remove(&mut self, utxo: &UTXO) -> Option<TransactionOutput> {
        self.entries.remove(utxo)
    }

    /// Spend the outputs claimed by `tx` and add the outputs it creates.
    ///
    /// Callers validate first; this never fails.
    pub fn apply(&mut self, tx: &Transaction) {
        for input in &tx.inputs {
            self.entries.remove(&input.utxo());
        }
        for (utxo, output) in tx.output_utxos() {
            self.entries.insert(utxo, output.clone());
        }
    }

    /// Every spendable UTXO currently in the pool
    pub fn all_utxos(&self) -> Vec<UTXO> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UTXO, &TransactionOutput)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of every spendable output
    pub fn total_value(&self) -> TotalAmount {
        self.entries.values().map(|o| TotalAmount::from(o.value)).sum()
    }

    /// Spendable outputs paying `address`
    pub fn utxos_for_address(&self, address: &str) -> Vec<(UTXO, TransactionOutput)> {
        self.entries
            .iter()
            .filter(|(_, output)| output.is_owned_by(address))
            .map(|(utxo, output)| (utxo.clone(), output.clone()))
            .collect()
    }

    pub fn balance(&self, address: &str) -> TotalAmount {
        self.entries
            .values()
            .filter(|output| output.is_owned_by(address))
            .map(|output| TotalAmount::from(output.value))
            .sum()
    }
}
