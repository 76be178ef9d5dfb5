//! Pending transactions offered for the next block

use crate::core::transaction::Transaction;
use std::collections::HashMap;

/// Pending transactions keyed by hash, remembered in arrival order
#[derive(Debug, Clone, Default)]
pub struct TransactionPool {
    entries: HashMap<String, (u64, Transaction)>,
    next_seq: u64,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transaction; re-adding the same hash replaces it in place
    pub fn add(&mut self, tx: Transaction) {
        match self.entries.get_mut(&tx.hash) {
            Some(entry) => entry.1 = tx,
            None => {
                self.entries.insert(tx.hash.clone(), (self.next_seq, tx));
                self.next_seq += 1;
            }
        }
    }

    pub fn remove(&mut self, hash: &str) -> Option<Transaction> {
        self.entries.remove(hash).map(|(_, tx)| tx)
    }

    pub fn get(&self, hash: &str) -> Option<&Transaction> {
        self.entries.get(hash).map(|(_, tx)| tx)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.entries.contains_key(hash)
    }

    /// All pending transactions, oldest first
    pub fn transactions(&self) -> Vec<Transaction> {
        let mut entries: Vec<&(u64, Transaction)> = self.entries.values().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, tx)| tx.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
