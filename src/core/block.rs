//! Block implementation for the ledger
//!
//! A block names its parent, mints its reward through a coinbase
//! transaction and lists the regular transactions it confirms. Its hash is
//! derived from all of that content.

use crate::core::transaction::{Amount, Transaction};
use crate::crypto::{is_hash_hex, sha256_hex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Height of the genesis block
pub const GENESIS_HEIGHT: u64 = 1;

// =============================================================================
// Block Errors
// =============================================================================

/// Reasons a block is not appended to the chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("Block {0} has no previous block")]
    MissingParent(String),
    #[error("Malformed block identity: {0:?}")]
    MalformedHash(String),
    #[error("Block hash {0} does not match its content")]
    HashMismatch(String),
    #[error("Block {0} has a malformed coinbase")]
    MalformedCoinbase(String),
    #[error("Coinbase mints height {found:?}, expected {expected}")]
    CoinbaseHeight { expected: u64, found: Option<u64> },
    #[error("Block {0} already in the chain")]
    DuplicateBlock(String),
    #[error("Unknown parent block {0}")]
    UnknownParent(String),
    #[error("Parent at height {parent_height} is too far behind head at height {head_height}")]
    ParentTooOld { parent_height: u64, head_height: u64 },
    #[error("Only {accepted} of {listed} transactions are valid")]
    InvalidTransactions { accepted: usize, listed: usize },
}

/// A block in the chain tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    /// Content hash of the block
    pub hash: String,
    /// Hash of the parent block; `None` only for genesis
    pub prev_block_hash: Option<String>,
    /// Reward transaction, applied without validation
    pub coinbase: Transaction,
    /// Regular transactions, all of which must be valid
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a new block on top of `prev_block_hash`
    pub fn new(prev_block_hash: &str, coinbase: Transaction, transactions: Vec<Transaction>) -> Self {
        let mut block = Self {
            hash: String::new(),
            prev_block_hash: Some(prev_block_hash.to_string()),
            coinbase,
            transactions,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Create a genesis block minting `value` to `address`
    pub fn genesis(address: &str, value: Amount) -> Self {
        let mut block = Self {
            hash: String::new(),
            prev_block_hash: None,
            coinbase: Transaction::coinbase(address, value, GENESIS_HEIGHT),
            transactions: Vec::new(),
        };
        block.hash = block.calculate_hash();
        block
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_block_hash.is_none()
    }

    pub fn calculate_hash(&self) -> String {
        sha256_hex(&self.raw_block())
    }

    /// Raw bytes the block hash is computed from
    pub fn raw_block(&self) -> Vec<u8> {
        let mut data = Vec::new();
        if let Some(prev) = &self.prev_block_hash {
            data.extend_from_slice(prev.as_bytes());
        }
        data.extend_from_slice(&self.coinbase.raw_tx());
        for tx in &self.transactions {
            data.extend_from_slice(&tx.raw_tx());
        }
        data
    }

    /// Verify the block hash
    pub fn verify_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    /// Context-free checks: well-formed identities and coinbase
    pub fn validate_structure(&self) -> Result<&str, BlockError> {
        let prev = self
            .prev_block_hash
            .as_deref()
            .ok_or_else(|| BlockError::MissingParent(self.hash.clone()))?;
        if !is_hash_hex(&self.hash) {
            return Err(BlockError::MalformedHash(self.hash.clone()));
        }
        if !is_hash_hex(prev) {
            return Err(BlockError::MalformedHash(prev.to_string()));
        }
        if !self.verify_hash() {
            return Err(BlockError::HashMismatch(self.hash.clone()));
        }
        if !self.coinbase.is_coinbase()
            || !self.coinbase.inputs.is_empty()
            || self.coinbase.outputs.len() != 1
            || self.coinbase.outputs.iter().any(|output| output.value < 0)
            || self.coinbase.hash != self.coinbase.calculate_hash()
        {
            return Err(BlockError::MalformedCoinbase(self.hash.clone()));
        }
        Ok(prev)
    }

    /// Get number of regular transactions in this block
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Get the mining reward from this block
    pub fn reward(&self) -> Amount {
        self.coinbase.outputs.first().map_or(0, |output| output.value)
    }
}
