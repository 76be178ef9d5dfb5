//! UTXO Ledger: a minimal UTXO-model ledger engine in Rust
//!
//! This crate provides:
//! - UTXO pool and transaction validation (secp256k1 signatures)
//! - Greedy epoch processing of transactions in arrival order
//! - Exact maximum-fee transaction selection with in-epoch dependencies
//! - A block tree with per-branch UTXO snapshots and cut-off age pruning
//! - A block handler assembling blocks from pending transactions
//!
//! # Example
//!
//! ```rust
//! use utxo_ledger::core::{Block, BlockChain};
//! use utxo_ledger::crypto::KeyPair;
//! use utxo_ledger::mining::BlockHandler;
//!
//! let founder = KeyPair::generate();
//! let mut chain = BlockChain::new(Block::genesis(&founder.address(), 25));
//!
//! let handler = BlockHandler::new(&founder.address(), 25);
//! let block = handler.create_block(&mut chain).unwrap();
//!
//! assert_eq!(chain.height(), 2);
//! assert_eq!(chain.max_height_block(), &block);
//! assert_eq!(chain.max_height_utxo_pool().balance(&founder.address()), 50);
//! ```

pub mod config;
pub mod core;
pub mod crypto;
pub mod mining;

// Re-export commonly used types
pub use config::{ConfigError, LedgerConfig};
pub use core::{
    Block, BlockChain, BlockError, MaxFeeSelector, SelectionMode, Selector, Transaction,
    TransactionError, TransactionPool, TransactionValidator, TxHandler, TxSelector, UtxoPool,
    CUT_OFF_AGE, UTXO,
};
pub use crypto::{KeyPair, Secp256k1Verifier, SignatureVerifier};
pub use mining::BlockHandler;
