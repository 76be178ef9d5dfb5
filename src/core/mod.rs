//! Core ledger components
//!
//! This module contains the ledger engine:
//! - Transactions and the UTXO pool
//! - Transaction validation
//! - Greedy and maximum-fee transaction selection
//! - Blocks and the pruned chain tree

pub mod block;
pub mod blockchain;
pub mod max_fee;
pub mod selector;
pub mod transaction;
pub mod tx_handler;
pub mod tx_pool;
pub mod utxo;
pub mod validator;

pub use block::{Block, BlockError, GENESIS_HEIGHT};
pub use blockchain::{BlockChain, BranchNode, ChainStats, CUT_OFF_AGE};
pub use max_fee::{MaxFeeSelector, Selection};
pub use selector::{SelectionMode, Selector, TxSelector};
pub use transaction::{
    Amount, TotalAmount, Transaction, TransactionBuilder, TransactionError, TransactionInput,
    TransactionOutput,
};
pub use tx_handler::TxHandler;
pub use tx_pool::TransactionPool;
pub use utxo::{UtxoPool, UTXO};
pub use validator::TransactionValidator;
