//! Transaction selection strategies
//!
//! A selector receives the pool of one branch and the candidate
//! transactions of one epoch, applies the transactions it accepts to the
//! pool and returns them in application order. The chain tree only relies
//! on this contract, so the greedy handler and the exact max-fee search are
//! interchangeable.

use crate::core::max_fee::MaxFeeSelector;
use crate::core::transaction::Transaction;
use crate::core::tx_handler::TxHandler;
use crate::core::utxo::UtxoPool;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use serde::{Deserialize, Serialize};

pub trait TxSelector {
    /// Accept a mutually valid subset of `candidates`, applying it to `pool`
    fn select(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction>;
}

/// Which strategy validates block contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Accept candidates in the order given
    #[default]
    Greedy,
    /// Accept the dependency-respecting subset with the highest total fee
    MaxFee,
}

/// Selector chosen at runtime from configuration
#[derive(Debug, Clone)]
pub enum Selector<V = Secp256k1Verifier> {
    Greedy(TxHandler<V>),
    MaxFee(MaxFeeSelector<V>),
}

impl<V: SignatureVerifier> Selector<V> {
    pub fn new(mode: SelectionMode, verifier: V) -> Self {
        match mode {
            SelectionMode::Greedy => Selector::Greedy(TxHandler::new(verifier)),
            SelectionMode::MaxFee => Selector::MaxFee(MaxFeeSelector::new(verifier)),
        }
    }

    pub fn mode(&self) -> SelectionMode {
        match self {
            Selector::Greedy(_) => SelectionMode::Greedy,
            Selector::MaxFee(_) => SelectionMode::MaxFee,
        }
    }
}

impl Selector<Secp256k1Verifier> {
    pub fn from_mode(mode: SelectionMode) -> Self {
        Self::new(mode, Secp256k1Verifier)
    }
}

impl Default for Selector<Secp256k1Verifier> {
    fn default() -> Self {
        Self::from_mode(SelectionMode::default())
    }
}

impl<V: SignatureVerifier> TxSelector for Selector<V> {
    fn select(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction> {
        match self {
            Selector::Greedy(handler) => handler.handle(pool, candidates),
            Selector::MaxFee(selector) => selector.select_max_fee(pool, candidates),
        }
    }
}
