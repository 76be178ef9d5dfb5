//! Maximum-fee transaction selection
//!
//! Given an unordered set of candidate transactions, finds the subset with
//! the highest total fee such that:
//! - every transaction is valid against the pool extended by the outputs of
//!   the selected transactions it depends on,
//! - every in-epoch producer of a selected transaction's input is selected,
//! - no output is claimed by two selected transactions.
//!
//! The search is exact. It runs in three phases:
//! 1. Closure: candidates are admitted to an ordered "reachable" list once
//!    all their inputs resolve to the pool or to outputs of already
//!    reachable candidates. The resulting order is topological.
//! 2. Backtracking over the reachable list, include before exclude, pruning
//!    on missing dependencies, conflicting claims, and branches whose best
//!    possible total cannot beat the best subset found so far.
//! 3. The winning subset is applied to the pool in reachable order.
//!
//! Worst case is exponential in the number of reachable candidates; callers
//! keep epochs small.

use crate::core::selector::TxSelector;
use crate::core::transaction::{TotalAmount, Transaction};
use crate::core::utxo::{UtxoPool, UTXO};
use crate::core::validator::{claimed_utxos, TransactionValidator};
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use log::debug;
use std::collections::{HashMap, HashSet};

/// A candidate that can become valid given the right companions
#[derive(Debug)]
struct Reachable<'a> {
    tx: &'a Transaction,
    fee: TotalAmount,
    claims: Vec<UTXO>,
    /// Positions in the reachable list of the producers this candidate spends from
    depends_on: Vec<usize>,
}

/// Outcome of the search, before anything is applied
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    pub total_fee: TotalAmount,
    pub transactions: Vec<&'a Transaction>,
}

#[derive(Debug, Clone, Default)]
pub struct MaxFeeSelector<V = Secp256k1Verifier> {
    validator: TransactionValidator<V>,
}

impl<V: SignatureVerifier> MaxFeeSelector<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            validator: TransactionValidator::new(verifier),
        }
    }

    /// Find the maximum-fee subset and apply it to `pool`
    pub fn select_max_fee(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction> {
        let selection = self.plan(pool, candidates);
        let accepted: Vec<Transaction> = selection.transactions.into_iter().cloned().collect();
        for tx in &accepted {
            pool.apply(tx);
        }
        accepted
    }

    /// Find the maximum-fee subset without touching `pool`.
    ///
    /// Transactions are returned in an order in which they can be applied
    /// one after another. Among subsets with equal fee the first one found
    /// wins, which favours including more transactions.
    pub fn plan<'a>(&self, pool: &UtxoPool, candidates: &'a [Transaction]) -> Selection<'a> {
        let reachable = self.reachable(pool, candidates);
        // fees are summed in a wider type so a whole epoch cannot overflow
        let mut suffix_fee: Vec<TotalAmount> = vec![0; reachable.len() + 1];
        for i in (0..reachable.len()).rev() {
            suffix_fee[i] = suffix_fee[i + 1] + reachable[i].fee;
        }

        let mut search = Search {
            included: vec![false; reachable.len()],
            claimed: HashSet::new(),
            current: Vec::new(),
            best: None,
            visited: 0,
        };
        search.explore(&reachable, &suffix_fee, 0, 0);

        let (total_fee, indices) = search.best.unwrap_or_default();
        debug!(
            "Max-fee search: {} candidates, {} reachable, {} nodes visited, best fee {} with {} transactions",
            candidates.len(),
            reachable.len(),
            search.visited,
            total_fee,
            indices.len()
        );

        Selection {
            total_fee,
            transactions: indices.into_iter().map(|i| reachable[i].tx).collect(),
        }
    }

    // Phase 1: fixed-point closure over the candidates
    fn reachable<'a>(&self, pool: &UtxoPool, candidates: &'a [Transaction]) -> Vec<Reachable<'a>> {
        let mut pending = pool.clone();
        let mut created_by: HashMap<UTXO, usize> = HashMap::new();
        let mut reachable: Vec<Reachable<'a>> = Vec::new();

        // identical content is one transaction
        let mut seen = HashSet::new();
        let mut placed: Vec<bool> = candidates
            .iter()
            .map(|tx| !seen.insert(tx.hash.as_str()))
            .collect();

        loop {
            let mut progressed = false;
            for (i, tx) in candidates.iter().enumerate() {
                if placed[i] {
                    continue;
                }
                let Ok(fee) = self.validator.check(tx, &pending) else {
                    continue;
                };

                let claims = claimed_utxos(tx);
                let mut depends_on: Vec<usize> = claims
                    .iter()
                    .filter(|utxo| !pool.contains(utxo))
                    .filter_map(|utxo| created_by.get(utxo).copied())
                    .collect();
                depends_on.sort_unstable();
                depends_on.dedup();

                let position = reachable.len();
                for (utxo, output) in tx.output_utxos() {
                    created_by.insert(utxo.clone(), position);
                    pending.add(utxo, output.clone());
                }
                reachable.push(Reachable {
                    tx,
                    fee: TotalAmount::from(fee),
                    claims,
                    depends_on,
                });
                placed[i] = true;
                progressed = true;
            }
            if !progressed {
                break;
            }
        }
        reachable
    }
}

impl<V: SignatureVerifier> TxSelector for MaxFeeSelector<V> {
    fn select(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction> {
        self.select_max_fee(pool, candidates)
    }
}

// Phase 2 state: the partial solution under construction
struct Search {
    included: Vec<bool>,
    claimed: HashSet<UTXO>,
    current: Vec<usize>,
    best: Option<(TotalAmount, Vec<usize>)>,
    visited: u64,
}

impl Search {
    fn explore(
        &mut self,
        reachable: &[Reachable<'_>],
        suffix_fee: &[TotalAmount],
        i: usize,
        fee: TotalAmount,
    ) {
        self.visited += 1;

        if let Some((best_fee, _)) = &self.best {
            if fee + suffix_fee[i] <= *best_fee {
                return;
            }
        }

        if i == reachable.len() {
            self.best = Some((fee, self.current.clone()));
            return;
        }

        let candidate = &reachable[i];
        let dependencies_met = candidate.depends_on.iter().all(|&j| self.included[j]);
        let conflict_free = candidate.claims.iter().all(|utxo| !self.claimed.contains(utxo));

        if dependencies_met && conflict_free {
            self.claimed.extend(candidate.claims.iter().cloned());
            self.included[i] = true;
            self.current.push(i);

            self.explore(reachable, suffix_fee, i + 1, fee + candidate.fee);

            self.current.pop();
            self.included[i] = false;
            for utxo in &candidate.claims {
                self.claimed.remove(utxo);
            }
        }

        self.explore(reachable, suffix_fee, i + 1, fee);
    }
}
