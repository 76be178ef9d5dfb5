//! Greedy epoch processing
//!
//! Candidates are taken in the order given: each one valid against the
//! pool as it stands after the previous acceptances is applied
//! immediately. A transaction spending an output created in the same epoch
//! is therefore accepted only if it comes after its producer.

use crate::core::selector::TxSelector;
use crate::core::transaction::Transaction;
use crate::core::utxo::UtxoPool;
use crate::core::validator::TransactionValidator;
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use log::debug;

#[derive(Debug, Clone, Default)]
pub struct TxHandler<V = Secp256k1Verifier> {
    validator: TransactionValidator<V>,
}

impl<V: SignatureVerifier> TxHandler<V> {
    pub fn new(verifier: V) -> Self {
        Self {
            validator: TransactionValidator::new(verifier),
        }
    }

    pub fn validator(&self) -> &TransactionValidator<V> {
        &self.validator
    }

    /// Accept every candidate valid at its turn, applying it to `pool`
    pub fn handle(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction> {
        let mut accepted = Vec::new();
        for tx in candidates {
            match self.validator.check(tx, pool) {
                Ok(fee) => {
                    pool.apply(tx);
                    debug!("Accepted transaction {} (fee {})", tx.hash, fee);
                    accepted.push(tx.clone());
                }
                Err(e) => debug!("Rejected transaction {}: {}", tx.hash, e),
            }
        }
        accepted
    }
}

impl<V: SignatureVerifier> TxSelector for TxHandler<V> {
    fn select(&self, pool: &mut UtxoPool, candidates: &[Transaction]) -> Vec<Transaction> {
        self.handle(pool, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::TransactionBuilder;
    use crate::core::utxo::UTXO;
    use crate::crypto::KeyPair;

    fn handler() -> TxHandler {
        TxHandler::default()
    }

    fn mint(pool: &mut UtxoPool, owner: &KeyPair, value: i64, height: u64) -> UTXO {
        let coinbase = Transaction::coinbase(&owner.address(), value, height);
        pool.apply(&coinbase);
        UTXO::new(&coinbase.hash, 0)
    }

    #[test]
    fn test_accepts_chain_in_order() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut pool = UtxoPool::new();
        let coin = mint(&mut pool, &alice, 10, 1);

        let tx1 = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&bob.address(), 10)
            .build_and_sign(&alice)
            .unwrap();
        let tx2 = TransactionBuilder::new()
            .add_input(&UTXO::new(&tx1.hash, 0))
            .add_output(&alice.address(), 9)
            .build_and_sign(&bob)
            .unwrap();

        let accepted = handler().handle(&mut pool, &[tx1.clone(), tx2.clone()]);
        assert_eq!(accepted, vec![tx1.clone(), tx2.clone()]);
        assert!(!pool.contains(&coin));
        assert!(!pool.contains(&UTXO::new(&tx1.hash, 0)));
        assert_eq!(pool.balance(&alice.address()), 9);
    }

    #[test]
    fn test_dependent_before_producer_is_rejected() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let mut pool = UtxoPool::new();
        let coin = mint(&mut pool, &alice, 10, 1);

        let tx1 = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&bob.address(), 10)
            .build_and_sign(&alice)
            .unwrap();
        let tx2 = TransactionBuilder::new()
            .add_input(&UTXO::new(&tx1.hash, 0))
            .add_output(&alice.address(), 9)
            .build_and_sign(&bob)
            .unwrap();

        let accepted = handler().handle(&mut pool, &[tx2, tx1.clone()]);
        assert_eq!(accepted, vec![tx1.clone()]);
        assert!(pool.contains(&UTXO::new(&tx1.hash, 0)));
    }

    #[test]
    fn test_double_spend_across_transactions() {
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();
        let carol = KeyPair::generate();
        let mut pool = UtxoPool::new();
        let coin = mint(&mut pool, &alice, 10, 1);

        let to_bob = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&bob.address(), 10)
            .build_and_sign(&alice)
            .unwrap();
        let to_carol = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&carol.address(), 10)
            .build_and_sign(&alice)
            .unwrap();

        let accepted = handler().handle(&mut pool, &[to_bob.clone(), to_carol]);
        assert_eq!(accepted, vec![to_bob]);
        assert_eq!(pool.balance(&carol.address()), 0);
        assert_eq!(pool.balance(&bob.address()), 10);
    }

    #[test]
    fn test_invalid_transaction_leaves_pool_unchanged() {
        let alice = KeyPair::generate();
        let mut pool = UtxoPool::new();
        let coin = mint(&mut pool, &alice, 10, 1);
        let before = pool.clone();

        let overspend = TransactionBuilder::new()
            .add_input(&coin)
            .add_output(&alice.address(), 11)
            .build_and_sign(&alice)
            .unwrap();

        assert!(handler().handle(&mut pool, &[overspend]).is_empty());
        assert_eq!(pool, before);
    }
}
