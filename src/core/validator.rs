//! Transaction validation against a UTXO pool
//!
//! A transaction is valid against a pool when its hash matches its content
//! and:
//! 1. every output claimed by an input is in the pool,
//! 2. every input carries a valid signature from the claimed output's owner,
//! 3. no output is claimed more than once,
//! 4. no output value is negative,
//! 5. the input values cover the output values.
//!
//! Sums that do not fit an `Amount` are rejected rather than clamped.
//!
//! Validation never mutates the pool.

use crate::core::transaction::{Amount, Transaction, TransactionError};
use crate::core::utxo::{UtxoPool, UTXO};
use crate::crypto::{Secp256k1Verifier, SignatureVerifier};
use std::collections::HashSet;

/// Checks transactions using the signature scheme `V`
#[derive(Debug, Clone, Default)]
pub struct TransactionValidator<V = Secp256k1Verifier> {
    verifier: V,
}

impl<V: SignatureVerifier> TransactionValidator<V> {
    pub fn new(verifier: V) -> Self {
        Self { verifier }
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn is_valid(&self, tx: &Transaction, pool: &UtxoPool) -> bool {
        self.check(tx, pool).is_ok()
    }

    /// Run every check and return the fee (inputs minus outputs) on success
    pub fn check(&self, tx: &Transaction, pool: &UtxoPool) -> Result<Amount, TransactionError> {
        if tx.is_coinbase() {
            return Err(TransactionError::Coinbase);
        }
        // outputs are keyed by this hash once applied
        if tx.hash != tx.calculate_hash() {
            return Err(TransactionError::HashMismatch(tx.hash.clone()));
        }

        let mut seen = HashSet::new();
        let mut input_sum: Amount = 0;
        for (index, input) in tx.inputs.iter().enumerate() {
            let utxo = input.utxo();
            let output = pool
                .get(&utxo)
                .ok_or_else(|| TransactionError::MissingInput {
                    index,
                    utxo: utxo.clone(),
                })?;

            // index comes from enumerating the inputs, so this never fails
            let message = tx
                .raw_data_to_sign(index)
                .ok_or(TransactionError::InputOutOfRange(index))?;
            if !self
                .verifier
                .verify(&output.address, &message, &input.signature)
            {
                return Err(TransactionError::InvalidSignature(index));
            }

            if !seen.insert(utxo) {
                return Err(TransactionError::DoubleSpend(input.utxo()));
            }
            input_sum = input_sum
                .checked_add(output.value)
                .ok_or(TransactionError::ValueOverflow("inputs"))?;
        }

        let output_sum = sum_outputs(tx)?;
        if input_sum < output_sum {
            return Err(TransactionError::InsufficientInputs {
                inputs: input_sum,
                outputs: output_sum,
            });
        }
        Ok(input_sum - output_sum)
    }

    /// Fee of `tx` against `pool`, or `None` when it is invalid
    pub fn tx_fee(&self, tx: &Transaction, pool: &UtxoPool) -> Option<Amount> {
        self.check(tx, pool).ok()
    }
}

/// Sum the declared outputs, rejecting any negative value
pub(crate) fn sum_outputs(tx: &Transaction) -> Result<Amount, TransactionError> {
    let mut sum: Amount = 0;
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 {
            return Err(TransactionError::NegativeOutput {
                index,
                value: output.value,
            });
        }
        sum = sum
            .checked_add(output.value)
            .ok_or(TransactionError::ValueOverflow("outputs"))?;
    }
    Ok(sum)
}

/// Outputs claimed by a transaction's inputs
pub(crate) fn claimed_utxos(tx: &Transaction) -> Vec<UTXO> {
    tx.inputs.iter().map(|input| input.utxo()).collect()
}
