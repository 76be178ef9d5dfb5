//! Transaction handling for the ledger
//!
//! Implements the UTXO transaction model:
//! - Inputs reference a previously created output and carry a signature
//!   over a canonical per-input message
//! - Outputs pay a value to an address
//! - The transaction hash is derived from its raw content, so two
//!   transactions with identical content are the same transaction

use crate::core::utxo::UTXO;
use crate::crypto::{sha256_hex, KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coin amounts. Signed so that a negative output is representable and
/// can be rejected by validation.
pub type Amount = i64;

/// Sums over many amounts (pool totals, fees of a whole epoch). Wide enough
/// that adding any number of `Amount`s a pool can hold cannot overflow.
pub type TotalAmount = i128;

// =============================================================================
// Error Types
// =============================================================================

/// Reasons a transaction is not accepted against a pool
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Input {index} spends unknown or already spent output {utxo}")]
    MissingInput { index: usize, utxo: UTXO },
    #[error("Invalid signature on input {0}")]
    InvalidSignature(usize),
    #[error("Output {0} claimed more than once")]
    DoubleSpend(UTXO),
    #[error("Output {index} has negative value {value}")]
    NegativeOutput { index: usize, value: Amount },
    #[error("Insufficient inputs: inputs {inputs} < outputs {outputs}")]
    InsufficientInputs { inputs: Amount, outputs: Amount },
    #[error("Amounts overflow while summing {0}")]
    ValueOverflow(&'static str),
    #[error("Transaction hash {0} does not match its content")]
    HashMismatch(String),
    #[error("Coinbase transactions cannot be spent as regular transactions")]
    Coinbase,
    #[error("Input index {0} out of range")]
    InputOutOfRange(usize),
    #[error("Signing failed: {0}")]
    Signing(String),
}

impl From<KeyError> for TransactionError {
    fn from(err: KeyError) -> Self {
        TransactionError::Signing(err.to_string())
    }
}

// =============================================================================
// Transaction Input
// =============================================================================

/// Transaction input (reference to previous output)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionInput {
    /// Hash of the transaction that created the spent output
    pub prev_tx_hash: String,
    /// Index of the output in the previous transaction
    pub output_index: u32,
    /// Signature of the output's owner over the canonical input message
    #[serde(default)]
    pub signature: Vec<u8>,
}

impl TransactionInput {
    pub fn new(prev_tx_hash: &str, output_index: u32) -> Self {
        Self {
            prev_tx_hash: prev_tx_hash.to_string(),
            output_index,
            signature: Vec::new(),
        }
    }

    /// The output this input spends
    pub fn utxo(&self) -> UTXO {
        UTXO::new(&self.prev_tx_hash, self.output_index)
    }
}

// =============================================================================
// Transaction Output
// =============================================================================

/// Transaction output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Amount of coins
    pub value: Amount,
    /// Recipient address (hex-encoded public key)
    pub address: String,
}

impl TransactionOutput {
    pub fn new(address: &str, value: Amount) -> Self {
        Self {
            value,
            address: address.to_string(),
        }
    }

    /// Check if this output belongs to the given address
    pub fn is_owned_by(&self, address: &str) -> bool {
        self.address == address
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Content hash of the raw transaction
    pub hash: String,
    /// Transaction inputs
    pub inputs: Vec<TransactionInput>,
    /// Transaction outputs
    pub outputs: Vec<TransactionOutput>,
    /// Block height minted by a coinbase; `None` for regular transactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase_height: Option<u64>,
}

impl Transaction {
    /// Create a new transaction (unsigned)
    pub fn new(inputs: Vec<TransactionInput>, outputs: Vec<TransactionOutput>) -> Self {
        let mut tx = Self {
            hash: String::new(),
            inputs,
            outputs,
            coinbase_height: None,
        };
        tx.finalize();
        tx
    }

    /// Create a coinbase transaction minting `value` to `address`.
    ///
    /// The height is part of the hashed content so every block's coinbase
    /// creates a distinct output even when paying the same address.
    pub fn coinbase(address: &str, value: Amount, height: u64) -> Self {
        let mut tx = Self {
            hash: String::new(),
            inputs: Vec::new(),
            outputs: vec![TransactionOutput::new(address, value)],
            coinbase_height: Some(height),
        };
        tx.finalize();
        tx
    }

    pub fn is_coinbase(&self) -> bool {
        self.coinbase_height.is_some()
    }

    /// Recompute the content hash; call after changing inputs or outputs
    pub fn finalize(&mut self) {
        self.hash = self.calculate_hash();
    }

    pub fn calculate_hash(&self) -> String {
        sha256_hex(&self.raw_tx())
    }

    /// Canonical message signed by the owner of the output spent by input `index`:
    /// the spent output reference followed by every output of this transaction.
    pub fn raw_data_to_sign(&self, index: usize) -> Option<Vec<u8>> {
        let input = self.inputs.get(index)?;
        let mut data = Vec::new();
        data.extend_from_slice(input.prev_tx_hash.as_bytes());
        data.extend_from_slice(&input.output_index.to_be_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_be_bytes());
            data.extend_from_slice(output.address.as_bytes());
        }
        Some(data)
    }

    /// Raw bytes the transaction hash is computed from
    pub fn raw_tx(&self) -> Vec<u8> {
        let mut data = Vec::new();
        for input in &self.inputs {
            push_bytes(&mut data, input.prev_tx_hash.as_bytes());
            data.extend_from_slice(&input.output_index.to_be_bytes());
            push_bytes(&mut data, &input.signature);
        }
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_be_bytes());
            push_bytes(&mut data, output.address.as_bytes());
        }
        if let Some(height) = self.coinbase_height {
            data.extend_from_slice(b"coinbase");
            data.extend_from_slice(&height.to_be_bytes());
        }
        data
    }

    /// Sign input `index` with the owner's key pair and refresh the hash
    pub fn sign_input(&mut self, index: usize, key_pair: &KeyPair) -> Result<(), TransactionError> {
        let message = self
            .raw_data_to_sign(index)
            .ok_or(TransactionError::InputOutOfRange(index))?;
        self.inputs[index].signature = key_pair.sign(&message)?;
        self.finalize();
        Ok(())
    }

    /// Sign all inputs with the provided key pair
    pub fn sign(&mut self, key_pair: &KeyPair) -> Result<(), TransactionError> {
        for index in 0..self.inputs.len() {
            self.sign_input(index, key_pair)?;
        }
        Ok(())
    }

    /// Get total output amount
    pub fn total_output(&self) -> TotalAmount {
        self.outputs.iter().map(|o| TotalAmount::from(o.value)).sum()
    }

    /// Outputs this transaction creates, keyed by their future identity
    pub fn output_utxos(&self) -> impl Iterator<Item = (UTXO, &TransactionOutput)> + '_ {
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, output)| (UTXO::new(&self.hash, index as u32), output))
    }
}

// length-prefixed so adjacent variable-size fields cannot alias
fn push_bytes(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    data.extend_from_slice(bytes);
}

// =============================================================================
// Transaction Builder
// =============================================================================

/// Builder for creating transactions
pub struct TransactionBuilder {
    inputs: Vec<TransactionInput>,
    outputs: Vec<TransactionOutput>,
}

impl TransactionBuilder {
    pub fn new() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Add an input spending the given output
    pub fn add_input(mut self, utxo: &UTXO) -> Self {
        self.inputs
            .push(TransactionInput::new(&utxo.tx_hash, utxo.index));
        self
    }

    /// Add an output
    pub fn add_output(mut self, address: &str, value: Amount) -> Self {
        self.outputs.push(TransactionOutput::new(address, value));
        self
    }

    /// Build and sign every input with a single owner
    pub fn build_and_sign(self, key_pair: &KeyPair) -> Result<Transaction, TransactionError> {
        let mut tx = self.build();
        tx.sign(key_pair)?;
        Ok(tx)
    }

    /// Build without signing
    pub fn build(self) -> Transaction {
        Transaction::new(self.inputs, self.outputs)
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
