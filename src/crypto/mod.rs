//! Cryptographic utilities for the ledger
//!
//! This module provides:
//! - SHA-256 hashing for transaction and block identities
//! - ECDSA key management (secp256k1)
//! - The signature verification predicate the validator is parameterised over

pub mod hash;
pub mod keys;

pub use hash::{is_hash_hex, sha256, sha256_hex, HASH_HEX_LEN};
pub use keys::{
    public_key_from_hex, sign_message, verify_signature, KeyError, KeyPair, Secp256k1Verifier,
    SignatureVerifier,
};
