//! Ledger configuration
//!
//! Stored as JSON. Every field has a default so partial files are accepted.

use crate::core::selector::SelectionMode;
use crate::core::transaction::Amount;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use thiserror::Error;

/// Default number of blocks a branch may trail the head and still be extended
pub const DEFAULT_CUT_OFF_AGE: u64 = 10;

/// Largest accepted cut-off age. Every node in the window keeps its own
/// pool, so the window bounds memory.
pub const MAX_CUT_OFF_AGE: u64 = 100_000;

/// Default reward minted by each block's coinbase
pub const DEFAULT_COINBASE_VALUE: Amount = 25;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Maximum height lag from the head for a node to remain extendable
    pub cut_off_age: u64,
    /// Reward used by the block handler when assembling blocks
    pub coinbase_value: Amount,
    /// Strategy used to validate block contents
    pub selection: SelectionMode,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            cut_off_age: DEFAULT_CUT_OFF_AGE,
            coinbase_value: DEFAULT_COINBASE_VALUE,
            selection: SelectionMode::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = fs::File::open(path)?;
        let config: LedgerConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cut_off_age > MAX_CUT_OFF_AGE {
            return Err(ConfigError::Invalid(format!(
                "cut_off_age must be at most {}, got {}",
                MAX_CUT_OFF_AGE, self.cut_off_age
            )));
        }
        if self.coinbase_value < 0 {
            return Err(ConfigError::Invalid(format!(
                "coinbase_value must be non-negative, got {}",
                self.coinbase_value
            )));
        }
        Ok(())
    }
}
