//! Run fingerprinting — deterministic identification of simulation inputs and outputs.
//!
//! - `ConfigHash`: exact identity of a `SimulationConfig`.
//! - `DatasetHash`: content hash of a candle series.
//! - `ResultHash`: content hash of a `SimulationResult` (idempotence checks).
//! - `RunFingerprint`: all three together, enough to recognise a repeated run.
//!
//! All hashes are BLAKE3 over the canonical serde_json encoding, which is stable
//! because every map in these types is a `BTreeMap` or a fixed struct.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SimulationConfig;
use crate::domain::{Candle, SimulationResult};

macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

hash_newtype!(
    /// Hex BLAKE3 digest of a strategy configuration.
    ConfigHash
);
hash_newtype!(
    /// Hex BLAKE3 digest of a candle series.
    DatasetHash
);
hash_newtype!(
    /// Hex BLAKE3 digest of a simulation result.
    ResultHash
);

fn digest<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, value)?;
    Ok(hasher.finalize().to_hex().to_string())
}

pub fn config_fingerprint(config: &SimulationConfig) -> serde_json::Result<ConfigHash> {
    digest(config).map(ConfigHash)
}

pub fn candles_fingerprint(candles: &[Candle]) -> serde_json::Result<DatasetHash> {
    digest(candles).map(DatasetHash)
}

pub fn result_fingerprint(result: &SimulationResult) -> serde_json::Result<ResultHash> {
    digest(result).map(ResultHash)
}

/// Complete fingerprint of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFingerprint {
    pub config_hash: ConfigHash,
    pub dataset_hash: DatasetHash,
    pub result_hash: ResultHash,
    pub total_candles: usize,
}

impl RunFingerprint {
    pub fn compute(
        config: &SimulationConfig,
        candles: &[Candle],
        result: &SimulationResult,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            config_hash: config_fingerprint(config)?,
            dataset_hash: candles_fingerprint(candles)?,
            result_hash: result_fingerprint(result)?,
            total_candles: candles.len(),
        })
    }

    /// Same config on the same data.
    pub fn same_inputs(&self, other: &Self) -> bool {
        self.config_hash == other.config_hash && self.dataset_hash == other.dataset_hash
    }
}
