//! Tunables for model construction and address synthesis.
//!
//! A [`Config`] is passed explicitly into [`ModelBuilder`](crate::model::ModelBuilder)
//! and [`ClusterModel`](crate::model::ClusterModel); nothing is read from
//! process-wide state.
//!
//! ```rust
//! use addrgen::Config;
//!
//! let config = Config::from_json_str(r#"{"check_count": 16}"#).unwrap();
//! assert_eq!(config.check_count, 16);
//! assert_eq!(config.distribution_size, 200);
//! ```

use crate::error::{GenError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Greedy-loop iterations between checkpoints.
    pub check_count: usize,
    /// Floor probability assigned to every symbol of an empirical distribution.
    pub min_nybble_percent: f64,
    /// Size of the weighted pool materialized per position.
    pub distribution_size: usize,
    /// Emit a progress line every this many loop iterations.
    pub log_loop_emit_freq: usize,
    /// Default jitter used by the high-level client.
    ///
    /// A fixed symbol is replaced when `draw(0..10000) / 100 < jitter * 100`.
    /// The comparison is strict, not `<=`, so `0.0` never alters a fixed
    /// symbol and `1.0` always does.
    pub generation_jitter: f64,
    /// Unique generation gives up after `count * max_attempts_per_address` draws.
    pub max_attempts_per_address: usize,
    /// Callback-filtered generation gives up after
    /// `count * max_filtered_attempts_per_address` draws. Kept separate
    /// because a live filter may reject nearly every draw.
    pub max_filtered_attempts_per_address: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            check_count: 64,
            min_nybble_percent: 0.01,
            distribution_size: 200,
            log_loop_emit_freq: 10_000,
            generation_jitter: 0.0,
            max_attempts_per_address: 1_000,
            max_filtered_attempts_per_address: 1_000_000,
        }
    }
}

impl Config {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check that every value is usable.
    ///
    /// `min_nybble_percent` must stay below 1/16, otherwise the floor alone
    /// would claim all probability mass.
    pub fn validate(&self) -> Result<()> {
        if self.check_count == 0 {
            return Err(GenError::InvalidConfig("check_count must be > 0".into()));
        }
        if self.distribution_size == 0 {
            return Err(GenError::InvalidConfig("distribution_size must be > 0".into()));
        }
        if self.log_loop_emit_freq == 0 {
            return Err(GenError::InvalidConfig("log_loop_emit_freq must be > 0".into()));
        }
        if self.max_attempts_per_address == 0 {
            return Err(GenError::InvalidConfig(
                "max_attempts_per_address must be > 0".into(),
            ));
        }
        if self.max_filtered_attempts_per_address == 0 {
            return Err(GenError::InvalidConfig(
                "max_filtered_attempts_per_address must be > 0".into(),
            ));
        }
        if !(0.0..1.0 / 16.0).contains(&self.min_nybble_percent) {
            return Err(GenError::InvalidConfig(format!(
                "min_nybble_percent must be in [0, 0.0625), got {}",
                self.min_nybble_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.generation_jitter) {
            return Err(GenError::InvalidConfig(format!(
                "generation_jitter must be in [0, 1], got {}",
                self.generation_jitter
            )));
        }
        Ok(())
    }
}
