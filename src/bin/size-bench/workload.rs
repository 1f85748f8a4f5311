//! Workload configuration and table population for size-bench.

use cache_size::{Config, ConfigError, EstimatorConfig, LoggingConfig, MemoryRowStore, StoreError};

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Deserialize;
use std::path::Path;

/// size-bench configuration: the library sections plus a workload.
#[derive(Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub workload: WorkloadConfig,
}

impl BenchConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: BenchConfig = toml::from_str(&contents)?;

        // reuse the library's validation for the shared sections
        Config {
            estimator: config.estimator.clone(),
            logging: config.logging.clone(),
        }
        .validate()?;
        config.workload.validate()?;

        Ok(config)
    }
}

/// Shape of the generated table.
#[derive(Deserialize)]
pub struct WorkloadConfig {
    /// Rows to insert.
    pub rows: usize,
    /// Value length distribution.
    #[serde(default)]
    pub distribution: Distribution,
    /// Largest value length (or the fixed length).
    pub max_value_len: usize,
    /// Seed for value lengths.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Delete rows by `id % delete_modulus`. Zero disables deletion.
    #[serde(default)]
    pub delete_modulus: u64,
    /// With deletion enabled: keep only rows matching the first row's
    /// residue (`true`), or delete exactly those rows (`false`).
    #[serde(default)]
    pub keep_matching: bool,
    /// Sample counts to estimate with.
    pub sample_counts: Vec<i64>,
}

/// Value length distribution.
#[derive(Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Every value is `max_value_len` bytes.
    Fixed,
    /// Uniform in `0..=max_value_len`.
    Uniform,
    /// `floor(r^2 * max_value_len)` for uniform `r`: many small values, a
    /// long tail of large ones.
    #[default]
    Squared,
}

impl std::fmt::Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Fixed => write!(f, "fixed"),
            Distribution::Uniform => write!(f, "uniform"),
            Distribution::Squared => write!(f, "squared"),
        }
    }
}

fn default_seed() -> u64 {
    1
}

impl WorkloadConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.rows == 0 {
            return Err(ConfigError::Invalid("workload.rows must be positive".into()));
        }
        if self.sample_counts.is_empty() {
            return Err(ConfigError::Invalid(
                "workload.sample_counts must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Generate value lengths for every row.
    pub fn value_lengths(&self) -> Vec<usize> {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        (0..self.rows)
            .map(|_| match self.distribution {
                Distribution::Fixed => self.max_value_len,
                Distribution::Uniform => rng.random_range(0..=self.max_value_len),
                Distribution::Squared => {
                    let r: f64 = rng.random();
                    (r * r * self.max_value_len as f64) as usize
                }
            })
            .collect()
    }
}

/// Build the table described by `workload`. Returns the store and the number
/// of rows deleted.
pub fn populate(workload: &WorkloadConfig) -> Result<(MemoryRowStore, usize), StoreError> {
    let store = MemoryRowStore::new();
    store.write_multi(
        workload
            .value_lengths()
            .into_iter()
            .enumerate()
            .map(|(i, len)| (format!("key{i:05}"), vec![b'a'; len])),
    )?;

    let deleted = match (workload.delete_modulus, store.first()) {
        (0, _) | (_, None) => 0,
        (modulus, Some(first)) => {
            let residue = first.id() % modulus;
            let keep = workload.keep_matching;
            store.delete_where(|entry| (entry.id() % modulus == residue) != keep)?
        }
    };

    Ok((store, deleted))
}
