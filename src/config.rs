//! Configuration for the estimator and logging.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a working configuration.
//!
//! ```toml
//! [estimator]
//! samples = 10000
//! tail_fraction = 0.05
//! tail_boost = 1.0
//! headroom = 1.0
//! lookup_threads = 1
//! # seed = 1
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```

use crate::error::ConfigError;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "CACHE_SIZE_CONFIG";

/// Configuration file used when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/cache-size.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Estimator settings.
    #[serde(default)]
    pub estimator: EstimatorConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `CACHE_SIZE_CONFIG`, else from
    /// `config/cache-size.toml`. When neither exists the defaults are used.
    ///
    /// A path given explicitly through the environment must exist.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_or_default(explicit.as_deref(), Path::new(DEFAULT_CONFIG_PATH))
    }

    fn load_or_default(explicit: Option<&Path>, fallback: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None if fallback.exists() => Self::load(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.estimator.validate()
    }
}

/// Sampling and bias settings for [`SizeEstimator`](crate::SizeEstimator).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Sample count used when the caller does not pass one.
    pub samples: u64,

    /// Share of the sample, by weight, treated as the upper tail.
    /// Must be in `(0, 1]`.
    pub tail_fraction: f64,

    /// Extra multiples of the tail's excess over the mean to add back.
    /// Scaled by the unsampled share of the table.
    pub tail_boost: f64,

    /// Multiplicative headroom applied to the per-row average, scaled by
    /// `sqrt(unsampled / samples)`.
    pub headroom: f64,

    /// Threads used for point lookups. One means sequential.
    pub lookup_threads: usize,

    /// Fixed seed for the sampling offset. `None` draws fresh entropy on
    /// every call.
    pub seed: Option<u64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            tail_fraction: 0.05,
            tail_boost: 1.0,
            headroom: 1.0,
            lookup_threads: 1,
            seed: None,
        }
    }
}

impl EstimatorConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default sample count.
    pub fn with_samples(mut self, samples: u64) -> Self {
        self.samples = samples;
        self
    }

    /// Set the tail fraction.
    pub fn with_tail_fraction(mut self, fraction: f64) -> Self {
        self.tail_fraction = fraction;
        self
    }

    /// Set the tail boost.
    pub fn with_tail_boost(mut self, boost: f64) -> Self {
        self.tail_boost = boost;
        self
    }

    /// Set the headroom.
    pub fn with_headroom(mut self, headroom: f64) -> Self {
        self.headroom = headroom;
        self
    }

    /// Set the number of lookup threads.
    pub fn with_lookup_threads(mut self, threads: usize) -> Self {
        self.lookup_threads = threads;
        self
    }

    /// Fix the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if i64::try_from(self.samples).is_err() {
            return Err(ConfigError::Invalid(format!(
                "samples ({}) must not exceed {}",
                self.samples,
                i64::MAX
            )));
        }

        if !(self.tail_fraction > 0.0 && self.tail_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "tail_fraction ({}) must be in (0, 1]",
                self.tail_fraction
            )));
        }

        if !self.tail_boost.is_finite() || self.tail_boost < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "tail_boost ({}) must be finite and non-negative",
                self.tail_boost
            )));
        }

        if !self.headroom.is_finite() || self.headroom < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "headroom ({}) must be finite and non-negative",
                self.headroom
            )));
        }

        if self.lookup_threads == 0 {
            return Err(ConfigError::Invalid(
                "lookup_threads must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field output.
    #[default]
    Pretty,
    /// Newline-delimited JSON.
    Json,
    /// Single-line output.
    Compact,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter, e.g. `info` or `cache_size=debug`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include timestamps.
    #[serde(default = "LoggingConfig::default_timestamps")]
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            format: LogFormat::default(),
            timestamps: Self::default_timestamps(),
        }
    }
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }

    fn default_timestamps() -> bool {
        true
    }
}
