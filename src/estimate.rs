//! Total byte-size estimation from a bounded sample.
//!
//! One exact count, one bounds query and at most `samples` point lookups per
//! call, whatever the table size. When the sample covers every row the result
//! is the exact sum. Otherwise the weighted mean row size is inflated twice
//! before scaling by the row count:
//!
//! - **tail boost**: the largest rows in the sample (the inverse of outlier
//!   trimming) have their excess over the mean counted again, in proportion
//!   to how much of the table went unread;
//! - **headroom**: the inflated mean is multiplied by
//!   `1 + headroom * sqrt(unsampled / samples)`, the relative standard error
//!   of a sample mean under finite-population correction with the spread
//!   taken as equal to the mean. It does not depend on the observed spread,
//!   so a zero-variance sample still gets a margin.
//!
//! Both terms vanish as the sample approaches the full table.

use crate::config::EstimatorConfig;
use crate::error::{ConfigError, EstimateError};
use crate::sampler::{SampleSet, Sampler};
use crate::store::RowStore;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// Result of one estimation pass with the figures it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeReport {
    /// Estimated total bytes.
    pub bytes: u64,
    /// Exact row count at the start of the pass.
    pub row_count: u64,
    /// Sample count after clamping to the row count.
    pub samples: u64,
    /// Distinct rows read.
    pub rows_read: u64,
    /// True if every row was read and `bytes` is the exact total.
    pub exact: bool,
}

impl SizeReport {
    fn empty(row_count: u64, samples: u64) -> Self {
        Self {
            bytes: 0,
            row_count,
            samples,
            rows_read: 0,
            exact: row_count == 0,
        }
    }
}

/// Estimates the total stored size of a [`RowStore`].
///
/// Holds no state between calls; concurrent calls against the same store are
/// independent.
pub struct SizeEstimator<S> {
    store: S,
    config: EstimatorConfig,
    sampler: Sampler,
}

impl<S: RowStore> SizeEstimator<S> {
    /// Create an estimator with default settings.
    pub fn new(store: S) -> Self {
        let config = EstimatorConfig::default();
        let sampler = Sampler::new(config.lookup_threads);
        Self {
            store,
            config,
            sampler,
        }
    }

    /// Create an estimator with the given settings.
    ///
    /// The settings are validated first; a NaN or negative bias term would
    /// otherwise turn into a zero or an underestimate.
    pub fn with_config(store: S, config: EstimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sampler = Sampler::new(config.lookup_threads);
        Ok(Self {
            store,
            config,
            sampler,
        })
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The active settings.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Estimate using the configured default sample count.
    pub fn estimate(&self) -> Result<u64, EstimateError<S::Error>> {
        // validated configs never exceed i64::MAX
        let samples = i64::try_from(self.config.samples).unwrap_or(i64::MAX);
        self.estimated_size(samples)
    }

    /// Estimate the total byte size from at most `samples` row reads.
    ///
    /// Uses the configured seed if one is set, fresh entropy otherwise.
    pub fn estimated_size(&self, samples: i64) -> Result<u64, EstimateError<S::Error>> {
        let mut rng = match self.config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_rng(&mut rand::rng()),
        };
        self.estimated_size_with(samples, &mut rng)
    }

    /// Estimate the total byte size, drawing the sampling offset from `rng`.
    pub fn estimated_size_with<R>(
        &self,
        samples: i64,
        rng: &mut R,
    ) -> Result<u64, EstimateError<S::Error>>
    where
        R: Rng,
    {
        self.report_with(samples, rng).map(|report| report.bytes)
    }

    /// Run one estimation pass and return the estimate with its inputs.
    pub fn report_with<R>(
        &self,
        samples: i64,
        rng: &mut R,
    ) -> Result<SizeReport, EstimateError<S::Error>>
    where
        R: Rng,
    {
        let samples =
            u64::try_from(samples).map_err(|_| EstimateError::InvalidSampleCount(samples))?;

        let row_count = self
            .store
            .count()
            .map_err(EstimateError::StorageUnavailable)?;

        let effective = samples.min(row_count);
        if effective == 0 {
            debug!(row_count, samples, "nothing to sample");
            return Ok(SizeReport::empty(row_count, effective));
        }

        let set = self
            .sampler
            .sample(&self.store, row_count, effective, rng)
            .map_err(EstimateError::StorageUnavailable)?;

        let report = self.aggregate(&set, row_count, effective);

        debug!(
            row_count,
            samples = effective,
            rows_read = report.rows_read,
            exact = report.exact,
            bytes = report.bytes,
            "estimated cache size"
        );

        Ok(report)
    }

    fn aggregate(&self, set: &SampleSet, row_count: u64, samples: u64) -> SizeReport {
        let rows_read = set.len() as u64;

        if set.is_empty() {
            return SizeReport::empty(row_count, samples);
        }

        if set.is_exhaustive() && rows_read == row_count {
            return SizeReport {
                bytes: u64::try_from(set.weighted_bytes()).unwrap_or(u64::MAX),
                row_count,
                samples,
                rows_read,
                exact: true,
            };
        }

        let mean = weighted_mean(set);

        // An exhaustive pass that disagrees with the count saw concurrent
        // writes; extrapolate without bias.
        let per_row = if set.is_exhaustive() {
            mean
        } else {
            let unsampled = 1.0 - samples as f64 / row_count as f64;
            self.biased_mean(set, mean, samples, unsampled)
        };

        SizeReport {
            bytes: scale(per_row, row_count),
            row_count,
            samples,
            rows_read,
            exact: false,
        }
    }

    /// Per-row average inflated by the tail boost and the headroom factor.
    fn biased_mean(&self, set: &SampleSet, mean: f64, samples: u64, unsampled: f64) -> f64 {
        let total_weight = set.total_weight() as f64;
        let excess = tail_excess(set, mean, self.config.tail_fraction);
        let boosted = mean + self.config.tail_boost * unsampled * excess / total_weight;

        let margin = (unsampled / samples as f64).sqrt();
        boosted * (1.0 + self.config.headroom * margin)
    }
}

/// `Σ(size * weight) / Σ(weight)`, from exact integer sums.
fn weighted_mean(set: &SampleSet) -> f64 {
    set.weighted_bytes() as f64 / set.total_weight() as f64
}

/// Weighted excess over `mean` of the largest rows, covering at least
/// `fraction` of the sample weight and at least one record. Never negative.
fn tail_excess(set: &SampleSet, mean: f64, fraction: f64) -> f64 {
    let mut by_size: Vec<_> = set.records().to_vec();
    by_size.sort_unstable_by(|a, b| b.byte_size.cmp(&a.byte_size).then(a.id.cmp(&b.id)));

    let wanted = (set.total_weight() as f64 * fraction).ceil().max(1.0) as u64;

    let mut weight = 0u64;
    let mut excess = 0.0_f64;
    for record in by_size {
        if weight >= wanted {
            break;
        }
        weight += record.weight;
        excess += record.weight as f64 * (record.byte_size as f64 - mean);
    }

    excess.max(0.0)
}

/// `round(per_row * row_count)`, clamped into `u64`.
fn scale(per_row: f64, row_count: u64) -> u64 {
    let total = (per_row * row_count as f64).round();
    if total.is_nan() || total <= 0.0 {
        0
    } else {
        // saturating float-to-int cast
        total as u64
    }
}
