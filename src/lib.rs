//! cache-size: bounded-cost size estimation for row-backed caches.
//!
//! A cache persisted in a database table needs a cheap answer to "how many
//! bytes do the entries take?" so an eviction controller can decide when to
//! reclaim space. Summing a column over hundreds of millions of rows is not
//! cheap. This crate answers from a fixed number of index reads instead:
//!
//! - **Row store**: the [`RowStore`] trait (count, identifier bounds, forward
//!   lookup). [`MemoryRowStore`] is an in-memory implementation.
//! - **Sampler**: spreads lookups evenly over the identifier range, merging
//!   lookups that land on the same row after deletions left gaps.
//! - **Estimator**: scales the weighted mean row size by the row count,
//!   biased upward so growth is never under-reported.
//!
//! # Architecture
//!
//! ```text
//!   eviction controller
//!          |
//!          v
//!   +---------------+   count    +-----------+
//!   | SizeEstimator |----------->|           |
//!   +---------------+            |           |
//!          |                     | RowStore  |
//!          v                     |           |
//!   +---------------+   bounds,  |           |
//!   |    Sampler    |----------->|           |
//!   +---------------+   lookups  +-----------+
//! ```
//!
//! # Example
//!
//! ```
//! use cache_size::{EstimatorConfig, MemoryRowStore, SizeEstimator};
//!
//! let store = MemoryRowStore::new();
//! store
//!     .write_multi((0..1000).map(|i| (format!("key{i:05}"), vec![b'a'; i % 100])))
//!     .unwrap();
//!
//! let estimator = SizeEstimator::with_config(&store, EstimatorConfig::new().with_seed(1)).unwrap();
//!
//! // every row read: exact
//! assert_eq!(estimator.estimated_size(1000).unwrap(), store.total_byte_size());
//!
//! // sampled: an upper-biased estimate
//! let estimate = estimator.estimated_size(100).unwrap();
//! assert!(estimate > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod entry;
mod error;
mod estimate;
pub mod logging;
mod memory;
mod sampler;
mod store;

pub use config::{Config, EstimatorConfig, LogFormat, LoggingConfig};
pub use entry::{CacheEntry, ENTRY_OVERHEAD, Row};
pub use error::{ConfigError, EstimateError};
pub use estimate::{SizeEstimator, SizeReport};
pub use memory::{MemoryRowStore, StoreError};
pub use sampler::{SampleRecord, SampleSet, Sampler};
pub use store::RowStore;
