//! Gap-tolerant systematic sampling over an identifier range.
//!
//! The identifier interval `[min, max]` is cut into `S` equal slots and one
//! target identifier is placed in each, all offset by a single random start.
//! Each target resolves to the first live row at or after it. Deleted regions
//! funnel several targets onto the same surviving row; those are merged into
//! one record whose weight is the number of slots it absorbed.
//!
//! With ids `1..=12`, `S = 4` (stride `11 / 4 = 2.75`) and a start offset of
//! `0.5`:
//!
//! ```text
//!  ids:     1  2  3  4  5  6  7  8  9 10 11 12
//!  live:    *  *  .  .  .  .  .  *  *  *  .  *
//!  targets: ^        ^        ^     ^
//!  rows:    1        8        8     9
//!  merged:  1 (w=1), 8 (w=2), 9 (w=1)
//! ```

use crate::entry::Row;
use crate::store::RowStore;

use rand::Rng;
use std::collections::BTreeMap;
use tracing::trace;

/// One sampled row and the number of target slots it stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRecord {
    /// Identifier of the resolved row.
    pub id: u64,
    /// Stored size of the row.
    pub byte_size: u64,
    /// Coverage weight: target slots that resolved to this row.
    pub weight: u64,
}

/// The result of one sampling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSet {
    records: Vec<SampleRecord>,
    exhaustive: bool,
}

impl SampleSet {
    fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn from_records(records: Vec<SampleRecord>, exhaustive: bool) -> Self {
        Self {
            records,
            exhaustive,
        }
    }

    /// Sampled records, ordered by identifier.
    pub fn records(&self) -> &[SampleRecord] {
        &self.records
    }

    /// True if every row in the identifier range was read.
    pub fn is_exhaustive(&self) -> bool {
        self.exhaustive
    }

    /// Number of distinct rows read.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if no row was resolved.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of coverage weights.
    pub fn total_weight(&self) -> u64 {
        self.records.iter().map(|r| r.weight).sum()
    }

    /// Sum of `byte_size * weight`.
    pub fn weighted_bytes(&self) -> u128 {
        self.records
            .iter()
            .map(|r| r.byte_size as u128 * r.weight as u128)
            .sum()
    }
}

/// Selects a bounded, evenly spread set of rows from a [`RowStore`].
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    lookup_threads: usize,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Sampler {
    /// Create a sampler that spreads point lookups over `lookup_threads`
    /// threads. Values below one are treated as one.
    pub fn new(lookup_threads: usize) -> Self {
        Self {
            lookup_threads: lookup_threads.max(1),
        }
    }

    /// Sample up to `min(samples, row_count)` rows from `store`.
    ///
    /// `row_count` is the caller's exact count; the identifier bounds are read
    /// here. When every row fits in the sample the table is walked directly
    /// and each row gets weight one.
    pub fn sample<S, R>(
        &self,
        store: &S,
        row_count: u64,
        samples: u64,
        rng: &mut R,
    ) -> Result<SampleSet, S::Error>
    where
        S: RowStore + ?Sized,
        R: Rng,
    {
        if row_count == 0 || samples == 0 {
            return Ok(SampleSet::empty());
        }

        let Some((min_id, max_id)) = store.identifier_bounds()? else {
            return Ok(SampleSet::empty());
        };

        let span = max_id - min_id;

        // Stride must cover at least one identifier; a narrower range holds no
        // more rows than we would sample anyway.
        if samples >= row_count || span < samples {
            return self.scan(store, min_id, max_id, samples);
        }

        let targets = targets(min_id, span, samples, rng);
        let rows = self.resolve(store, &targets)?;

        Ok(SampleSet::from_records(merge(rows), false))
    }

    /// Walk every row in `[min_id, max_id]`, reading at most `limit` rows.
    fn scan<S>(&self, store: &S, min_id: u64, max_id: u64, limit: u64) -> Result<SampleSet, S::Error>
    where
        S: RowStore + ?Sized,
    {
        let mut records = Vec::new();
        let mut cursor = min_id;

        while (records.len() as u64) < limit {
            let Some(row) = store.next_row_at_or_after(cursor)? else {
                break;
            };
            if row.id() > max_id {
                break;
            }
            records.push(SampleRecord {
                id: row.id(),
                byte_size: row.byte_size(),
                weight: 1,
            });
            match row.id().checked_add(1) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        Ok(SampleSet::from_records(records, true))
    }

    /// Resolve each target to its row. Lookups are independent, so with more
    /// than one thread the targets are split into contiguous chunks.
    fn resolve<S>(&self, store: &S, targets: &[u64]) -> Result<Vec<Row>, S::Error>
    where
        S: RowStore + ?Sized,
    {
        if self.lookup_threads == 1 || targets.len() < 2 * self.lookup_threads {
            return lookup_all(store, targets);
        }

        let chunk_size = targets.len().div_ceil(self.lookup_threads);

        std::thread::scope(|scope| {
            let handles: Vec<_> = targets
                .chunks(chunk_size)
                .map(|chunk| scope.spawn(move || lookup_all(store, chunk)))
                .collect();

            let mut rows = Vec::with_capacity(targets.len());
            for handle in handles {
                match handle.join() {
                    Ok(result) => rows.extend(result?),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            Ok(rows)
        })
    }
}

/// One target per slot: `min_id + floor(offset + i * stride)`, with a single
/// random `offset` in `[0, stride)`.
fn targets<R: Rng>(min_id: u64, span: u64, samples: u64, rng: &mut R) -> Vec<u64> {
    let stride = span as f64 / samples as f64;
    let offset = rng.random_range(0.0..stride);
    targets_at(min_id, span, samples, offset)
}

/// `min_id + floor(offset + i * stride)` for `i` in `0..samples`.
fn targets_at(min_id: u64, span: u64, samples: u64, offset: f64) -> Vec<u64> {
    let stride = span as f64 / samples as f64;

    (0..samples)
        .map(|i| {
            let step = (offset + i as f64 * stride) as u64;
            min_id + step.min(span)
        })
        .collect()
}

fn lookup_all<S>(store: &S, targets: &[u64]) -> Result<Vec<Row>, S::Error>
where
    S: RowStore + ?Sized,
{
    let mut rows = Vec::with_capacity(targets.len());
    for &target in targets {
        match store.next_row_at_or_after(target)? {
            Some(row) => rows.push(row),
            None => trace!(id = target, "sample target resolved to no row"),
        }
    }
    Ok(rows)
}

/// Collapse repeated resolutions into weighted records. Keyed by identifier,
/// so the outcome does not depend on the order lookups completed in.
fn merge(rows: Vec<Row>) -> Vec<SampleRecord> {
    let mut merged: BTreeMap<u64, SampleRecord> = BTreeMap::new();
    for row in rows {
        merged
            .entry(row.id())
            .and_modify(|record| record.weight += 1)
            .or_insert(SampleRecord {
                id: row.id(),
                byte_size: row.byte_size(),
                weight: 1,
            });
    }
    merged.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryRowStore, StoreError};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(1)
    }

    fn store_with(lengths: impl IntoIterator<Item = usize>) -> MemoryRowStore {
        let store = MemoryRowStore::new();
        store
            .write_multi(
                lengths
                    .into_iter()
                    .enumerate()
                    .map(|(i, len)| (format!("key{i:05}"), vec![b'a'; len])),
            )
            .unwrap();
        store
    }

    fn row_count(store: &MemoryRowStore) -> u64 {
        store.count().unwrap()
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryRowStore::new();
        let set = Sampler::default().sample(&store, 0, 10, &mut rng()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.total_weight(), 0);
    }

    #[test]
    fn test_zero_samples() {
        let store = store_with(1..=10);
        let set = Sampler::default()
            .sample(&store, row_count(&store), 0, &mut rng())
            .unwrap();
        assert!(set.is_empty());
        assert!(!set.is_exhaustive());
    }

    #[test]
    fn test_full_sample_reads_every_row() {
        let store = store_with(1..=10);
        let set = Sampler::default()
            .sample(&store, row_count(&store), 12, &mut rng())
            .unwrap();

        assert!(set.is_exhaustive());
        assert_eq!(set.len(), 10);
        assert!(set.records().iter().all(|r| r.weight == 1));
        assert_eq!(set.weighted_bytes(), 415);
    }

    #[test]
    fn test_full_sample_with_gaps() {
        let store = store_with(1..=30);
        store.delete_where(|e| e.id() % 3 != 0).unwrap();
        let count = row_count(&store);
        assert_eq!(count, 10);

        let set = Sampler::default()
            .sample(&store, count, count, &mut rng())
            .unwrap();
        assert!(set.is_exhaustive());
        assert_eq!(set.len(), 10);
        assert_eq!(set.weighted_bytes() as u64, store.total_byte_size());
    }

    #[test]
    fn test_weights_sum_to_samples() {
        let store = store_with((0..1000).map(|i| i % 97));
        let set = Sampler::default()
            .sample(&store, row_count(&store), 100, &mut rng())
            .unwrap();

        assert!(!set.is_exhaustive());
        assert_eq!(set.total_weight(), 100);
        assert_eq!(set.len(), 100);
    }

    #[test]
    fn test_records_ordered_by_id() {
        let store = store_with((0..500).map(|i| i % 13));
        let set = Sampler::default()
            .sample(&store, row_count(&store), 50, &mut rng())
            .unwrap();
        assert!(set.records().windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_gap_merges_weight() {
        // ids 1..=100, keep 1..=10 and 100 only: the deleted middle funnels
        // into the last row.
        let store = store_with(std::iter::repeat_n(5, 100));
        store
            .delete_where(|e| e.id() > 10 && e.id() < 100)
            .unwrap();
        let count = row_count(&store);
        assert_eq!(count, 11);

        let set = Sampler::default()
            .sample(&store, count, 10, &mut rng())
            .unwrap();

        assert_eq!(set.total_weight(), 10);
        let last = set.records().last().unwrap();
        assert_eq!(last.id, 100);
        assert!(last.weight >= 8, "last row absorbed {} slots", last.weight);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let store = store_with((0..1000).map(|i| (i * 7) % 301));
        store.delete_where(|e| e.id() % 4 == 0).unwrap();
        let count = row_count(&store);

        let a = Sampler::default().sample(&store, count, 37, &mut rng()).unwrap();
        let b = Sampler::default().sample(&store, count, 37, &mut rng()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parallel_lookups_match_sequential() {
        let store = store_with((0..2000).map(|i| (i * 31) % 509));
        store.delete_where(|e| e.id() % 5 == 1).unwrap();
        let count = row_count(&store);

        let sequential = Sampler::new(1).sample(&store, count, 300, &mut rng()).unwrap();
        let parallel = Sampler::new(4).sample(&store, count, 300, &mut rng()).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_narrow_span_falls_back_to_scan() {
        // Stale row count larger than what the live range can hold.
        let store = store_with(1..=5);
        let set = Sampler::default().sample(&store, 50, 10, &mut rng()).unwrap();
        assert!(set.is_exhaustive());
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_single_sample() {
        let store = store_with(std::iter::repeat_n(3, 20));
        let set = Sampler::default()
            .sample(&store, row_count(&store), 1, &mut rng())
            .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.total_weight(), 1);
    }

    #[test]
    fn test_store_error_propagates() {
        let store = store_with(1..=100);
        store.set_available(false);
        let err = Sampler::default()
            .sample(&store, 100, 10, &mut rng())
            .unwrap_err();
        assert_eq!(err, StoreError::Unavailable);
    }

    #[test]
    fn test_targets_within_range() {
        let mut rng = rng();
        for samples in [1, 2, 7, 99, 100] {
            let t = targets(1000, 99, samples, &mut rng);
            assert_eq!(t.len() as u64, samples);
            assert!(t.iter().all(|&id| (1000..=1099).contains(&id)));
            assert!(t.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_targets_funnel_into_surviving_rows() {
        // ids 1..=12 with 3..=7 and 11 deleted
        let store = store_with(std::iter::repeat_n(1, 12));
        store
            .delete_where(|e| (3..=7).contains(&e.id()) || e.id() == 11)
            .unwrap();

        let t = targets_at(1, 11, 4, 0.5);
        assert_eq!(t, vec![1, 4, 7, 9]);

        let merged = merge(lookup_all(&store, &t).unwrap());
        let ids_and_weights: Vec<_> = merged.iter().map(|r| (r.id, r.weight)).collect();
        assert_eq!(ids_and_weights, vec![(1, 1), (8, 2), (9, 1)]);
    }
}
