//! Benchmarks for size estimation.
//!
//! Estimation cost should track the sample count, not the table size.
//!
//! Run with: cargo bench --bench estimate

use cache_size::{EstimatorConfig, MemoryRowStore, SizeEstimator};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

const TABLE_SIZES: &[usize] = &[10_000, 100_000, 1_000_000];
const SAMPLE_COUNTS: &[i64] = &[10, 100, 1_000, 10_000];

fn create_store(rows: usize) -> MemoryRowStore {
    let store = MemoryRowStore::new();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
    store
        .write_multi((0..rows).map(|i| {
            let r: f64 = rng.random();
            (format!("key{i:07}"), vec![b'a'; (r * r * 1000.0) as usize])
        }))
        .expect("populate failed");
    // leave gaps: every third row gone
    store
        .delete_where(|e| e.id() % 3 == 0)
        .expect("delete failed");
    store
}

fn bench_samples(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate/samples");
    let store = create_store(1_000_000);
    let estimator = SizeEstimator::with_config(&store, EstimatorConfig::new().with_seed(1))
        .expect("valid config");

    for &samples in SAMPLE_COUNTS {
        group.throughput(Throughput::Elements(samples as u64));
        group.bench_with_input(BenchmarkId::from_parameter(samples), &samples, |b, &samples| {
            b.iter(|| black_box(estimator.estimated_size(black_box(samples)).unwrap()))
        });
    }

    group.finish();
}

fn bench_table_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate/table_size");

    for &rows in TABLE_SIZES {
        let store = create_store(rows);
        let estimator = SizeEstimator::with_config(&store, EstimatorConfig::new().with_seed(1))
            .expect("valid config");

        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            b.iter(|| black_box(estimator.estimated_size(1_000).unwrap()))
        });
    }

    group.finish();
}

fn bench_lookup_threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("estimate/lookup_threads");
    let store = create_store(1_000_000);

    for threads in [1, 2, 4, 8] {
        let estimator = SizeEstimator::with_config(
            &store,
            EstimatorConfig::new().with_seed(1).with_lookup_threads(threads),
        )
        .expect("valid config");

        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, _| {
            b.iter(|| black_box(estimator.estimated_size(10_000).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_samples,
    bench_table_size,
    bench_lookup_threads
);
criterion_main!(benches);
