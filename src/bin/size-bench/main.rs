//! size-bench: populate an in-memory table and compare sampled size
//! estimates against the exact total.

mod workload;

use crate::workload::{BenchConfig, populate};

use cache_size::{SizeEstimator, logging};
use clap::Parser;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::error::Error;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Parser)]
#[command(name = "size-bench")]
#[command(about = "Compare sampled cache size estimates against exact totals")]
struct Args {
    /// Path to configuration file
    config: PathBuf,
}

fn main() {
    let args = Args::parse();

    let config = match BenchConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(config) {
        eprintln!("Error: {e}");
        let mut source = e.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(config: BenchConfig) -> Result<(), Box<dyn Error>> {
    let workload = &config.workload;

    info!(
        rows = workload.rows,
        distribution = %workload.distribution,
        max_value_len = workload.max_value_len,
        delete_modulus = workload.delete_modulus,
        "populating table"
    );

    let start = Instant::now();
    let (store, deleted) = populate(workload)?;
    info!(
        rows = store.len(),
        deleted,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "table ready"
    );

    let exact = store.total_byte_size();
    let estimator = SizeEstimator::with_config(&store, config.estimator.clone())?;

    println!("rows:  {}", store.len());
    println!("exact: {exact} bytes");
    println!();
    println!(
        "{:>10} {:>14} {:>10} {:>10} {:>12}",
        "samples", "estimate", "error %", "rows read", "elapsed us"
    );

    for &samples in &workload.sample_counts {
        let mut rng = match config.estimator.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_rng(&mut rand::rng()),
        };

        let start = Instant::now();
        let report = estimator.report_with(samples, &mut rng)?;
        let elapsed = start.elapsed();

        let error = if exact == 0 {
            0.0
        } else {
            (report.bytes as f64 - exact as f64) / exact as f64 * 100.0
        };

        println!(
            "{:>10} {:>14} {:>+10.2} {:>10} {:>12}",
            samples,
            report.bytes,
            error,
            report.rows_read,
            elapsed.as_micros()
        );
    }

    Ok(())
}
