//! Structured logging initialization.
//!
//! The RUST_LOG environment variable takes precedence over the configured
//! level.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global tracing subscriber.
///
/// Fails if a global subscriber has already been set.
pub fn init(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => registry.with(fmt::layer()).try_init(),
        (LogFormat::Pretty, false) => registry.with(fmt::layer().without_time()).try_init(),
        (LogFormat::Json, true) => registry.with(fmt::layer().json()).try_init(),
        (LogFormat::Json, false) => registry
            .with(fmt::layer().json().without_time())
            .try_init(),
        (LogFormat::Compact, true) => registry.with(fmt::layer().compact()).try_init(),
        (LogFormat::Compact, false) => registry
            .with(fmt::layer().compact().without_time())
            .try_init(),
    }
}
