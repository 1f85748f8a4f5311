//! Error types for estimation and configuration.

/// Errors returned by [`SizeEstimator`](crate::SizeEstimator).
///
/// `E` is the row store's own error type, carried through untouched.
#[derive(Debug, thiserror::Error)]
pub enum EstimateError<E> {
    /// A negative sample count was requested. Raised before the store is
    /// touched.
    #[error("invalid sample count {0}: must be zero or greater")]
    InvalidSampleCount(i64),

    /// The row store failed.
    #[error("storage unavailable")]
    StorageUnavailable(#[source] E),
}

impl<E> EstimateError<E> {
    /// Returns the underlying store error, if this is a storage failure.
    pub fn storage_error(&self) -> Option<&E> {
        match self {
            Self::StorageUnavailable(e) => Some(e),
            Self::InvalidSampleCount(_) => None,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
