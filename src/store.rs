//! The row store capability consumed by the estimator.

use crate::entry::Row;

/// Read access to a table of cache entries keyed by an increasing identifier.
///
/// Identifiers are assigned in insertion order and never reused, but deletions
/// leave gaps, so `max - min + 1` may be far larger than `count()`.
///
/// Implementations must make every method cheap: `count` is expected to be an
/// index-backed exact count and `next_row_at_or_after` a single index seek.
/// Nothing here may scan entry contents.
pub trait RowStore: Sync {
    /// Failure surfaced by the underlying storage. Passed to callers unchanged.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Exact number of rows currently stored.
    fn count(&self) -> Result<u64, Self::Error>;

    /// Smallest and largest identifiers present, or `None` when empty.
    fn identifier_bounds(&self) -> Result<Option<(u64, u64)>, Self::Error>;

    /// The row with the smallest identifier `>= id`, if any.
    fn next_row_at_or_after(&self, id: u64) -> Result<Option<Row>, Self::Error>;
}

impl<T: RowStore + ?Sized> RowStore for &T {
    type Error = T::Error;

    fn count(&self) -> Result<u64, Self::Error> {
        (**self).count()
    }

    fn identifier_bounds(&self) -> Result<Option<(u64, u64)>, Self::Error> {
        (**self).identifier_bounds()
    }

    fn next_row_at_or_after(&self, id: u64) -> Result<Option<Row>, Self::Error> {
        (**self).next_row_at_or_after(id)
    }
}

impl<T: RowStore + Send + ?Sized> RowStore for std::sync::Arc<T> {
    type Error = T::Error;

    fn count(&self) -> Result<u64, Self::Error> {
        (**self).count()
    }

    fn identifier_bounds(&self) -> Result<Option<(u64, u64)>, Self::Error> {
        (**self).identifier_bounds()
    }

    fn next_row_at_or_after(&self, id: u64) -> Result<Option<Row>, Self::Error> {
        (**self).next_row_at_or_after(id)
    }
}
