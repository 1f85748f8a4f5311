//! Cache entries and their stored byte size.

use bytes::Bytes;

/// Fixed per-row storage overhead in bytes.
///
/// Covers the identifier (8), creation timestamp (8), key hash (8) and the
/// byte-size column (4) that every row carries in addition to its key and
/// value.
pub const ENTRY_OVERHEAD: u64 = 28;

/// A cache entry as held by a row store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    id: u64,
    key: Bytes,
    value: Bytes,
}

impl CacheEntry {
    /// Create an entry with an already-assigned identifier.
    pub fn new(id: u64, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            id,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Row identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Entry key.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Entry value.
    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Stored size of this entry, including the fixed row overhead.
    #[inline]
    pub fn byte_size(&self) -> u64 {
        self.row().byte_size()
    }

    /// Project this entry down to the columns the estimator reads.
    #[inline]
    pub fn row(&self) -> Row {
        Row::new(self.id, self.key.len() as u64, self.value.len() as u64)
    }
}

/// The view of a stored row returned by point lookups.
///
/// Carries only lengths, so a database-backed store can answer a lookup
/// without transferring the value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Row {
    id: u64,
    key_len: u64,
    value_len: u64,
}

impl Row {
    /// Create a row view from an identifier and the key and value lengths.
    pub fn new(id: u64, key_len: u64, value_len: u64) -> Self {
        Self {
            id,
            key_len,
            value_len,
        }
    }

    /// Row identifier.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stored size: fixed overhead plus key and value lengths.
    #[inline]
    pub fn byte_size(&self) -> u64 {
        ENTRY_OVERHEAD
            .saturating_add(self.key_len)
            .saturating_add(self.value_len)
    }
}
