//! In-memory row store.
//!
//! A `BTreeMap` keyed by identifier stands in for an indexed table: counts are
//! O(1), bounds come from the first and last keys, and forward lookups are a
//! single range seek. Used by the test suite, the benchmarks and `size-bench`.

use crate::entry::{CacheEntry, Row};
use crate::store::RowStore;

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Failure raised by [`MemoryRowStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store has been switched offline with [`MemoryRowStore::set_available`].
    #[error("row store unavailable")]
    Unavailable,
}

struct Table {
    rows: BTreeMap<u64, CacheEntry>,
    next_id: u64,
}

/// Thread-safe in-memory table of cache entries.
pub struct MemoryRowStore {
    table: RwLock<Table>,
    available: AtomicBool,
}

impl Default for MemoryRowStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRowStore {
    /// Create an empty store. The first inserted row gets identifier 1.
    pub fn new() -> Self {
        Self::with_first_id(1)
    }

    /// Create an empty store whose first inserted row gets `first_id`.
    pub fn with_first_id(first_id: u64) -> Self {
        Self {
            table: RwLock::new(Table {
                rows: BTreeMap::new(),
                next_id: first_id,
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Insert a batch of `(key, value)` pairs, assigning consecutive
    /// identifiers. Returns the identifiers in insertion order.
    pub fn write_multi<I, K, V>(&self, entries: I) -> Result<Vec<u64>, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Bytes>,
        V: Into<Bytes>,
    {
        self.check()?;
        let mut table = self.table.write();
        let mut ids = Vec::new();
        for (key, value) in entries {
            let id = table.next_id;
            table.next_id += 1;
            table.rows.insert(id, CacheEntry::new(id, key, value));
            ids.push(id);
        }
        Ok(ids)
    }

    /// Insert a single entry. Returns its identifier.
    pub fn write(&self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Result<u64, StoreError> {
        let ids = self.write_multi(std::iter::once((key, value)))?;
        Ok(ids[0])
    }

    /// Remove one row. Returns whether it existed.
    pub fn delete(&self, id: u64) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.table.write().rows.remove(&id).is_some())
    }

    /// Remove every row matching `predicate`. Returns the number removed.
    pub fn delete_where<F>(&self, mut predicate: F) -> Result<usize, StoreError>
    where
        F: FnMut(&CacheEntry) -> bool,
    {
        self.check()?;
        let mut table = self.table.write();
        let before = table.rows.len();
        table.rows.retain(|_, entry| !predicate(entry));
        Ok(before - table.rows.len())
    }

    /// Remove all rows. Identifier assignment continues where it left off.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.check()?;
        self.table.write().rows.clear();
        Ok(())
    }

    /// Look up an entry by identifier.
    pub fn get(&self, id: u64) -> Result<Option<CacheEntry>, StoreError> {
        self.check()?;
        Ok(self.table.read().rows.get(&id).cloned())
    }

    /// The entry with the smallest identifier. Ignores the fault switch.
    pub fn first(&self) -> Option<CacheEntry> {
        self.table.read().rows.values().next().cloned()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.table.read().rows.len()
    }

    /// Returns true if the store holds no rows.
    pub fn is_empty(&self) -> bool {
        self.table.read().rows.is_empty()
    }

    /// Exact total byte size of all rows. Scans the whole table and ignores
    /// the fault switch.
    pub fn total_byte_size(&self) -> u64 {
        self.table
            .read()
            .rows
            .values()
            .map(CacheEntry::byte_size)
            .sum()
    }

    /// Toggle fault injection. While unavailable every [`RowStore`] call and
    /// every read or write above returns [`StoreError::Unavailable`].
    ///
    /// `first`, `len`, `is_empty` and `total_byte_size` bypass the switch so
    /// tests can still inspect the table while it is offline.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl RowStore for MemoryRowStore {
    type Error = StoreError;

    fn count(&self) -> Result<u64, StoreError> {
        self.check()?;
        Ok(self.table.read().rows.len() as u64)
    }

    fn identifier_bounds(&self) -> Result<Option<(u64, u64)>, StoreError> {
        self.check()?;
        let table = self.table.read();
        let min = table.rows.keys().next().copied();
        let max = table.rows.keys().next_back().copied();
        Ok(min.zip(max))
    }

    fn next_row_at_or_after(&self, id: u64) -> Result<Option<Row>, StoreError> {
        self.check()?;
        Ok(self
            .table
            .read()
            .rows
            .range(id..)
            .next()
            .map(|(_, entry)| entry.row()))
    }
}
