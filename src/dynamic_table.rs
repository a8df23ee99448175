//! HPACK dynamic table (RFC 7541 Section 2.3.2).
//!
//! The dynamic table is a FIFO buffer that stores recently used header fields
//! to improve compression efficiency. Encoder and decoder each own one and
//! keep them identical purely through the representations on the wire.

use std::collections::VecDeque;

use crate::error::HpackError;
use crate::header::HeaderField;

/// Largest table size a peer may announce (SETTINGS values are 32-bit).
pub const MAX_HEADER_TABLE_SIZE: u64 = 0xFFFF_FFFF;

/// SETTINGS_HEADER_TABLE_SIZE before any SETTINGS exchange.
pub const DEFAULT_HEADER_TABLE_SIZE: u64 = 4096;

/// Dynamic table with FIFO eviction.
///
/// Invariants after every mutation: `size <= capacity`, and `size` is the sum
/// of [`HeaderField::size`] over the stored entries.
#[derive(Debug)]
pub struct DynamicTable {
    /// Newest entry at the front.
    entries: VecDeque<HeaderField>,
    size: u64,
    capacity: u64,
}

impl DynamicTable {
    /// Create an empty table. `capacity` is clamped to [`MAX_HEADER_TABLE_SIZE`].
    pub fn new(capacity: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            size: 0,
            capacity: capacity.min(MAX_HEADER_TABLE_SIZE),
        }
    }

    /// Set the maximum table size, evicting entries to fit.
    pub fn set_capacity(&mut self, capacity: u64) -> Result<(), HpackError> {
        if capacity > MAX_HEADER_TABLE_SIZE {
            return Err(HpackError::InvalidTableSize(capacity));
        }
        self.resize(capacity);
        Ok(())
    }

    /// Like [`DynamicTable::set_capacity`] for a capacity already known to be
    /// within [`MAX_HEADER_TABLE_SIZE`].
    pub(crate) fn resize(&mut self, capacity: u64) {
        debug_assert!(capacity <= MAX_HEADER_TABLE_SIZE);
        self.capacity = capacity;
        self.evict_to(capacity);
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Current table size in bytes (entry sizes, not heap usage).
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by dynamic index, 1 being the newest.
    ///
    /// This expects the index relative to the dynamic table, not the
    /// combined index space.
    pub fn get(&self, index: usize) -> Option<&HeaderField> {
        index.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Entries from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.entries.iter()
    }

    /// Find an entry by name and value, returning its dynamic index.
    pub fn find(&self, name: &[u8], value: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name() == name && e.value() == value)
            .map(|idx| idx + 1)
    }

    /// Find the newest entry with this name, returning its dynamic index.
    pub fn find_by_name(&self, name: &[u8]) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name() == name)
            .map(|idx| idx + 1)
    }

    /// Add a new entry at dynamic index 1, evicting the oldest entries to
    /// make room.
    ///
    /// An entry larger than the capacity empties the table and is not stored
    /// (RFC 7541 Section 4.4).
    pub fn add(&mut self, field: HeaderField) {
        let entry_size = field.size() as u64;

        if entry_size > self.capacity {
            self.clear();
            return;
        }

        self.evict_to(self.capacity - entry_size);
        self.size += entry_size;
        self.entries.push_front(field);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.size = 0;
    }

    /// Evict oldest entries until `size <= target`.
    fn evict_to(&mut self, target: u64) {
        while self.size > target {
            match self.entries.pop_back() {
                Some(entry) => self.size -= entry.size() as u64,
                None => break,
            }
        }
    }
}
