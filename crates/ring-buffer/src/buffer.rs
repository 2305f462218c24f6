//! Ring Buffer Implementation

use serde::ser::{Serialize, Serializer};

use crate::RingBufferError;

/// Default buffer capacity (100 entries, the heart-rate history size)
pub const DEFAULT_CAPACITY: usize = 100;

/// Largest accepted capacity (about 36 minutes of samples at 30 fps)
pub const MAX_CAPACITY: usize = 1 << 16;

/// Fixed-capacity FIFO ring buffer
///
/// Storage is allocated once; when full, each push overwrites the oldest
/// entry in place.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Pre-allocated storage (grows to `capacity`, then wraps)
    storage: Vec<T>,
    /// Capacity of the buffer
    capacity: usize,
    /// Next write position
    head: usize,
    /// Total entries written (for statistics)
    total_written: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer holding `1..=MAX_CAPACITY` entries
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 || capacity > MAX_CAPACITY {
            return Err(RingBufferError::InvalidCapacity {
                capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(Self::allocate(capacity))
    }

    /// Create a buffer with default capacity (100 entries)
    pub fn with_default_capacity() -> Self {
        Self::allocate(DEFAULT_CAPACITY)
    }

    fn allocate(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            total_written: 0,
        }
    }

    /// Push an entry into the buffer (overwrites oldest if full)
    pub fn push(&mut self, item: T) {
        if self.storage.len() < self.capacity {
            self.storage.push(item);
        } else {
            self.storage[self.head] = item;
        }
        self.head = (self.head + 1) % self.capacity;
        self.total_written += 1;
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.storage.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get fill ratio (0.0 to 1.0)
    pub fn fill_ratio(&self) -> f64 {
        self.len() as f64 / self.capacity as f64
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        // Before the first wrap `head == len`, so `older` is empty.
        let (newer, older) = self.storage.split_at(self.head.min(self.storage.len()));
        older.iter().chain(newer.iter())
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&T> {
        self.iter().next_back()
    }

    /// Total entries written since creation (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written
    }

    /// Clear the buffer, keeping the allocation
    pub fn clear(&mut self) {
        self.storage.clear();
        self.head = 0;
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Read the last N entries (most recent first)
    pub fn read_last(&self, count: usize) -> Vec<T> {
        self.iter().rev().take(count).cloned().collect()
    }

    /// Copy out the contents, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl RingBuffer<f64> {
    /// Arithmetic mean of the held values
    pub fn mean(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.iter().sum::<f64>() / self.len() as f64)
    }
}

impl<T: Serialize> Serialize for RingBuffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}
