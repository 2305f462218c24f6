//! Fixed-Capacity Ring Buffer
//!
//! Bounded FIFO storage for trailing histories (heart rate, stress score,
//! pulse waveform). Capacity is fixed at construction; pushing into a full
//! buffer overwrites the oldest entry.

mod buffer;

pub use buffer::{RingBuffer, DEFAULT_CAPACITY, MAX_CAPACITY};

use thiserror::Error;

/// Ring buffer construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RingBufferError {
    #[error("Ring buffer capacity must be in 1..={max}, got {capacity}")]
    InvalidCapacity { capacity: usize, max: usize },
}
