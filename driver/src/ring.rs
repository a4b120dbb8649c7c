//! Fixed-capacity sample history.

use alloc::vec;
use alloc::vec::Vec;

/// Smallest ring buffer the driver will allocate.
pub const MIN_BUFFER_LEN: usize = 10;

/// Ring buffer of raw samples, overwritten in wraparound order.
///
/// Slots start at zero. Until `capacity` samples have been pushed the
/// unwritten slots still hold zero and are included by [`SampleRing::mean`].
/// [`SampleRing::mean_filled`] only looks at the slots written so far.
#[derive(Debug, Clone)]
pub struct SampleRing {
    values: Vec<i32>,
    index: usize,
    filled: usize,
}

impl SampleRing {
    /// Allocate a ring of `len` slots, raised to [`MIN_BUFFER_LEN`] if smaller.
    pub fn new(len: usize) -> Self {
        let len = len.max(MIN_BUFFER_LEN);
        Self {
            values: vec![0; len],
            index: 0,
            filled: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    /// Slot the next sample will be written to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of slots written at least once.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn is_full(&self) -> bool {
        self.filled == self.values.len()
    }

    pub fn push(&mut self, sample: i32) {
        self.values[self.index] = sample;
        self.index += 1;
        if self.index >= self.values.len() {
            self.index = 0;
        }
        if self.filled < self.values.len() {
            self.filled += 1;
        }
    }

    fn sum(&self) -> i64 {
        self.values.iter().map(|&v| i64::from(v)).sum()
    }

    /// Mean over every slot, truncated toward zero to a whole count.
    pub fn mean(&self) -> i64 {
        self.sum() / self.values.len() as i64
    }

    /// Exact mean over the written slots, `None` while empty.
    pub fn mean_filled(&self) -> Option<f64> {
        if self.filled == 0 {
            return None;
        }
        // Written slots are contiguous from 0 until the first wrap.
        let sum: i64 = if self.is_full() {
            self.sum()
        } else {
            self.values[..self.filled].iter().map(|&v| i64::from(v)).sum()
        };
        Some(sum as f64 / self.filled as f64)
    }

    /// Samples in storage order (not chronological once wrapped).
    pub fn as_slice(&self) -> &[i32] {
        &self.values
    }
}
