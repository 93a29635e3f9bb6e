//! Fixed-capacity sample buffer.
//!
//! This module provides a `SampleBuffer` that stores an ordered sequence of
//! samples up to a capacity fixed at construction.
//!
//! # Invariant
//!
//! `data.len()` (the write cursor) MUST never exceed `capacity`.
//! Writes past capacity fail with [`CsError::BufferFull`] and leave the
//! buffer untouched. The invariant is verified in debug builds via
//! `verify_invariant()`.
//!
//! # Performance
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | `write` | O(1) |
//! | `write_slice` | O(len) |
//! | `read` | O(1) |
//! | `remaining` | O(1) |
//! | `clear` | O(1) |

use serde::{Deserialize, Serialize};

use crate::error::{CsError, Result};

/// An ordered, fixed-capacity sequence of samples with a write cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleBuffer<T> {
    /// Written samples (invariant: len <= capacity)
    data: Vec<T>,
    /// Maximum number of samples
    capacity: usize,
}

impl<T> SampleBuffer<T> {
    /// Create an empty buffer that can hold `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a full buffer from existing samples.
    ///
    /// The capacity equals the number of samples.
    pub fn from_vec(data: Vec<T>) -> Self {
        let capacity = data.len();
        Self { data, capacity }
    }

    /// Append a sample at the next free slot.
    ///
    /// # Returns
    /// Number of free slots remaining after the write
    ///
    /// # Errors
    /// [`CsError::BufferFull`] if no slot is left.
    #[inline]
    pub fn write(&mut self, value: T) -> Result<usize> {
        if self.data.len() >= self.capacity {
            return Err(CsError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.data.push(value);

        #[cfg(debug_assertions)]
        self.verify_invariant();

        Ok(self.remaining())
    }

    /// Maximum number of samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no sample has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Check if the buffer has no remaining capacity.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.data.len() >= self.capacity
    }

    /// Number of free slots.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// Borrow the sample at `idx`, if written.
    #[inline]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.data.get(idx)
    }

    /// All written samples, in write order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Iterate over written samples.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Drop all samples; the full capacity becomes available again.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Verify the capacity invariant (debug builds only).
    #[cfg(debug_assertions)]
    fn verify_invariant(&self) {
        debug_assert!(
            self.data.len() <= self.capacity,
            "SampleBuffer invariant violated: len={} > capacity={}",
            self.data.len(),
            self.capacity
        );
    }
}

impl<T: Copy> SampleBuffer<T> {
    /// Read the sample at `idx`.
    ///
    /// # Errors
    /// [`CsError::IndexOutOfRange`] if `idx >= len()`.
    #[inline]
    pub fn read(&self, idx: usize) -> Result<T> {
        self.data
            .get(idx)
            .copied()
            .ok_or(CsError::IndexOutOfRange {
                index: idx,
                len: self.data.len(),
            })
    }

    /// Append all samples or none.
    ///
    /// # Errors
    /// [`CsError::BufferFull`] if the samples do not fit; nothing is written.
    pub fn write_slice(&mut self, values: &[T]) -> Result<usize> {
        if values.len() > self.remaining() {
            return Err(CsError::BufferFull {
                capacity: self.capacity,
            });
        }
        self.data.extend_from_slice(values);
        Ok(self.remaining())
    }
}

impl<'a, T> IntoIterator for &'a SampleBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}
