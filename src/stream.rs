//! Named stream registries for bulk transfer between pipeline stages.
//!
//! A [`DataStream`] groups several [`SampleBuffer`]s under a name, typically
//! one buffer per node for one logical quantity ("measurements",
//! "estimates", ...). A [`DataStreamContainer`] groups several streams.
//!
//! Buffers are owned by the stream. `take` transfers ownership out and
//! shifts the following buffers down; `peek` only lends a view.
//!
//! # Example
//!
//! ```rust
//! use cs_cluster_reconstructor::{DataStream, SampleBuffer};
//!
//! let mut stream = DataStream::new("signals");
//! stream.push(SampleBuffer::from_vec(vec![1.0, 2.0]));
//! stream.push(SampleBuffer::from_vec(vec![3.0, 4.0]));
//!
//! assert_eq!(stream.peek(0).unwrap().as_slice(), &[1.0, 2.0]);
//! let first = stream.take(0).unwrap();
//! assert_eq!(first.as_slice(), &[1.0, 2.0]);
//! assert_eq!(stream.len(), 1);
//! ```

use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;
use crate::error::{CsError, Result};

/// A named, ordered collection of owned sample buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStream<T> {
    name: String,
    buffers: Vec<SampleBuffer<T>>,
}

impl<T> DataStream<T> {
    /// Create an empty stream.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buffers: Vec::new(),
        }
    }

    /// Append a buffer (O(1) amortized).
    pub fn push(&mut self, buffer: SampleBuffer<T>) {
        self.buffers.push(buffer);
    }

    /// Remove the buffer at `idx` and return it.
    ///
    /// Buffers after `idx` shift down by one.
    ///
    /// # Errors
    /// [`CsError::IndexOutOfRange`] if `idx >= len()`.
    pub fn take(&mut self, idx: usize) -> Result<SampleBuffer<T>> {
        self.check_index(idx)?;
        Ok(self.buffers.remove(idx))
    }

    /// Borrow the buffer at `idx` without removing it.
    ///
    /// # Errors
    /// [`CsError::IndexOutOfRange`] if `idx >= len()`.
    pub fn peek(&self, idx: usize) -> Result<&SampleBuffer<T>> {
        self.check_index(idx)?;
        Ok(&self.buffers[idx])
    }

    /// Number of buffers.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Check if the stream holds no buffers.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Name of this stream.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iterate over buffers in order.
    pub fn iter(&self) -> std::slice::Iter<'_, SampleBuffer<T>> {
        self.buffers.iter()
    }

    #[inline]
    fn check_index(&self, idx: usize) -> Result<()> {
        if idx >= self.buffers.len() {
            return Err(CsError::IndexOutOfRange {
                index: idx,
                len: self.buffers.len(),
            });
        }
        Ok(())
    }
}

/// An ordered collection of named streams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStreamContainer<T> {
    streams: Vec<DataStream<T>>,
}

impl<T> Default for DataStreamContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DataStreamContainer<T> {
    /// Create an empty container.
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
        }
    }

    /// Append a single stream.
    pub fn push(&mut self, stream: DataStream<T>) {
        self.streams.push(stream);
    }

    /// Move every stream of `other` to the end of this container.
    pub fn append(&mut self, other: DataStreamContainer<T>) {
        self.streams.extend(other.streams);
    }

    /// Number of streams.
    #[inline]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Check if the container holds no streams.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// First stream with the given name.
    pub fn get(&self, name: &str) -> Option<&DataStream<T>> {
        self.streams.iter().find(|s| s.name() == name)
    }

    /// First stream with the given name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut DataStream<T>> {
        self.streams.iter_mut().find(|s| s.name() == name)
    }

    /// Remove and return the first stream with the given name.
    pub fn take(&mut self, name: &str) -> Option<DataStream<T>> {
        let idx = self.streams.iter().position(|s| s.name() == name)?;
        Some(self.streams.remove(idx))
    }

    /// Iterate over streams in order.
    pub fn iter(&self) -> std::slice::Iter<'_, DataStream<T>> {
        self.streams.iter()
    }
}
