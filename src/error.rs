//! Error types for compressed-sensing reconstruction.
//!
//! Clean error handling using `thiserror` for ergonomic error definitions.

use thiserror::Error;

/// Result type alias for reconstruction operations.
pub type Result<T> = std::result::Result<T, CsError>;

/// Main error type for reconstruction operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CsError {
    /// Invalid setup parameters or node-count overflow
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Node id registered twice
    #[error("Duplicate node: {0}")]
    DuplicateNode(u8),

    /// Operation on a node id that was never registered
    #[error("Unknown node: {0}")]
    UnknownNode(u8),

    /// Registry or buffer index misuse
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Write into a buffer with no remaining capacity
    #[error("Buffer full (capacity {capacity})")]
    BufferFull { capacity: usize },

    /// Reconstruction attempted without any measurements
    #[error("Input buffer of node {0} is empty")]
    EmptyBuffer(u8),

    /// Ill-conditioned or non-finite least-squares solve
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Aggregate of per-node failures from a batch reconstruction
    #[error("Batch reconstruction failed for {failed} of {total} nodes")]
    Batch { failed: usize, total: usize },

    /// Generic error with context
    #[error("Error: {0}")]
    Generic(String),
}

impl CsError {
    /// Create a generic error from any string-like type.
    pub fn generic(msg: impl Into<String>) -> Self {
        CsError::Generic(msg.into())
    }

    /// Create a configuration error from any string-like type.
    pub fn config(msg: impl Into<String>) -> Self {
        CsError::Configuration(msg.into())
    }

    /// Create a numerical error from any string-like type.
    pub fn numerical(msg: impl Into<String>) -> Self {
        CsError::Numerical(msg.into())
    }
}

impl From<std::io::Error> for CsError {
    fn from(err: std::io::Error) -> Self {
        CsError::Generic(format!("IO error: {err}"))
    }
}

impl From<serde_json::Error> for CsError {
    fn from(err: serde_json::Error) -> Self {
        CsError::Generic(format!("JSON error: {err}"))
    }
}

impl From<String> for CsError {
    fn from(err: String) -> Self {
        CsError::Generic(err)
    }
}

impl From<&str> for CsError {
    fn from(err: &str) -> Self {
        CsError::Generic(err.to_string())
    }
}
