//! Core data types shared by the reconstruction pipeline.
//!
//! These types are designed to be:
//! - Small and `Copy` where they travel through hot loops
//! - Serializable so reports can be exported alongside the data
//! - Independent of any particular recovery algorithm

use serde::{Deserialize, Serialize};

/// Identifier of a node inside one cluster.
pub type NodeId = u8;

/// Maximum number of source nodes a cluster can hold.
///
/// The id space is a single byte; one additional id is reserved for the
/// cluster head itself.
pub const MAX_SRC_NODES: usize = 255;

/// Node id of the cluster head.
pub const CLUSTER_NODE_ID: NodeId = 0;

/// Why a recovery run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopReason {
    /// Residual norm dropped to or below the tolerance
    Tolerance,
    /// Support reached the working sparsity
    Sparsity,
    /// Iteration cap was reached
    IterationLimit,
    /// No remaining column correlates with the residual
    Exhausted,
}

impl StopReason {
    /// Get a human-readable name for the stop reason.
    pub fn name(&self) -> &'static str {
        match self {
            StopReason::Tolerance => "TOLERANCE",
            StopReason::Sparsity => "SPARSITY",
            StopReason::IterationLimit => "ITERATION_LIMIT",
            StopReason::Exhausted => "EXHAUSTED",
        }
    }
}

/// Parameters of a single recovery run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryParams {
    /// Working sparsity (maximum support size)
    pub sparsity: usize,

    /// Iteration cap, `None` for no cap
    pub iteration_limit: Option<usize>,

    /// Residual-norm tolerance
    pub tolerance: f64,
}

impl RecoveryParams {
    /// Create parameters without an iteration cap.
    pub fn new(sparsity: usize, tolerance: f64) -> Self {
        Self {
            sparsity,
            iteration_limit: None,
            tolerance,
        }
    }

    /// Set the iteration cap; `0` means no cap.
    pub fn with_iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = if limit == 0 { None } else { Some(limit) };
        self
    }
}

/// Result of a recovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    /// Estimate of the original signal, zero outside the support
    pub estimate: Vec<f64>,

    /// Selected column indices, in selection order
    pub support: Vec<usize>,

    /// Number of greedy iterations performed
    pub iterations: usize,

    /// Euclidean norm of the final residual
    pub residual_norm: f64,

    /// Why the run stopped
    pub stop_reason: StopReason,

    /// Number of measurements the run used
    pub measurements: usize,

    /// Wall-clock time of the solve in microseconds
    pub elapsed_us: u64,
}

impl Recovery {
    /// Elapsed time in whole milliseconds.
    #[inline]
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_us / 1_000
    }

    /// Number of non-zero entries in the estimate.
    pub fn nonzeros(&self) -> usize {
        self.estimate.iter().filter(|v| **v != 0.0).count()
    }
}

/// Logical state of a node record.
///
/// Not stored; derived from the record's buffer and estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Registered, no measurements buffered and no estimate yet
    Registered,
    /// Measurements present, not yet reconstructed
    Buffering,
    /// An estimate is available
    Reconstructed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_limit_zero_means_unbounded() {
        let params = RecoveryParams::new(4, 1e-6).with_iteration_limit(0);
        assert_eq!(params.iteration_limit, None);

        let params = params.with_iteration_limit(3);
        assert_eq!(params.iteration_limit, Some(3));
    }

    #[test]
    fn test_recovery_helpers() {
        let recovery = Recovery {
            estimate: vec![0.0, 1.5, 0.0, -2.0],
            support: vec![3, 1],
            iterations: 2,
            residual_norm: 0.0,
            stop_reason: StopReason::Tolerance,
            measurements: 3,
            elapsed_us: 2_500,
        };

        assert_eq!(recovery.nonzeros(), 2);
        assert_eq!(recovery.elapsed_ms(), 2);
        assert_eq!(recovery.stop_reason.name(), "TOLERANCE");
    }
}
