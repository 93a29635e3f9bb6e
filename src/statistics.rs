//! Reconstruction-time instrumentation.
//!
//! This module provides the structures used to track how reconstructions
//! behave over a long simulation: how often they run, how long they take,
//! how small the final residuals are and how many greedy iterations they need.
//!
//! # Key Features
//!
//! - **RunningStats**: Online algorithm for incremental mean/std computation
//! - **NodeStats**: Per-node counters and distributions
//! - **ReconstructorStats**: Store-wide totals
//!
//! # Usage
//!
//! ```ignore
//! let stats = reconstructor.node_stats(3)?;
//! println!(
//!     "node 3: {} runs, {:.3} ms mean, residual {:.2e}",
//!     stats.reconstructions,
//!     stats.elapsed_ms.mean,
//!     stats.residual_norm.mean
//! );
//! ```

use serde::{Deserialize, Serialize};

use crate::types::{Recovery, StopReason};

// ============================================================================
// Running Statistics (Welford's Algorithm)
// ============================================================================

/// Online algorithm for computing running mean and standard deviation.
///
/// Uses Welford's algorithm for numerical stability with large datasets.
/// This avoids the need to store all values in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningStats {
    /// Number of observations
    pub count: u64,
    /// Running mean
    pub mean: f64,
    /// Running M2 (sum of squared differences from mean)
    m2: f64,
    /// Minimum value observed
    pub min: f64,
    /// Maximum value observed
    pub max: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunningStats {
    /// Create a new running statistics tracker.
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Update statistics with a new value (Welford's online algorithm).
    #[inline]
    pub fn update(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;

        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Get the population variance.
    #[inline]
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }

    /// Get the population standard deviation.
    #[inline]
    pub fn std(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Check if any values have been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

// ============================================================================
// Per-node statistics
// ============================================================================

/// Counters and distributions for one node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeStats {
    /// Successful reconstructions
    pub reconstructions: u64,

    /// Failed reconstructions
    pub failures: u64,

    /// Samples accepted into the input buffer
    pub samples_written: u64,

    /// Writes rejected because the buffer was full
    pub rejected_writes: u64,

    /// Reconstruction wall-clock time (milliseconds, fractional)
    pub elapsed_ms: RunningStats,

    /// Final residual norm per reconstruction
    pub residual_norm: RunningStats,

    /// Greedy iterations per reconstruction
    pub iterations: RunningStats,

    /// Stop reason of the latest successful reconstruction
    pub last_stop_reason: Option<StopReason>,
}

impl NodeStats {
    /// Record an accepted or rejected write.
    #[inline]
    pub fn record_write(&mut self, accepted: bool) {
        if accepted {
            self.samples_written += 1;
        } else {
            self.rejected_writes += 1;
        }
    }

    /// Record a successful reconstruction.
    pub fn record_success(&mut self, recovery: &Recovery) {
        self.reconstructions += 1;
        self.elapsed_ms.update(recovery.elapsed_us as f64 / 1_000.0);
        self.residual_norm.update(recovery.residual_norm);
        self.iterations.update(recovery.iterations as f64);
        self.last_stop_reason = Some(recovery.stop_reason);
    }

    /// Record a failed reconstruction.
    #[inline]
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}

// ============================================================================
// Store-wide statistics
// ============================================================================

/// Totals across every node of a reconstructor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconstructorStats {
    /// Registered nodes
    pub node_count: usize,

    /// Successful reconstructions across all nodes
    pub total_reconstructions: u64,

    /// Failed reconstructions across all nodes
    pub total_failures: u64,

    /// Accumulated solve time (microseconds)
    pub total_elapsed_us: u64,

    /// Batch runs (`reconstruct_all` and its parallel variant)
    pub batches: u64,

    /// Reconstruction wall-clock time (milliseconds, fractional)
    pub elapsed_ms: RunningStats,
}

impl ReconstructorStats {
    /// Record a successful reconstruction.
    pub fn record_success(&mut self, recovery: &Recovery) {
        self.total_reconstructions += 1;
        self.total_elapsed_us += recovery.elapsed_us;
        self.elapsed_ms.update(recovery.elapsed_us as f64 / 1_000.0);
    }

    /// Record a failed reconstruction.
    #[inline]
    pub fn record_failure(&mut self) {
        self.total_failures += 1;
    }

    /// Fraction of reconstructions that failed.
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_reconstructions + self.total_failures;
        if total == 0 {
            0.0
        } else {
            self.total_failures as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recovery(elapsed_us: u64, residual_norm: f64, iterations: usize) -> Recovery {
        Recovery {
            estimate: vec![0.0; 4],
            support: vec![],
            iterations,
            residual_norm,
            stop_reason: StopReason::Sparsity,
            measurements: 2,
            elapsed_us,
        }
    }

    // -------------------------------------------------------------------------
    // RunningStats tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_running_stats_new() {
        let stats = RunningStats::new();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
        assert!(stats.is_empty());
    }

    #[test]
    fn test_running_stats_multiple_values() {
        let mut stats = RunningStats::new();
        for v in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.update(v);
        }

        assert_eq!(stats.count, 8);
        assert!((stats.mean - 5.0).abs() < 1e-10);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert!((stats.std() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_skip_nan() {
        let mut stats = RunningStats::new();
        stats.update(10.0);
        stats.update(f64::NAN);
        stats.update(20.0);

        assert_eq!(stats.count, 2);
        assert!((stats.mean - 15.0).abs() < 1e-10);
    }

    // -------------------------------------------------------------------------
    // NodeStats / ReconstructorStats tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_node_stats_records() {
        let mut stats = NodeStats::default();
        stats.record_write(true);
        stats.record_write(true);
        stats.record_write(false);
        stats.record_success(&recovery(1_500, 0.25, 3));
        stats.record_failure();

        assert_eq!(stats.samples_written, 2);
        assert_eq!(stats.rejected_writes, 1);
        assert_eq!(stats.reconstructions, 1);
        assert_eq!(stats.failures, 1);
        assert!((stats.elapsed_ms.mean - 1.5).abs() < 1e-12);
        assert_eq!(stats.iterations.mean, 3.0);
        assert_eq!(stats.last_stop_reason, Some(StopReason::Sparsity));
    }

    #[test]
    fn test_reconstructor_stats_failure_rate() {
        let mut stats = ReconstructorStats::default();
        assert_eq!(stats.failure_rate(), 0.0);

        stats.record_success(&recovery(2_000, 0.0, 1));
        stats.record_success(&recovery(4_000, 0.0, 1));
        stats.record_success(&recovery(0, 0.0, 1));
        stats.record_failure();

        assert_eq!(stats.total_elapsed_us, 6_000);
        assert!((stats.failure_rate() - 0.25).abs() < 1e-12);
        assert!((stats.elapsed_ms.mean - 2.0).abs() < 1e-12);
    }
}
