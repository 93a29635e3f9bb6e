//! Pluggable sparse-recovery strategy.

use std::fmt::Debug;

use crate::error::Result;
use crate::sensing::SensingMatrix;
use crate::types::{Recovery, RecoveryParams};

/// A sparse-recovery algorithm usable by [`Reconstructor`](super::Reconstructor).
///
/// Implementations recover `x` from `y = Φx` where `Φ` is given by the
/// first `y.len()` rows of `phi`. They must be stateless across calls so a
/// single instance can serve every node, possibly from several threads.
///
/// The caller measures wall-clock time around `recover` and overwrites
/// [`Recovery::elapsed_us`].
pub trait ReconstructionAlgorithm: Debug + Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Recover a sparse estimate of length `phi.cols()`.
    fn recover(&self, phi: &SensingMatrix, y: &[f64], params: &RecoveryParams)
        -> Result<Recovery>;
}
