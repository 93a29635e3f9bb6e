//! Orthogonal Matching Pursuit.
//!
//! Greedily selects the column of `Φ` that best explains the residual, then
//! re-solves least squares over every selected column. The least-squares
//! problem is kept in factored form (`Φ_S = QR`, grown one column per
//! iteration with re-orthogonalized modified Gram-Schmidt), so each step
//! costs `O(m·k)` instead of refactoring from scratch.
//!
//! # Stopping policy
//!
//! Checked before every selection, in this order:
//! 1. `‖r‖ ≤ tolerance` → [`StopReason::Tolerance`]
//! 2. support size reached the working sparsity → [`StopReason::Sparsity`]
//! 3. iteration cap reached → [`StopReason::IterationLimit`]
//! 4. no remaining column correlates with `r` → [`StopReason::Exhausted`]
//!
//! Ties in the correlation are broken by the lowest column index.

use crate::error::{CsError, Result};
use crate::sensing::SensingMatrix;
use crate::types::{Recovery, RecoveryParams, StopReason};

use super::algorithm::ReconstructionAlgorithm;

/// Default relative threshold below which a new column counts as linearly
/// dependent on the current support.
pub const DEFAULT_DEPENDENCY_THRESHOLD: f64 = 1e-10;

/// Orthogonal Matching Pursuit engine.
///
/// # Example
/// ```
/// use cs_cluster_reconstructor::{Omp, ReconstructionAlgorithm, RecoveryParams, SensingMatrix};
///
/// let phi = SensingMatrix::generate(11, 20, 40, true);
/// let mut x = vec![0.0; 40];
/// x[3] = 1.0;
/// x[17] = -2.0;
/// let y = phi.compress(&x).unwrap();
///
/// let recovery = Omp::new().recover(&phi, &y, &RecoveryParams::new(2, 1e-9)).unwrap();
/// assert!((recovery.estimate[17] + 2.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Omp {
    dependency_threshold: f64,
}

impl Default for Omp {
    fn default() -> Self {
        Self::new()
    }
}

/// Incrementally grown thin QR factorization of the support columns.
struct SupportQr {
    /// Orthonormal columns, each of length m
    q: Vec<Vec<f64>>,
    /// Upper-triangular factor stored by column: `r[j][i] = R[i][j]`, i <= j
    r: Vec<Vec<f64>>,
    /// `Qᵀy`
    qty: Vec<f64>,
}

impl SupportQr {
    fn with_capacity(k: usize) -> Self {
        Self {
            q: Vec::with_capacity(k),
            r: Vec::with_capacity(k),
            qty: Vec::with_capacity(k),
        }
    }

    /// Append column `a`. Returns false if it is numerically inside the
    /// span of the columns already present.
    fn push(&mut self, mut a: Vec<f64>, y: &[f64], threshold: f64) -> bool {
        let a_norm = norm(&a);
        if a_norm == 0.0 {
            return false;
        }

        let mut r_col = vec![0.0; self.q.len() + 1];
        // Two Gram-Schmidt passes keep Q orthogonal to working precision.
        for _ in 0..2 {
            for (i, q_i) in self.q.iter().enumerate() {
                let proj = dot(q_i, &a);
                r_col[i] += proj;
                for (a_r, q_r) in a.iter_mut().zip(q_i) {
                    *a_r -= proj * q_r;
                }
            }
        }

        let rest = norm(&a);
        if rest <= threshold * a_norm {
            return false;
        }

        for v in a.iter_mut() {
            *v /= rest;
        }
        let k = self.q.len();
        r_col[k] = rest;
        self.qty.push(dot(&a, y));
        self.q.push(a);
        self.r.push(r_col);
        true
    }

    /// Back substitution `R x = Qᵀy`.
    fn solve(&self) -> Vec<f64> {
        let k = self.qty.len();
        let mut x = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = self.qty[i];
            for j in (i + 1)..k {
                sum -= self.r[j][i] * x[j];
            }
            x[i] = sum / self.r[i][i];
        }
        x
    }
}

impl Omp {
    /// Create an engine with the default dependency threshold.
    pub fn new() -> Self {
        Self {
            dependency_threshold: DEFAULT_DEPENDENCY_THRESHOLD,
        }
    }

    /// Set the relative threshold used to detect an ill-conditioned support.
    pub fn with_dependency_threshold(mut self, threshold: f64) -> Self {
        self.dependency_threshold = threshold;
        self
    }

    /// Relative dependency threshold.
    #[inline]
    pub fn dependency_threshold(&self) -> f64 {
        self.dependency_threshold
    }

    /// Column outside the support with the largest absolute correlation.
    ///
    /// Returns `None` if every candidate has zero correlation.
    #[inline]
    fn select_column(
        phi: &SensingMatrix,
        residual: &[f64],
        in_support: &[bool],
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for j in 0..phi.cols() {
            if in_support[j] {
                continue;
            }
            let corr = phi.column_dot(j, residual).abs();
            // Strict comparison keeps the lowest index on ties
            if corr > best.map_or(0.0, |(_, c)| c) {
                best = Some((j, corr));
            }
        }
        best
    }
}

impl ReconstructionAlgorithm for Omp {
    fn name(&self) -> &'static str {
        "omp"
    }

    fn recover(
        &self,
        phi: &SensingMatrix,
        y: &[f64],
        params: &RecoveryParams,
    ) -> Result<Recovery> {
        let m = y.len();
        let n = phi.cols();

        if m > phi.rows() {
            return Err(CsError::config(format!(
                "{} measurements exceed sensing matrix rows {}",
                m,
                phi.rows()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(CsError::numerical("measurements contain non-finite values"));
        }

        let sparsity = params.sparsity.min(m).min(n);
        let mut support: Vec<usize> = Vec::with_capacity(sparsity);
        let mut in_support = vec![false; n];
        let mut qr = SupportQr::with_capacity(sparsity);
        let mut coeffs: Vec<f64> = Vec::new();
        let mut residual = y.to_vec();
        let mut residual_norm = norm(&residual);
        let mut iterations = 0usize;

        let stop_reason = loop {
            if residual_norm <= params.tolerance {
                break StopReason::Tolerance;
            }
            if support.len() >= sparsity {
                break StopReason::Sparsity;
            }
            if params.iteration_limit.is_some_and(|limit| iterations >= limit) {
                break StopReason::IterationLimit;
            }

            let Some((col, _)) = Self::select_column(phi, &residual, &in_support) else {
                break StopReason::Exhausted;
            };
            iterations += 1;

            if !qr.push(phi.column(col, m), y, self.dependency_threshold) {
                return Err(CsError::numerical(format!(
                    "column {col} is linearly dependent on a support of size {}",
                    support.len()
                )));
            }
            support.push(col);
            in_support[col] = true;

            coeffs = qr.solve();
            if coeffs.iter().any(|c| !c.is_finite()) {
                return Err(CsError::numerical(format!(
                    "least-squares solve diverged at support size {}",
                    support.len()
                )));
            }

            // r = y - Φ_S x_S
            residual.copy_from_slice(y);
            for (&s, &c) in support.iter().zip(&coeffs) {
                for (row, r) in residual.iter_mut().enumerate() {
                    *r -= phi.get(row, s) * c;
                }
            }
            residual_norm = norm(&residual);
        };

        let mut estimate = vec![0.0; n];
        for (&s, &c) in support.iter().zip(&coeffs) {
            estimate[s] = c;
        }

        Ok(Recovery {
            estimate,
            support,
            iterations,
            residual_norm,
            stop_reason,
            measurements: m,
            elapsed_us: 0,
        })
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse_signal(n: usize, entries: &[(usize, f64)]) -> Vec<f64> {
        let mut x = vec![0.0; n];
        for &(i, v) in entries {
            x[i] = v;
        }
        x
    }

    fn error_norm(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    #[test]
    fn test_exact_recovery() {
        let n = 64;
        let m = 24;
        let x = sparse_signal(n, &[(5, 1.0), (20, -0.7), (42, 0.5)]);
        let phi = SensingMatrix::generate(42, m, n, true);
        let y = phi.compress(&x).unwrap();

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(3, 1e-9))
            .unwrap();

        assert_eq!(recovery.estimate.len(), n);
        assert!(error_norm(&recovery.estimate, &x) < 1e-6);
        let mut support = recovery.support.clone();
        support.sort_unstable();
        assert_eq!(support, vec![5, 20, 42]);
    }

    #[test]
    fn test_stops_on_tolerance_before_sparsity() {
        let n = 50;
        let x = sparse_signal(n, &[(7, 2.0)]);
        let phi = SensingMatrix::generate(5, 30, n, true);
        let y = phi.compress(&x).unwrap();

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(10, 1e-8))
            .unwrap();

        assert_eq!(recovery.stop_reason, StopReason::Tolerance);
        assert_eq!(recovery.support, vec![7]);
        assert_eq!(recovery.iterations, 1);
        assert!(recovery.residual_norm <= 1e-8);
    }

    #[test]
    fn test_stops_on_sparsity() {
        let n = 40;
        let x = sparse_signal(n, &[(1, 1.0), (2, 1.0), (30, -1.0)]);
        let phi = SensingMatrix::generate(8, 20, n, true);
        let y = phi.compress(&x).unwrap();

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(2, 0.0))
            .unwrap();

        assert_eq!(recovery.stop_reason, StopReason::Sparsity);
        assert_eq!(recovery.support.len(), 2);
        assert_eq!(recovery.nonzeros(), 2);
    }

    #[test]
    fn test_iteration_limit() {
        let n = 40;
        let x = sparse_signal(n, &[(1, 1.0), (9, 0.5), (30, -1.0)]);
        let phi = SensingMatrix::generate(13, 20, n, true);
        let y = phi.compress(&x).unwrap();

        let params = RecoveryParams::new(5, 0.0).with_iteration_limit(1);
        let recovery = Omp::new().recover(&phi, &y, &params).unwrap();

        assert_eq!(recovery.stop_reason, StopReason::IterationLimit);
        assert_eq!(recovery.iterations, 1);
        assert_eq!(recovery.support.len(), 1);
    }

    #[test]
    fn test_zero_measurements_need_no_iteration() {
        let phi = SensingMatrix::generate(1, 10, 30, true);
        let y = vec![0.0; 10];

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(5, 0.0))
            .unwrap();

        assert_eq!(recovery.stop_reason, StopReason::Tolerance);
        assert_eq!(recovery.iterations, 0);
        assert!(recovery.estimate.iter().all(|v| *v == 0.0));
        assert!(recovery.support.is_empty());
    }

    #[test]
    fn test_exhausted_when_residual_is_orthogonal_to_all_columns() {
        let phi = SensingMatrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let y = vec![0.0, 1.0];

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(2, 0.0))
            .unwrap();

        assert_eq!(recovery.stop_reason, StopReason::Exhausted);
        assert_eq!(recovery.estimate, vec![0.0, 0.0]);
        assert!((recovery.residual_norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial_measurements_use_leading_rows() {
        let n = 60;
        let x = sparse_signal(n, &[(11, 1.5), (40, -0.8)]);
        let phi = SensingMatrix::generate(77, 30, n, true);
        let y_full = phi.compress(&x).unwrap();

        let recovery = Omp::new()
            .recover(&phi, &y_full[..16], &RecoveryParams::new(2, 1e-9))
            .unwrap();

        assert_eq!(recovery.measurements, 16);
        assert!(error_norm(&recovery.estimate, &x) < 1e-6);
    }

    #[test]
    fn test_tie_breaks_on_lowest_index() {
        // Columns 1 and 2 are identical, column 0 is orthogonal to y
        let phi = SensingMatrix::from_rows(vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]]).unwrap();
        let y = vec![0.0, 1.0];

        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(1, 0.0))
            .unwrap();

        assert_eq!(recovery.support, vec![1]);
        assert_eq!(recovery.estimate, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_nearly_dependent_column_is_numerical_error() {
        // Column 1 is picked first; column 0 is nearly parallel to it
        let phi = SensingMatrix::from_rows(vec![
            vec![1.0, 1.0, 0.0],
            vec![0.0, 0.1, 0.0],
            vec![0.0, 0.0, 1.0],
        ])
        .unwrap();
        let y = vec![1.0, 1.0, 0.0];

        let result = Omp::new()
            .with_dependency_threshold(0.5)
            .recover(&phi, &y, &RecoveryParams::new(2, 0.0));
        assert!(matches!(result, Err(CsError::Numerical(_))));

        // The default threshold accepts the same support
        let recovery = Omp::new()
            .recover(&phi, &y, &RecoveryParams::new(2, 0.0))
            .unwrap();
        assert_eq!(recovery.support, vec![1, 0]);
        assert!(recovery.residual_norm < 1e-9);
    }

    #[test]
    fn test_non_finite_measurements() {
        let phi = SensingMatrix::generate(1, 4, 8, true);
        let y = vec![0.0, f64::NAN, 1.0, 2.0];
        assert!(matches!(
            Omp::new().recover(&phi, &y, &RecoveryParams::new(2, 0.0)),
            Err(CsError::Numerical(_))
        ));
    }

    #[test]
    fn test_too_many_measurements() {
        let phi = SensingMatrix::generate(1, 4, 8, true);
        let y = vec![1.0; 5];
        assert!(matches!(
            Omp::new().recover(&phi, &y, &RecoveryParams::new(2, 0.0)),
            Err(CsError::Configuration(_))
        ));
    }
}
