//! Seeded pseudorandom sensing matrices.
//!
//! Every source node compresses its signal with its own sensing matrix
//! `Φ` (`rows × cols`, i.e. `m_max × n_meas`), and the cluster head needs the
//! very same matrix to reconstruct. Both sides therefore regenerate it from
//! the node seed instead of transmitting it.
//!
//! # Generation procedure
//!
//! - Generator: ChaCha8, seeded with `seed` widened to `u64`
//! - Entries: i.i.d. standard normal, drawn row-major
//! - Optional normalization: every entry scaled by `1/sqrt(rows)`
//!
//! The procedure is stable across platforms, so `(seed, rows, cols,
//! normalize)` fully determines the matrix.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

use crate::error::{CsError, Result};

/// Dense row-major sensing matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SensingMatrix {
    rows: usize,
    cols: usize,
    seed: u32,
    /// Row-major entries (len == rows * cols)
    data: Vec<f64>,
}

impl SensingMatrix {
    /// Generate a Gaussian sensing matrix from a seed.
    ///
    /// # Arguments
    /// * `seed` - Node seed shared with the compressing side
    /// * `rows` - Number of measurements (`m_max`)
    /// * `cols` - Signal length (`n_meas`)
    /// * `normalize` - Scale entries by `1/sqrt(rows)`
    ///
    /// # Example
    /// ```
    /// use cs_cluster_reconstructor::SensingMatrix;
    ///
    /// let a = SensingMatrix::generate(7, 4, 16, true);
    /// let b = SensingMatrix::generate(7, 4, 16, true);
    /// assert_eq!(a, b);
    /// ```
    pub fn generate(seed: u32, rows: usize, cols: usize, normalize: bool) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        let scale = if normalize && rows > 0 {
            1.0 / (rows as f64).sqrt()
        } else {
            1.0
        };

        let data = (0..rows * cols)
            .map(|_| {
                let v: f64 = rng.sample(StandardNormal);
                v * scale
            })
            .collect();

        Self {
            rows,
            cols,
            seed,
            data,
        }
    }

    /// Build a matrix from explicit rows.
    ///
    /// Used for hand-made operators; the seed is reported as 0.
    ///
    /// # Errors
    /// [`CsError::Configuration`] if the rows have different lengths.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(CsError::config("sensing matrix rows differ in length"));
        }

        Ok(Self {
            rows: n_rows,
            cols,
            seed: 0,
            data: rows.into_iter().flatten().collect(),
        })
    }

    /// Number of rows (measurements).
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (signal dimensions).
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Seed the matrix was generated from.
    #[inline]
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Entry at `(row, col)`.
    ///
    /// Panics if out of bounds, like slice indexing.
    #[inline(always)]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Borrow one row.
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Copy the first `m` entries of column `col`.
    pub fn column(&self, col: usize, m: usize) -> Vec<f64> {
        (0..m.min(self.rows)).map(|r| self.get(r, col)).collect()
    }

    /// Inner product of column `col` (first `v.len()` rows) with `v`.
    #[inline]
    pub fn column_dot(&self, col: usize, v: &[f64]) -> f64 {
        v.iter()
            .enumerate()
            .map(|(r, x)| self.get(r, col) * x)
            .sum()
    }

    /// Compute the measurements `y = Φx`.
    ///
    /// This is the compressing side of the contract; the reconstruction
    /// side only needs the matrix.
    ///
    /// # Errors
    /// [`CsError::Configuration`] if `x.len() != cols()`.
    pub fn compress(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.cols {
            return Err(CsError::config(format!(
                "signal length {} does not match matrix columns {}",
                x.len(),
                self.cols
            )));
        }

        Ok((0..self.rows)
            .map(|r| self.row(r).iter().zip(x).map(|(a, b)| a * b).sum())
            .collect())
    }
}
