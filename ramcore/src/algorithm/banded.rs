use nalgebra::DMatrix;

use crate::error::RamanError;

/// Symmetric matrix with half-bandwidth 2, stored by its upper bands.
///
/// `diag[i] = A[i][i]`, `upper1[i] = A[i][i + 1]`, `upper2[i] = A[i][i + 2]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SymmetricPentadiagonal {
    pub diag: Vec<f64>,
    pub upper1: Vec<f64>,
    pub upper2: Vec<f64>,
}

impl SymmetricPentadiagonal {
    /// Builds `lambda * DᵀD` where `D` is the `(n - 2) x n` second-order difference
    /// operator with rows `[1, -2, 1]`.
    ///
    /// # Arguments
    ///
    /// * `n` - Number of samples, at least 3.
    /// * `lambda` - Smoothness penalty.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use ramcore::algorithm::banded::SymmetricPentadiagonal;
    /// let h = SymmetricPentadiagonal::second_difference_penalty(5, 1.0);
    /// assert_eq!(h.diag, vec![1.0, 5.0, 6.0, 5.0, 1.0]);
    /// assert_eq!(h.upper1, vec![-2.0, -4.0, -4.0, -2.0]);
    /// assert_eq!(h.upper2, vec![1.0, 1.0, 1.0]);
    /// ```
    pub fn second_difference_penalty(n: usize, lambda: f64) -> Self {
        const STENCIL: [f64; 3] = [1.0, -2.0, 1.0];

        let mut diag = vec![0.0; n];
        let mut upper1 = vec![0.0; n.saturating_sub(1)];
        let mut upper2 = vec![0.0; n.saturating_sub(2)];

        // accumulate the outer product of every row of D
        for row in 0..n.saturating_sub(2) {
            for a in 0..3 {
                diag[row + a] += STENCIL[a] * STENCIL[a];
            }
            for a in 0..2 {
                upper1[row + a] += STENCIL[a] * STENCIL[a + 1];
            }
            upper2[row] += STENCIL[0] * STENCIL[2];
        }

        for v in diag.iter_mut().chain(upper1.iter_mut()).chain(upper2.iter_mut()) {
            *v *= lambda;
        }

        SymmetricPentadiagonal { diag, upper1, upper2 }
    }

    pub fn len(&self) -> usize {
        self.diag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diag.is_empty()
    }

    /// Returns `diag(weights) + self`.
    pub fn with_added_diagonal(&self, weights: &[f64]) -> Self {
        debug_assert_eq!(weights.len(), self.len());
        let diag = self.diag.iter().zip(weights).map(|(a, w)| a + w).collect();
        SymmetricPentadiagonal {
            diag,
            upper1: self.upper1.clone(),
            upper2: self.upper2.clone(),
        }
    }

    /// Factorizes the matrix as `L * D * Lᵀ` with `L` unit lower triangular of
    /// bandwidth 2. Runs in O(n).
    pub fn factorize(&self) -> Result<PentadiagonalLdl, RamanError> {
        let n = self.len();
        let mut pivots = vec![0.0; n];
        let mut lower1 = vec![0.0; n.saturating_sub(1)];
        let mut lower2 = vec![0.0; n.saturating_sub(2)];

        for i in 0..n {
            let mut pivot = self.diag[i];
            if i >= 1 {
                pivot -= lower1[i - 1] * lower1[i - 1] * pivots[i - 1];
            }
            if i >= 2 {
                pivot -= lower2[i - 2] * lower2[i - 2] * pivots[i - 2];
            }
            if !(pivot > 0.0) || !pivot.is_finite() {
                return Err(RamanError::NotPositiveDefinite { index: i });
            }
            pivots[i] = pivot;

            if i + 1 < n {
                let mut off = self.upper1[i];
                if i >= 1 {
                    off -= lower2[i - 1] * pivots[i - 1] * lower1[i - 1];
                }
                lower1[i] = off / pivot;
            }
            if i + 2 < n {
                lower2[i] = self.upper2[i] / pivot;
            }
        }

        Ok(PentadiagonalLdl { pivots, lower1, lower2 })
    }

    /// Dense copy of the matrix.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.len();
        DMatrix::from_fn(n, n, |r, c| {
            let (i, j) = if r <= c { (r, c) } else { (c, r) };
            match j - i {
                0 => self.diag[i],
                1 => self.upper1[i],
                2 => self.upper2[i],
                _ => 0.0,
            }
        })
    }
}

/// LDLᵀ factors of a [`SymmetricPentadiagonal`] matrix.
#[derive(Clone, Debug)]
pub struct PentadiagonalLdl {
    pivots: Vec<f64>,
    lower1: Vec<f64>,
    lower2: Vec<f64>,
}

impl PentadiagonalLdl {
    /// Solves `A x = rhs`.
    pub fn solve(&self, rhs: &[f64]) -> Vec<f64> {
        let n = self.pivots.len();
        debug_assert_eq!(rhs.len(), n);
        let mut x = rhs.to_vec();

        // L y = b
        for i in 1..n {
            x[i] -= self.lower1[i - 1] * x[i - 1];
            if i >= 2 {
                x[i] -= self.lower2[i - 2] * x[i - 2];
            }
        }

        for (xi, p) in x.iter_mut().zip(&self.pivots) {
            *xi /= p;
        }

        // Lᵀ x = y
        for i in (0..n.saturating_sub(1)).rev() {
            x[i] -= self.lower1[i] * x[i + 1];
            if i + 2 < n {
                x[i] -= self.lower2[i] * x[i + 2];
            }
        }

        x
    }
}
