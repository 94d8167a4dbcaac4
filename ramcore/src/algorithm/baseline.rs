use log::{debug, warn};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::algorithm::banded::{PentadiagonalLdl, SymmetricPentadiagonal};
use crate::error::RamanError;

/// Parameters of the asymmetrically reweighted penalized least squares (arPLS) baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArplsConfig {
    /// Smoothness penalty on the second derivative of the baseline (default: 10000)
    pub lambda: f64,
    /// Relative weight change below which the iteration stops (default: 0.05)
    pub ratio: f64,
    /// Maximum number of reweighting iterations (default: 100)
    pub itermax: usize,
}

impl Default for ArplsConfig {
    fn default() -> Self {
        ArplsConfig {
            lambda: 1e4,
            ratio: 0.05,
            itermax: 100,
        }
    }
}

impl ArplsConfig {
    pub fn validate(&self) -> Result<(), RamanError> {
        if !(self.lambda > 0.0) || !self.lambda.is_finite() {
            return Err(RamanError::invalid(format!("lambda must be positive and finite, got {}", self.lambda)));
        }
        if !(self.ratio > 0.0 && self.ratio < 1.0) {
            return Err(RamanError::invalid(format!("ratio must lie in (0, 1), got {}", self.ratio)));
        }
        if self.itermax == 0 {
            return Err(RamanError::invalid("itermax must be at least 1"));
        }
        Ok(())
    }
}

/// Baseline together with its convergence report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineFit {
    pub baseline: Vec<f64>,
    /// Number of linear solves performed.
    pub iterations: usize,
    /// `false` when `itermax` was exhausted or the solve broke down.
    pub converged: bool,
}

/// Estimates the smooth background of `y` with arPLS.
///
/// # Arguments
///
/// * `y` - Intensities, at least 3 finite samples.
/// * `config` - Penalty, stopping ratio and iteration cap.
///
/// # Returns
///
/// The baseline, one value per sample. Hitting the iteration cap is not an error,
/// use [`arpls_fit`] to find out whether it happened.
///
/// # Example
///
/// ```rust
/// # use ramcore::algorithm::baseline::{arpls, ArplsConfig};
/// let y = vec![2.0; 50];
/// let z = arpls(&y, &ArplsConfig::default()).unwrap();
/// assert_eq!(z.len(), 50);
/// assert!(z.iter().all(|v| (v - 2.0).abs() < 1e-6));
/// ```
pub fn arpls(y: &[f64], config: &ArplsConfig) -> Result<Vec<f64>, RamanError> {
    arpls_fit(y, config).map(|fit| fit.baseline)
}

/// Same as [`arpls`] but also reports how many iterations ran and whether the
/// weights converged.
pub fn arpls_fit(y: &[f64], config: &ArplsConfig) -> Result<BaselineFit, RamanError> {
    config.validate()?;

    let n = y.len();
    if n < 3 {
        return Err(RamanError::invalid(format!("baseline needs at least 3 samples, got {}", n)));
    }
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(RamanError::invalid(format!("intensity at index {} is not finite", i)));
    }

    reweight(y, config, |system| system.factorize())
}

/// Reweighting loop of [`arpls_fit`] on validated input, with the factorization step
/// supplied by the caller.
fn reweight<F>(y: &[f64], config: &ArplsConfig, mut factorize: F) -> Result<BaselineFit, RamanError>
where
    F: FnMut(&SymmetricPentadiagonal) -> Result<PentadiagonalLdl, RamanError>,
{
    let n = y.len();
    let penalty = SymmetricPentadiagonal::second_difference_penalty(n, config.lambda);
    let y = DVector::from_column_slice(y);
    let mut w = DVector::from_element(n, 1.0);
    let mut z: Option<Vec<f64>> = None;

    for iteration in 1..=config.itermax {
        let system = penalty.with_added_diagonal(w.as_slice());
        let factors = match factorize(&system) {
            Ok(f) => f,
            Err(e) => match z {
                // first system is I + H, which is always positive definite
                None => return Err(e),
                Some(baseline) => {
                    warn!("arpls: {} at iteration {}, keeping previous baseline", e, iteration);
                    return Ok(BaselineFit { baseline, iterations: iteration - 1, converged: false });
                }
            },
        };

        let rhs = w.component_mul(&y);
        let current = factors.solve(rhs.as_slice());
        let d = &y - DVector::from_column_slice(&current);

        let negative: Vec<f64> = d.iter().copied().filter(|&v| v < 0.0).collect();
        let m = negative.iter().mean();
        let s = negative.iter().population_std_dev();

        if !(s > 0.0) || !s.is_finite() {
            debug!("arpls: degenerate residual after {} iterations, baseline reached", iteration);
            return Ok(BaselineFit { baseline: current, iterations: iteration, converged: true });
        }

        let offset = 2.0 * s - m;
        let wt = d.map(|di| logistic(2.0 * (di - offset) / s));

        let change = (&w - &wt).norm() / w.norm();
        debug!("arpls: iteration {} relative weight change {:.6}", iteration, change);

        if change < config.ratio {
            return Ok(BaselineFit { baseline: current, iterations: iteration, converged: true });
        }
        z = Some(current);
        w = wt;
    }

    debug!("arpls: reached itermax = {} without convergence", config.itermax);
    Ok(BaselineFit {
        baseline: z.unwrap_or_default(),
        iterations: config.itermax,
        converged: false,
    })
}

/// `1 / (1 + e^t)`, saturating to 0 for large `t` and 1 for very negative `t`.
#[inline]
fn logistic(t: f64) -> f64 {
    // exp overflows to +inf, which yields exactly 0
    1.0 / (1.0 + t.exp())
}
