use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::distributions::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::data::spectrum::RamanSpectrum;

/// Gaussian line shape with apex `height` at `center`.
///
/// Non-positive `sigma` degenerates to a single spike at `center`.
pub fn gaussian_profile(x: f64, center: f64, sigma: f64, height: f64) -> f64 {
    if sigma <= 0.0 {
        return if x == center { height } else { 0.0 };
    }
    let z = (x - center) / sigma;
    height * (-0.5 * z * z).exp()
}

/// Line of a synthetic spectrum.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPeak {
    pub center: f64,
    pub sigma: f64,
    pub height: f64,
}

/// Builder for reproducible test spectra: Gaussian lines on a polynomial background
/// with optional seeded Gaussian noise.
///
/// # Example
///
/// ```rust
/// # use ramcore::data::synthetic::SyntheticSpectrum;
/// let spectrum = SyntheticSpectrum::new(200.0, 1800.0, 1601)
///     .with_drift(vec![10.0, 0.01])
///     .with_peak(1000.0, 5.0, 50.0)
///     .with_noise(0.5, 42)
///     .generate();
/// assert_eq!(spectrum.len(), 1601);
/// assert_eq!(spectrum.wavenumber[800], 1000.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpectrum {
    pub start: f64,
    pub end: f64,
    pub num_points: usize,
    /// Polynomial coefficients of the background in ascending order of power of the wavenumber.
    pub drift: Vec<f64>,
    pub peaks: Vec<SyntheticPeak>,
    /// Standard deviation and seed of additive noise.
    pub noise: Option<(f64, u64)>,
}

impl SyntheticSpectrum {
    pub fn new(start: f64, end: f64, num_points: usize) -> Self {
        SyntheticSpectrum {
            start,
            end,
            num_points,
            drift: Vec::new(),
            peaks: Vec::new(),
            noise: None,
        }
    }

    pub fn with_drift(mut self, coefficients: Vec<f64>) -> Self {
        self.drift = coefficients;
        self
    }

    pub fn with_peak(mut self, center: f64, sigma: f64, height: f64) -> Self {
        self.peaks.push(SyntheticPeak { center, sigma, height });
        self
    }

    pub fn with_noise(mut self, std_dev: f64, seed: u64) -> Self {
        self.noise = Some((std_dev, seed));
        self
    }

    pub fn wavenumbers(&self) -> Vec<f64> {
        match self.num_points {
            0 => Vec::new(),
            1 => vec![self.start],
            n => {
                let step = (self.end - self.start) / (n - 1) as f64;
                (0..n).map(|i| self.start + i as f64 * step).collect()
            }
        }
    }

    /// Background alone, evaluated on the wavenumber grid.
    pub fn background(&self) -> Vec<f64> {
        self.wavenumbers().iter().map(|&x| self.drift_at(x)).collect()
    }

    pub fn generate(&self) -> RamanSpectrum {
        let wavenumber = self.wavenumbers();
        let mut intensity: Vec<f64> = wavenumber
            .iter()
            .map(|&x| {
                self.drift_at(x)
                    + self.peaks.iter().map(|p| gaussian_profile(x, p.center, p.sigma, p.height)).sum::<f64>()
            })
            .collect();

        if let Some((std_dev, seed)) = self.noise {
            if let Ok(dist) = Normal::new(0.0, std_dev) {
                let mut rng = StdRng::seed_from_u64(seed);
                for v in intensity.iter_mut() {
                    *v += dist.sample(&mut rng);
                }
            }
        }

        RamanSpectrum::new(wavenumber, intensity)
    }

    fn drift_at(&self, x: f64) -> f64 {
        // Horner
        self.drift.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_and_background() {
        let synth = SyntheticSpectrum::new(0.0, 10.0, 11).with_drift(vec![1.0, 2.0, 0.5]);
        let x = synth.wavenumbers();
        assert_eq!(x.len(), 11);
        assert_eq!(x[4], 4.0);
        let bg = synth.background();
        assert_eq!(bg[2], 1.0 + 4.0 + 2.0);
    }

    #[test]
    fn test_peak_apex() {
        let spectrum = SyntheticSpectrum::new(0.0, 100.0, 101).with_peak(50.0, 2.0, 7.0).generate();
        assert_eq!(spectrum.intensity[50], 7.0);
        assert!(spectrum.intensity[0] < 1e-100);
    }

    #[test]
    fn test_noise_is_reproducible() {
        let synth = SyntheticSpectrum::new(0.0, 100.0, 101).with_noise(1.0, 5);
        assert_eq!(synth.generate(), synth.generate());
        let other = SyntheticSpectrum::new(0.0, 100.0, 101).with_noise(1.0, 6).generate();
        assert_ne!(synth.generate(), other);
    }

    #[test]
    fn test_degenerate_sigma() {
        assert_eq!(gaussian_profile(3.0, 3.0, 0.0, 2.0), 2.0);
        assert_eq!(gaussian_profile(3.5, 3.0, 0.0, 2.0), 0.0);
    }
}
