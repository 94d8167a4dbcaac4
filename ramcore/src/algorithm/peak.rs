use itertools::izip;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::algorithm::baseline::{arpls, ArplsConfig};
use crate::error::RamanError;

/// Configuration for prominence based peak picking
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakSearchConfig {
    /// Minimum topographic prominence a local maximum needs to be reported (default: 0.05)
    pub prominence_threshold: f64,
    /// Subtract an arPLS baseline before searching (default: false)
    pub remove_bg: bool,
    /// Baseline parameters, only used when `remove_bg` is set
    pub baseline: ArplsConfig,
}

impl Default for PeakSearchConfig {
    fn default() -> Self {
        PeakSearchConfig {
            prominence_threshold: 0.05,
            remove_bg: false,
            baseline: ArplsConfig::default(),
        }
    }
}

impl PeakSearchConfig {
    pub fn validate(&self) -> Result<(), RamanError> {
        if !(self.prominence_threshold >= 0.0) || !self.prominence_threshold.is_finite() {
            return Err(RamanError::invalid(format!(
                "prominence threshold must be finite and non-negative, got {}",
                self.prominence_threshold
            )));
        }
        if self.remove_bg {
            self.baseline.validate()?;
        }
        Ok(())
    }
}

/// A single detected peak.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Wavenumber of the local maximum
    pub position: f64,
    /// Intensity of the uncorrected spectrum at `position`
    pub height: f64,
    pub prominence: f64,
}

/// Detected peaks as parallel arrays, ordered by wavenumber.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakList {
    pub positions: Vec<f64>,
    pub heights: Vec<f64>,
    pub prominences: Vec<f64>,
}

impl PeakList {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn push(&mut self, peak: Peak) {
        self.positions.push(peak.position);
        self.heights.push(peak.height);
        self.prominences.push(peak.prominence);
    }

    pub fn iter(&self) -> impl Iterator<Item = Peak> + '_ {
        izip!(&self.positions, &self.heights, &self.prominences).map(|(&position, &height, &prominence)| Peak {
            position,
            height,
            prominence,
        })
    }

    pub fn to_peaks(&self) -> Vec<Peak> {
        self.iter().collect()
    }
}

impl FromIterator<Peak> for PeakList {
    fn from_iter<I: IntoIterator<Item = Peak>>(iter: I) -> Self {
        let mut list = PeakList::default();
        for peak in iter {
            list.push(peak);
        }
        list
    }
}

/// Prominences of a set of peaks together with the sample where each one's
/// lowest contour was found on either side.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PeakProminences {
    pub prominences: Vec<f64>,
    pub left_bases: Vec<usize>,
    pub right_bases: Vec<usize>,
}

/// Finds the peaks of a spectrum and reports position, height and prominence.
///
/// # Arguments
///
/// * `xx` - Wavenumbers, ascending.
/// * `yy` - Intensities, same length as `xx`.
/// * `config` - Prominence threshold and optional background removal.
///
/// # Returns
///
/// The peaks whose prominence reaches the threshold. Heights are always read from
/// `yy`, prominences from the signal the search ran on. Spectra with fewer than 3
/// samples have no interior maxima and yield an empty list.
///
/// # Errors
///
/// `InvalidInput` when the lengths differ, the input is empty or the
/// configuration is out of range.
///
/// # Example
///
/// ```rust
/// # use ramcore::algorithm::peak::{find_peak_positions, PeakSearchConfig};
/// let xx = vec![100.0, 101.0, 102.0, 103.0, 104.0];
/// let yy = vec![0.0, 0.2, 1.0, 0.3, 0.0];
/// let peaks = find_peak_positions(&xx, &yy, &PeakSearchConfig::default()).unwrap();
/// assert_eq!(peaks.positions, vec![102.0]);
/// assert_eq!(peaks.heights, vec![1.0]);
/// assert_eq!(peaks.prominences, vec![1.0]);
/// ```
pub fn find_peak_positions(xx: &[f64], yy: &[f64], config: &PeakSearchConfig) -> Result<PeakList, RamanError> {
    if xx.len() != yy.len() {
        return Err(RamanError::invalid(format!(
            "wavenumber and intensity lengths differ: {} vs {}",
            xx.len(),
            yy.len()
        )));
    }
    if yy.is_empty() {
        return Err(RamanError::invalid("spectrum is empty"));
    }
    config.validate()?;

    if yy.len() < 3 {
        return Ok(PeakList::default());
    }

    let signal: Vec<f64> = if config.remove_bg {
        let background = arpls(yy, &config.baseline)?;
        yy.iter().zip(&background).map(|(y, b)| y - b).collect()
    } else {
        yy.to_vec()
    };

    let candidates = local_maxima(&signal);
    let prominences = peak_prominences(&signal, &candidates).prominences;

    let peaks: PeakList = candidates
        .iter()
        .zip(prominences)
        .filter(|(_, prominence)| *prominence >= config.prominence_threshold)
        .map(|(&i, prominence)| Peak { position: xx[i], height: yy[i], prominence })
        .collect();

    debug!(
        "found {} of {} local maxima with prominence >= {}",
        peaks.len(),
        candidates.len(),
        config.prominence_threshold
    );

    Ok(peaks)
}

/// Indices of interior local maxima, in ascending order.
///
/// A sample is a maximum if it is strictly higher than both neighbours. A flat run
/// of equal samples that is strictly higher than the samples on both ends counts as
/// one maximum located at `(first + last) / 2`, which picks the left of the two
/// middle samples for runs of even length. The first and last samples are never
/// maxima.
///
/// # Example
///
/// ```rust
/// # use ramcore::algorithm::peak::local_maxima;
/// assert_eq!(local_maxima(&[0.0, 2.0, 1.0, 3.0, 3.0, 3.0, 3.0, 0.0]), vec![1, 4]);
/// ```
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut maxima = Vec::new();
    if n < 3 {
        return maxima;
    }

    let last = n - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Topographic prominence of each peak in `peaks`.
///
/// From the peak, walk left until a strictly higher sample or the border is met and
/// remember the lowest sample on the way; do the same to the right. The prominence
/// is the peak height minus the higher of both minima.
pub fn peak_prominences(signal: &[f64], peaks: &[usize]) -> PeakProminences {
    let n = signal.len();
    let mut out = PeakProminences {
        prominences: Vec::with_capacity(peaks.len()),
        left_bases: Vec::with_capacity(peaks.len()),
        right_bases: Vec::with_capacity(peaks.len()),
    };

    for &peak in peaks {
        let apex = signal[peak];

        let mut left_base = peak;
        let mut left_min = apex;
        let mut l = peak;
        while l > 0 {
            l -= 1;
            if signal[l] > apex {
                break;
            }
            if signal[l] < left_min {
                left_min = signal[l];
                left_base = l;
            }
        }

        let mut right_base = peak;
        let mut right_min = apex;
        let mut r = peak;
        while r + 1 < n {
            r += 1;
            if signal[r] > apex {
                break;
            }
            if signal[r] < right_min {
                right_min = signal[r];
                right_base = r;
            }
        }

        out.prominences.push(apex - left_min.max(right_min));
        out.left_bases.push(left_base);
        out.right_bases.push(right_base);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{gaussian_profile, SyntheticSpectrum};

    fn axis(n: usize) -> Vec<f64> {
        (0..n).map(|i| 200.0 + 2.0 * i as f64).collect()
    }

    fn config(threshold: f64, remove_bg: bool) -> PeakSearchConfig {
        PeakSearchConfig { prominence_threshold: threshold, remove_bg, ..Default::default() }
    }

    #[test]
    fn test_single_gaussian_peak() {
        let n = 201;
        let xx = axis(n);
        let yy: Vec<f64> = (0..n).map(|i| gaussian_profile(i as f64, 120.0, 3.0, 5.0)).collect();

        let peaks = find_peak_positions(&xx, &yy, &config(1.0, false)).unwrap();

        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks.positions[0], xx[120]);
        assert!((peaks.heights[0] - 5.0).abs() < 1e-12);
        assert!((peaks.prominences[0] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_two_peaks_prominence_and_bases() {
        let signal = vec![0.0, 3.0, 1.0, 5.0, 2.0, 4.0, 0.5];
        let peaks = local_maxima(&signal);
        assert_eq!(peaks, vec![1, 3, 5]);

        let result = peak_prominences(&signal, &peaks);
        // the highest peak only has to descend to the higher of both borders
        assert_eq!(result.prominences, vec![2.0, 4.5, 2.0]);
        assert_eq!(result.left_bases, vec![0, 0, 4]);
        assert_eq!(result.right_bases, vec![2, 6, 6]);
    }

    #[test]
    fn test_monotonic_signals_have_no_peaks() {
        let up: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let down: Vec<f64> = up.iter().rev().copied().collect();
        let xx = axis(50);
        assert!(find_peak_positions(&xx, &up, &config(0.0, false)).unwrap().is_empty());
        assert!(find_peak_positions(&xx, &down, &config(0.0, false)).unwrap().is_empty());
    }

    #[test]
    fn test_plateau_midpoint() {
        // odd width: run [3, 7] -> 5
        let odd = vec![0.0, 1.0, 2.0, 4.0, 4.0, 4.0, 4.0, 4.0, 2.0, 1.0];
        assert_eq!(local_maxima(&odd), vec![5]);

        // even width: run [2, 5] -> 3
        let even = vec![0.0, 1.0, 4.0, 4.0, 4.0, 4.0, 1.0, 0.0];
        assert_eq!(local_maxima(&even), vec![3]);

        let xx = axis(even.len());
        let peaks = find_peak_positions(&xx, &even, &config(0.0, false)).unwrap();
        assert_eq!(peaks.positions, vec![xx[3]]);
        assert_eq!(peaks.prominences, vec![4.0]);
    }

    #[test]
    fn test_plateau_touching_border_or_rising_is_not_a_peak() {
        assert!(local_maxima(&[0.0, 2.0, 2.0, 2.0]).is_empty());
        assert!(local_maxima(&[0.0, 2.0, 2.0, 3.0, 1.0]) == vec![3]);
        assert!(local_maxima(&[1.0, 1.0, 1.0, 1.0]).is_empty());
    }

    #[test]
    fn test_flat_signal() {
        let xx = axis(100);
        let yy = vec![3.0; 100];
        for remove_bg in [false, true] {
            let peaks = find_peak_positions(&xx, &yy, &config(0.01, remove_bg)).unwrap();
            assert!(peaks.is_empty());
        }
    }

    #[test]
    fn test_threshold_monotonicity() {
        let spectrum = SyntheticSpectrum::new(200.0, 1200.0, 1001)
            .with_drift(vec![5.0, 0.01])
            .with_peak(350.0, 4.0, 10.0)
            .with_peak(600.0, 9.0, 3.0)
            .with_peak(900.0, 6.0, 6.0)
            .with_noise(0.2, 3)
            .generate();

        let mut last = usize::MAX;
        for threshold in [0.0, 0.1, 0.5, 1.0, 2.0, 5.0, 8.0, 20.0] {
            let count = find_peak_positions(&spectrum.wavenumber, &spectrum.intensity, &config(threshold, true))
                .unwrap()
                .len();
            assert!(count <= last, "threshold {} returned {} > {}", threshold, count, last);
            last = count;
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn test_background_removal_recovers_prominence() {
        // steep fluorescence ramp: on the raw signal the left flank never drops back
        // to the foot of the peak, so its prominence is badly underestimated
        let true_height = 10.0;
        let n = 1001;
        let xx: Vec<f64> = (0..n).map(|i| 400.0 + i as f64).collect();
        let yy: Vec<f64> = xx
            .iter()
            .map(|&x| 0.5 * (x - 400.0) + gaussian_profile(x, 1100.0, 5.0, true_height))
            .collect();

        let with_bg = find_peak_positions(&xx, &yy, &config(1.0, true)).unwrap();
        let without_bg = find_peak_positions(&xx, &yy, &config(1.0, false)).unwrap();

        let prominence_at = |peaks: &PeakList| {
            peaks.iter().find(|p| (p.position - 1100.0).abs() < 3.0).map(|p| p.prominence)
        };
        let recovered = prominence_at(&with_bg).expect("peak found after background removal");
        let raw = prominence_at(&without_bg).expect("peak found on raw signal");

        assert!((recovered - true_height).abs() < (raw - true_height).abs());
        assert!((recovered - true_height).abs() < 1.5);

        // heights come from the uncorrected intensities
        let peak = with_bg.iter().find(|p| (p.position - 1100.0).abs() < 3.0).unwrap();
        let idx = xx.iter().position(|&x| x == peak.position).unwrap();
        assert_eq!(peak.height, yy[idx]);
    }

    #[test]
    fn test_zero_threshold_returns_every_maximum() {
        let signal = vec![0.0, 1.0, 0.9, 1.0, 0.95, 1.2, 1.2, 0.0, 0.0];
        let xx = axis(signal.len());
        let peaks = find_peak_positions(&xx, &signal, &config(0.0, false)).unwrap();
        assert_eq!(peaks.len(), local_maxima(&signal).len());
        assert_eq!(peaks.len(), 3);
    }

    #[test]
    fn test_short_and_invalid_input() {
        let cfg = PeakSearchConfig::default();
        assert!(find_peak_positions(&[1.0], &[1.0], &cfg).unwrap().is_empty());
        assert!(find_peak_positions(&[1.0, 2.0], &[3.0, 1.0], &config(0.0, true)).unwrap().is_empty());

        assert!(matches!(find_peak_positions(&[], &[], &cfg), Err(RamanError::InvalidInput(_))));
        assert!(matches!(
            find_peak_positions(&[1.0, 2.0, 3.0], &[1.0, 2.0], &cfg),
            Err(RamanError::InvalidInput(_))
        ));
        assert!(matches!(
            find_peak_positions(&[1.0, 2.0, 3.0], &[1.0, 2.0, 1.0], &config(-1.0, false)),
            Err(RamanError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_shape_and_determinism() {
        let spectrum = SyntheticSpectrum::new(100.0, 1800.0, 1500)
            .with_drift(vec![50.0, 0.02])
            .with_peak(400.0, 6.0, 30.0)
            .with_peak(1200.0, 3.0, 12.0)
            .with_noise(0.3, 11)
            .generate();
        let cfg = config(0.5, true);
        let a = find_peak_positions(&spectrum.wavenumber, &spectrum.intensity, &cfg).unwrap();
        let b = find_peak_positions(&spectrum.wavenumber, &spectrum.intensity, &cfg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.positions.len(), a.heights.len());
        assert_eq!(a.heights.len(), a.prominences.len());
        assert!(a.positions.windows(2).all(|w| w[0] < w[1]));
        assert!(a.positions.iter().all(|p| spectrum.wavenumber.contains(p)));
    }

    #[test]
    fn test_peak_list_from_peaks() {
        let peaks = vec![
            Peak { position: 1.0, height: 2.0, prominence: 0.5 },
            Peak { position: 3.0, height: 4.0, prominence: 1.5 },
        ];
        let list: PeakList = peaks.iter().copied().collect();
        assert_eq!(list.positions, vec![1.0, 3.0]);
        assert_eq!(list.to_peaks(), peaks);
    }
}
