use log::{debug, info};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};

use crate::algorithm::baseline::ArplsConfig;
use crate::algorithm::peak::{PeakList, PeakSearchConfig};
use crate::data::spectrum::RamanSpectrum;
use crate::error::RamanError;

/// Configuration for preparing a spectrum before it is stored in a reference library
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumProcessingConfig {
    /// Scale intensities to a maximum of 1 before peak picking (default: true)
    pub normalize: bool,
    /// Minimum prominence of stored peaks, on the normalized scale when `normalize` is set (default: 0.05)
    pub prominence_threshold: f64,
    /// Subtract an arPLS baseline before peak picking (default: true)
    pub remove_bg: bool,
    /// Baseline parameters
    pub baseline: ArplsConfig,
}

impl Default for SpectrumProcessingConfig {
    fn default() -> Self {
        SpectrumProcessingConfig {
            normalize: true,
            prominence_threshold: 0.05,
            remove_bg: true,
            baseline: ArplsConfig::default(),
        }
    }
}

impl SpectrumProcessingConfig {
    /// Peak picking parameters derived from this configuration.
    pub fn peak_search(&self) -> PeakSearchConfig {
        PeakSearchConfig {
            prominence_threshold: self.prominence_threshold,
            remove_bg: self.remove_bg,
            baseline: self.baseline,
        }
    }
}

/// Represents a processed spectrum ready for storage and matching
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessedSpectrum {
    /// Identifier supplied by the caller (e.g. a file name)
    pub spec_id: String,
    /// Lowest wavenumber of the input spectrum
    pub min_wavenumber: f64,
    /// Highest wavenumber of the input spectrum
    pub max_wavenumber: f64,
    /// Peaks found on the (optionally normalized) spectrum
    pub peaks: PeakList,
}

/// Scale intensities so that the largest value becomes 1.
///
/// Spectra whose maximum is not a positive finite number are returned unchanged.
pub fn normalize_to_max(intensity: &[f64]) -> Vec<f64> {
    let max = intensity.iter().copied().map(OrderedFloat).max().map(|m| m.into_inner());
    match max {
        Some(m) if m > 0.0 && m.is_finite() => intensity.iter().map(|&i| i / m).collect(),
        _ => intensity.to_vec(),
    }
}

/// Process a single spectrum: optionally normalize, then pick peaks.
///
/// # Arguments
/// * `spec_id` - identifier carried into the result
/// * `spectrum` - wavenumbers and intensities
/// * `config` - processing configuration
///
/// # Returns
/// The spectrum's wavenumber range and its peak list. Peak heights refer to the
/// normalized intensities when `config.normalize` is set.
pub fn process_spectrum(
    spec_id: &str,
    spectrum: &RamanSpectrum,
    config: &SpectrumProcessingConfig,
) -> Result<ProcessedSpectrum, RamanError> {
    let (min_wavenumber, max_wavenumber) = spectrum
        .wavenumber_range()
        .ok_or_else(|| RamanError::invalid(format!("spectrum {} is empty", spec_id)))?;

    let peak_search = config.peak_search();
    let peaks = if config.normalize {
        spectrum.normalized().find_peaks(&peak_search)?
    } else {
        spectrum.find_peaks(&peak_search)?
    };

    debug!("{}: {} peaks in [{}, {}]", spec_id, peaks.len(), min_wavenumber, max_wavenumber);

    Ok(ProcessedSpectrum {
        spec_id: spec_id.to_string(),
        min_wavenumber,
        max_wavenumber,
        peaks,
    })
}

/// Process a batch of spectra in parallel.
///
/// # Arguments
/// * `spectra` - pairs of identifier and spectrum
/// * `config` - processing configuration
/// * `num_threads` - number of threads to use for parallel processing
///
/// # Returns
/// One result per input, in input order. The first invalid spectrum aborts the batch.
pub fn process_spectra_batch(
    spectra: &[(String, RamanSpectrum)],
    config: &SpectrumProcessingConfig,
    num_threads: usize,
) -> Result<Vec<ProcessedSpectrum>, RamanError> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| RamanError::ThreadPool(e.to_string()))?;

    info!("processing {} spectra on {} threads", spectra.len(), pool.current_num_threads());

    pool.install(|| {
        spectra
            .par_iter()
            .map(|(spec_id, spectrum)| process_spectrum(spec_id, spectrum, config))
            .collect()
    })
}
