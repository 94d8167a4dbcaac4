use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use bincode::{Decode, Encode};
use serde::{Serialize, Deserialize};

use crate::algorithm::baseline::{arpls, arpls_fit, ArplsConfig, BaselineFit};
use crate::algorithm::peak::{find_peak_positions, PeakList, PeakSearchConfig};
use crate::error::RamanError;
use crate::processing::normalize_to_max;

/// Represents a Raman spectrum with associated wavenumbers (cm⁻¹) and intensities.
///
/// Uses Arc<Vec<T>> for efficient cloning - clone is O(1) instead of O(n).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RamanSpectrum {
    pub wavenumber: Arc<Vec<f64>>,
    pub intensity: Arc<Vec<f64>>,
}

// Manual bincode implementation for Arc compatibility
impl Encode for RamanSpectrum {
    fn encode<E: bincode::enc::Encoder>(&self, encoder: &mut E) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&*self.wavenumber, encoder)?;
        bincode::Encode::encode(&*self.intensity, encoder)?;
        Ok(())
    }
}

impl<Context> Decode<Context> for RamanSpectrum {
    fn decode<D: bincode::de::Decoder<Context = Context>>(decoder: &mut D) -> Result<Self, bincode::error::DecodeError> {
        let wavenumber: Vec<f64> = bincode::Decode::decode(decoder)?;
        let intensity: Vec<f64> = bincode::Decode::decode(decoder)?;
        Ok(RamanSpectrum::new(wavenumber, intensity))
    }
}

impl<'de, Context> bincode::BorrowDecode<'de, Context> for RamanSpectrum {
    fn borrow_decode<D: bincode::de::BorrowDecoder<'de, Context = Context>>(decoder: &mut D) -> Result<Self, bincode::error::DecodeError> {
        let wavenumber: Vec<f64> = bincode::BorrowDecode::borrow_decode(decoder)?;
        let intensity: Vec<f64> = bincode::BorrowDecode::borrow_decode(decoder)?;
        Ok(RamanSpectrum::new(wavenumber, intensity))
    }
}

impl RamanSpectrum {
    /// Constructs a new `RamanSpectrum` without checking its inputs.
    ///
    /// # Arguments
    ///
    /// * `wavenumber` - A vector of wavenumbers, ascending.
    /// * `intensity` - A vector of intensity values corresponding to the wavenumbers.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use ramcore::data::spectrum::RamanSpectrum;
    /// let spectrum = RamanSpectrum::new(vec![100.0, 200.0], vec![10.0, 20.0]);
    /// assert_eq!(*spectrum.wavenumber, vec![100.0, 200.0]);
    /// assert_eq!(*spectrum.intensity, vec![10.0, 20.0]);
    /// ```
    pub fn new(wavenumber: Vec<f64>, intensity: Vec<f64>) -> Self {
        RamanSpectrum {
            wavenumber: Arc::new(wavenumber),
            intensity: Arc::new(intensity),
        }
    }

    /// Constructs a new `RamanSpectrum`, rejecting empty input, unequal lengths and
    /// wavenumbers that are not strictly increasing.
    pub fn try_new(wavenumber: Vec<f64>, intensity: Vec<f64>) -> Result<Self, RamanError> {
        if wavenumber.len() != intensity.len() {
            return Err(RamanError::invalid(format!(
                "wavenumber and intensity lengths differ: {} vs {}",
                wavenumber.len(),
                intensity.len()
            )));
        }
        if wavenumber.is_empty() {
            return Err(RamanError::invalid("spectrum is empty"));
        }
        if let Some(i) = wavenumber.windows(2).position(|w| !(w[0] < w[1])) {
            return Err(RamanError::invalid(format!("wavenumbers not strictly increasing at index {}", i + 1)));
        }
        Ok(RamanSpectrum::new(wavenumber, intensity))
    }

    pub fn len(&self) -> usize {
        self.wavenumber.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavenumber.is_empty()
    }

    /// First and last wavenumber, `None` for an empty spectrum.
    pub fn wavenumber_range(&self) -> Option<(f64, f64)> {
        Some((*self.wavenumber.first()?, *self.wavenumber.last()?))
    }

    /// Keeps the samples inside both the wavenumber and the intensity window (bounds inclusive).
    pub fn filter_ranged(&self, wavenumber_min: f64, wavenumber_max: f64, intensity_min: f64, intensity_max: f64) -> Self {
        let mut wavenumber_vec: Vec<f64> = Vec::new();
        let mut intensity_vec: Vec<f64> = Vec::new();

        for (wavenumber, intensity) in self.wavenumber.iter().zip(self.intensity.iter()) {
            if wavenumber_min <= *wavenumber && *wavenumber <= wavenumber_max && *intensity >= intensity_min && *intensity <= intensity_max {
                wavenumber_vec.push(*wavenumber);
                intensity_vec.push(*intensity);
            }
        }
        RamanSpectrum::new(wavenumber_vec, intensity_vec)
    }

    /// Intensities scaled so that the largest one becomes 1.
    pub fn normalized(&self) -> Self {
        RamanSpectrum {
            wavenumber: self.wavenumber.clone(),
            intensity: Arc::new(normalize_to_max(&self.intensity)),
        }
    }

    /// arPLS background of this spectrum.
    pub fn baseline(&self, config: &ArplsConfig) -> Result<Vec<f64>, RamanError> {
        arpls(&self.intensity, config)
    }

    /// arPLS background together with the number of iterations run and whether the
    /// weights settled before `config.itermax`.
    pub fn baseline_fit(&self, config: &ArplsConfig) -> Result<BaselineFit, RamanError> {
        arpls_fit(&self.intensity, config)
    }

    /// The spectrum with its arPLS background subtracted.
    pub fn baseline_corrected(&self, config: &ArplsConfig) -> Result<Self, RamanError> {
        let background = self.baseline(config)?;
        let corrected = self.intensity.iter().zip(background).map(|(y, b)| y - b).collect();
        Ok(RamanSpectrum {
            wavenumber: self.wavenumber.clone(),
            intensity: Arc::new(corrected),
        })
    }

    /// Peak positions, heights and prominences, see [`find_peak_positions`].
    ///
    /// # Example
    ///
    /// ```rust
    /// # use ramcore::data::spectrum::RamanSpectrum;
    /// # use ramcore::algorithm::peak::PeakSearchConfig;
    /// let spectrum = RamanSpectrum::new(vec![10.0, 11.0, 12.0, 13.0], vec![0.0, 1.0, 0.2, 0.0]);
    /// let peaks = spectrum.find_peaks(&PeakSearchConfig::default()).unwrap();
    /// assert_eq!(peaks.positions, vec![11.0]);
    /// ```
    pub fn find_peaks(&self, config: &PeakSearchConfig) -> Result<PeakList, RamanError> {
        find_peak_positions(&self.wavenumber, &self.intensity, config)
    }
}

/// Formats the `RamanSpectrum` for display.
impl Display for RamanSpectrum {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let max = self.wavenumber.iter()
            .zip(self.intensity.iter())
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));

        match max {
            Some((x, i)) => write!(f, "RamanSpectrum(data points: {}, max by intensity:({:.2}, {}))", self.len(), x, i),
            None => write!(f, "RamanSpectrum(data points: 0)"),
        }
    }
}
