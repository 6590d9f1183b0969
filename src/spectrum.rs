use ndarray::Array1;

use crate::{configuration::SearchConfiguration, error::Error};

/// CAS number reported when a spectrum has none or only a placeholder.
pub const UNKNOWN_CAS: &str = "---";

/// Placeholder some libraries use instead of leaving the CAS number empty.
const PLACEHOLDER_CAS: &str = "0-00-0";

/// Normalized intensities are scaled to this value at the base peak.
const NORMALIZED_MAX_INTENSITY: f64 = 100.0;

/// Maps a missing, empty or placeholder CAS number onto [`UNKNOWN_CAS`].
pub fn normalize_cas(cas: Option<&str>) -> String {
    match cas.map(str::trim) {
        None | Some("") | Some(PLACEHOLDER_CAS) => UNKNOWN_CAS.to_string(),
        Some(cas) => cas.to_string(),
    }
}

/// A named mass spectrum, either the unknown or a reference library entry.
///
/// Masses are neither required to be sorted nor unique. Nothing is validated on
/// construction, library readers hand over whatever they parsed and the spectrum is
/// checked once it is prepared for scoring (see [`SignificantPeaks::from_spectrum`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    pub mz: Array1<f64>,
    pub intensity: Array1<f64>,
    pub name: String,
    pub cas: Option<String>,
    pub library: Option<String>,
}

impl Spectrum {
    /// Creates a new spectrum without metadata.
    ///
    /// Arguments:
    /// * `name` - Title of the spectrum, e.g. the compound name of a library entry.
    /// * `mz` - Mass values.
    /// * `intensity` - Intensities, one per mass value.
    ///
    pub fn new(name: impl Into<String>, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            mz: Array1::from(mz),
            intensity: Array1::from(intensity),
            name: name.into(),
            cas: None,
            library: None,
        }
    }

    pub fn with_cas(mut self, cas: impl Into<String>) -> Self {
        self.cas = Some(cas.into());
        self
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    pub fn normalized_cas(&self) -> String {
        normalize_cas(self.cas.as_deref())
    }

    pub fn library_name(&self) -> &str {
        self.library.as_deref().unwrap_or_default()
    }

    /// Checks that the spectrum can be normalized.
    pub fn validate(&self) -> Result<(), Error> {
        if self.mz.len() != self.intensity.len() {
            return Err(Error::SpectrumShape(self.mz.len(), self.intensity.len()));
        }
        if self.mz.is_empty() {
            return Err(Error::EmptySpectrum);
        }
        if let Some(mz) = self.mz.iter().find(|mz| !mz.is_finite()) {
            return Err(Error::InvalidMass(*mz));
        }
        if let Some(intensity) = self
            .intensity
            .iter()
            .find(|intensity| !intensity.is_finite() || **intensity < 0.0)
        {
            return Err(Error::InvalidIntensity(*intensity));
        }
        if !self.intensity.iter().any(|intensity| *intensity > 0.0) {
            return Err(Error::NoPositiveIntensity);
        }
        Ok(())
    }

    /// Intensities scaled to 0-100 relative to the base peak of the whole spectrum.
    pub fn normalized_intensities(&self) -> Result<Array1<f64>, Error> {
        self.validate()?;
        let max_intensity = self
            .intensity
            .iter()
            .fold(f64::NEG_INFINITY, |acc, &x| acc.max(x));
        Ok(self
            .intensity
            .mapv(|intensity| intensity / max_intensity * NORMALIZED_MAX_INTENSITY))
    }
}

/// Peaks of a spectrum which take part in scoring: normalized, restricted to the mass
/// window and above the baseline threshold. Sorted by mass.
#[derive(Debug, Clone, PartialEq)]
pub struct SignificantPeaks {
    pub mz: Array1<f64>,
    pub intensity: Array1<f64>,
}

impl SignificantPeaks {
    /// Extracts the significant peaks of a spectrum.
    ///
    /// Arguments:
    /// * `spectrum` - Spectrum to prepare.
    /// * `config` - Provides the mass window, `x_threshold` and baseline threshold.
    ///
    pub fn from_spectrum(spectrum: &Spectrum, config: &SearchConfiguration) -> Result<Self, Error> {
        let normalized = spectrum.normalized_intensities()?;
        let lower_bound = config.lower_mass_bound();
        let upper_bound = config.mass_window.1;

        let mut peaks = spectrum
            .mz
            .iter()
            .zip(normalized.iter())
            .filter(|(&mz, &intensity)| {
                mz >= lower_bound && mz <= upper_bound && intensity >= config.baseline_threshold
            })
            .map(|(&mz, &intensity)| (mz, intensity))
            .collect::<Vec<(f64, f64)>>();

        peaks.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (mz, intensity): (Vec<f64>, Vec<f64>) = peaks.into_iter().unzip();
        Ok(Self {
            mz: Array1::from(mz),
            intensity: Array1::from(intensity),
        })
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_cas() {
        assert_eq!(normalize_cas(None), UNKNOWN_CAS);
        assert_eq!(normalize_cas(Some("")), UNKNOWN_CAS);
        assert_eq!(normalize_cas(Some("0-00-0")), UNKNOWN_CAS);
        assert_eq!(normalize_cas(Some("84-74-2")), "84-74-2");
    }

    #[test]
    fn test_normalized_intensities() {
        let spectrum = Spectrum::new("test", vec![50.0, 60.0, 70.0], vec![20.0, 40.0, 10.0]);
        let normalized = spectrum.normalized_intensities().unwrap();
        assert_eq!(normalized, Array1::from(vec![50.0, 100.0, 25.0]));
    }

    #[test]
    fn test_normalized_intensities_near_f64_max() {
        let spectrum = Spectrum::new("intense", vec![60.0, 80.0], vec![1e307, 5e306]);
        let normalized = spectrum.normalized_intensities().unwrap();
        assert!(normalized.iter().all(|intensity| intensity.is_finite()));
        assert!((normalized[0] - 100.0).abs() < 1e-9);
        assert!((normalized[1] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate() {
        let shape = Spectrum::new("shape", vec![50.0, 60.0], vec![1.0]);
        assert!(matches!(shape.validate(), Err(Error::SpectrumShape(2, 1))));

        let empty = Spectrum::new("empty", vec![], vec![]);
        assert!(matches!(empty.validate(), Err(Error::EmptySpectrum)));

        let negative = Spectrum::new("negative", vec![50.0, 60.0], vec![1.0, -1.0]);
        assert!(matches!(negative.validate(), Err(Error::InvalidIntensity(_))));

        let flat = Spectrum::new("flat", vec![50.0, 60.0], vec![0.0, 0.0]);
        assert!(matches!(flat.validate(), Err(Error::NoPositiveIntensity)));

        let nan_mass = Spectrum::new("nan", vec![f64::NAN, 60.0], vec![1.0, 1.0]);
        assert!(matches!(nan_mass.validate(), Err(Error::InvalidMass(_))));
    }

    #[test]
    fn test_significant_peaks_window_and_baseline() {
        // base peak at 40 lies outside the window but still defines the normalization
        let spectrum = Spectrum::new(
            "test",
            vec![120.0, 40.0, 60.0, 1300.0, 90.0],
            vec![50.0, 100.0, 5.0, 80.0, 20.0],
        );
        let peaks = SignificantPeaks::from_spectrum(&spectrum, &SearchConfiguration::default())
            .unwrap();
        assert_eq!(peaks.mz, Array1::from(vec![90.0, 120.0]));
        assert_eq!(peaks.intensity, Array1::from(vec![20.0, 50.0]));
    }

    #[test]
    fn test_significant_peaks_x_threshold() {
        let spectrum = Spectrum::new("test", vec![60.0, 90.0, 120.0], vec![100.0, 100.0, 100.0]);
        let config = SearchConfiguration::new(0.25, 10.0, (50.0, 1200.0), 100.0);
        let peaks = SignificantPeaks::from_spectrum(&spectrum, &config).unwrap();
        assert_eq!(peaks.mz, Array1::from(vec![120.0]));
    }
}
