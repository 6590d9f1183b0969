use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Parameters shared by every comparison of a library search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfiguration {
    /// Two masses closer than this are aligned onto the same axis position (Da).
    pub mass_tolerance: f64,
    /// Minimum normalized intensity (percent of the spectrum's base peak) for a peak to be significant.
    pub baseline_threshold: f64,
    /// Inclusive mass window `(lo, hi)` considered for scoring.
    pub mass_window: (f64, f64),
    /// Minimum mass included in scoring.
    pub x_threshold: f64,
    /// Number of search workers. `None` uses one worker per available core.
    pub num_threads: Option<usize>,
    /// Number of hits attached to an identification.
    pub top_n: usize,
}

impl SearchConfiguration {
    /// Creates a new configuration with the default worker count and number of hits.
    ///
    /// Arguments:
    /// * `mass_tolerance` - Mass tolerance for peak alignment.
    /// * `baseline_threshold` - Baseline intensity threshold in percent.
    /// * `mass_window` - Inclusive mass window.
    /// * `x_threshold` - Minimum mass to include.
    ///
    pub fn new(
        mass_tolerance: f64,
        baseline_threshold: f64,
        mass_window: (f64, f64),
        x_threshold: f64,
    ) -> Self {
        Self {
            mass_tolerance,
            baseline_threshold,
            mass_window,
            x_threshold,
            ..Self::default()
        }
    }

    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = Some(num_threads);
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Lower mass bound actually applied, combining the window and `x_threshold`.
    pub fn lower_mass_bound(&self) -> f64 {
        self.mass_window.0.max(self.x_threshold)
    }

    /// Checks the parameters before any computation takes place.
    pub fn validate(&self) -> Result<(), Error> {
        if !self.mass_tolerance.is_finite() || self.mass_tolerance <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "mass tolerance must be positive, got {}",
                self.mass_tolerance
            )));
        }
        if !(0.0..=100.0).contains(&self.baseline_threshold) {
            return Err(Error::InvalidParameter(format!(
                "baseline threshold must be within 0 and 100 percent, got {}",
                self.baseline_threshold
            )));
        }
        let (lo, hi) = self.mass_window;
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(Error::InvalidParameter(format!(
                "mass window ({lo}, {hi}) is not a valid range"
            )));
        }
        if self.x_threshold.is_nan() || self.x_threshold < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "x_threshold must be >= 0, got {}",
                self.x_threshold
            )));
        }
        if self.num_threads == Some(0) {
            return Err(Error::InvalidParameter(
                "number of search workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SearchConfiguration {
    fn default() -> Self {
        Self {
            mass_tolerance: 0.25,
            baseline_threshold: 10.0,
            mass_window: (50.0, 1200.0),
            x_threshold: 0.0,
            num_threads: None,
            top_n: 5,
        }
    }
}
