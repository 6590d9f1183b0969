//! Outlier filters for replicate measurements.
//!
//! Replicate values such as the retention times of the same compound across several runs are
//! passed as `Option<f64>`. Missing values (`None`), zeros and NaN mean "no measurement" and are
//! removed before any statistic is computed. The filters split the cleaned values into excluded
//! and retained values, both in encounter order.
//!
//! Return conventions:
//! * Fewer than two raw values is an [`Error::DatasetTooSmall`] for every filter.
//! * Nothing left after cleaning is `Ok(None)` for the filters, `Ok(f64::NAN)` for
//!   [`percentile`] and [`interquartile_range`] and `0.0` for [`median`].

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default cutoff of the MAD filter.
pub const DEFAULT_MAD_CUTOFF: f64 = 3.0;

/// Default multiple of the standard deviation.
pub const DEFAULT_STDEV_MULTIPLE: u32 = 2;

/// Fence distance of the quartile filter and the extreme fence of the SPSS filter, in IQRs.
const EXTREME_FENCE: f64 = 3.0;

/// Outlier fence of the SPSS filter, in IQRs.
const OUTLIER_FENCE: f64 = 1.5;

/// Values split into excluded and retained ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierPartition {
    pub excluded: Vec<f64>,
    pub retained: Vec<f64>,
}

/// SPSS style split into extremes (beyond 3 IQR), outliers (beyond 1.5 IQR) and retained values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TieredPartition {
    pub extremes: Vec<f64>,
    pub outliers: Vec<f64>,
    pub retained: Vec<f64>,
}

impl From<TieredPartition> for OutlierPartition {
    /// Extremes followed by outliers become the excluded values.
    fn from(tiered: TieredPartition) -> Self {
        let mut excluded = tiered.extremes;
        excluded.extend(tiered.outliers);
        Self {
            excluded,
            retained: tiered.retained,
        }
    }
}

/// Removes missing values, then zeros and NaN.
pub fn clean(dataset: &[Option<f64>]) -> Vec<f64> {
    dataset
        .iter()
        .flatten()
        .copied()
        .filter(|value| *value != 0.0 && !value.is_nan())
        .collect()
}

fn ensure_min_size(len: usize) -> Result<(), Error> {
    if len < 2 {
        return Err(Error::DatasetTooSmall(len));
    }
    Ok(())
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Median of already cleaned values. `values` must not be empty.
fn median_of(values: &[f64]) -> f64 {
    let sorted = sorted(values);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percentile with linear interpolation between the closest ranks. `values` must not be empty.
fn percentile_of(values: &[f64], percentage: f64) -> f64 {
    let sorted = sorted(values);
    let position = percentage / 100.0 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn quartiles_of(values: &[f64]) -> (f64, f64) {
    (percentile_of(values, 25.0), percentile_of(values, 75.0))
}

fn partition_by(values: Vec<f64>, is_excluded: impl Fn(f64) -> bool) -> OutlierPartition {
    let (excluded, retained): (Vec<f64>, Vec<f64>) =
        values.into_iter().partition(|value| is_excluded(*value));
    OutlierPartition { excluded, retained }
}

/// Median absolute deviation based filter.
///
/// A value is excluded when `|x - median| / MAD` exceeds `cutoff`. With a MAD of zero every
/// value differing from the median is excluded.
///
/// # Arguments
/// * `dataset` - Raw replicate values.
/// * `cutoff` - Robust z-score above which a value is excluded.
///
pub fn mad_outliers(
    dataset: &[Option<f64>],
    cutoff: f64,
) -> Result<Option<OutlierPartition>, Error> {
    ensure_min_size(dataset.len())?;
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(None);
    }

    let median = median_of(&values);
    let mad = median_of(&values.iter().map(|x| (x - median).abs()).collect::<Vec<f64>>());

    Ok(Some(partition_by(values, |x| {
        let deviation = (x - median).abs();
        if mad == 0.0 {
            deviation > 0.0
        } else {
            deviation / mad > cutoff
        }
    })))
}

/// Excludes values outside `mean ± k · s`, with `s` the sample standard deviation.
///
/// # Arguments
/// * `dataset` - Raw replicate values.
/// * `k` - Multiple of the standard deviation.
///
pub fn stdev_outliers(dataset: &[Option<f64>], k: u32) -> Result<Option<OutlierPartition>, Error> {
    ensure_min_size(dataset.len())?;
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(None);
    }
    if values.len() < 2 {
        // no spread to measure
        return Ok(Some(OutlierPartition {
            excluded: Vec::new(),
            retained: values,
        }));
    }

    let array = Array1::from(values);
    let mean = array.mean().unwrap_or(f64::NAN);
    let spread = array.std(1.0) * k as f64;
    let (lower, upper) = (mean - spread, mean + spread);

    Ok(Some(partition_by(array.to_vec(), |x| x < lower || x > upper)))
}

/// [`stdev_outliers`] with two standard deviations.
pub fn two_stdev_outliers(dataset: &[Option<f64>]) -> Result<Option<OutlierPartition>, Error> {
    stdev_outliers(dataset, DEFAULT_STDEV_MULTIPLE)
}

/// Excludes values outside `Q3 ± 3 · IQR`.
///
/// Both fences are anchored at the third quartile.
pub fn quartile_outliers(dataset: &[Option<f64>]) -> Result<Option<OutlierPartition>, Error> {
    ensure_min_size(dataset.len())?;
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(None);
    }

    let (q1, q3) = quartiles_of(&values);
    let iqr = q3 - q1;
    let (lower, upper) = (q3 - EXTREME_FENCE * iqr, q3 + EXTREME_FENCE * iqr);

    Ok(Some(partition_by(values, |x| x < lower || x > upper)))
}

/// SPSS style three way split using Tukey fences at 1.5 and 3 IQR.
pub fn spss_outliers(dataset: &[Option<f64>]) -> Result<Option<TieredPartition>, Error> {
    ensure_min_size(dataset.len())?;
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(None);
    }

    let (q1, q3) = quartiles_of(&values);
    let iqr = q3 - q1;

    let mut partition = TieredPartition::default();
    for x in values {
        if x < q1 - EXTREME_FENCE * iqr || x > q3 + EXTREME_FENCE * iqr {
            partition.extremes.push(x);
        } else if x < q1 - OUTLIER_FENCE * iqr || x > q3 + OUTLIER_FENCE * iqr {
            partition.outliers.push(x);
        } else {
            partition.retained.push(x);
        }
    }
    Ok(Some(partition))
}

/// Median of the cleaned values, `0.0` when nothing is left.
pub fn median(dataset: &[Option<f64>]) -> f64 {
    let values = clean(dataset);
    if values.is_empty() {
        return 0.0;
    }
    median_of(&values)
}

/// Percentile of the cleaned values using linear interpolation.
///
/// # Arguments
/// * `dataset` - Raw replicate values.
/// * `percentage` - Percentile within 0 and 100.
///
pub fn percentile(dataset: &[Option<f64>], percentage: f64) -> Result<f64, Error> {
    if !(0.0..=100.0).contains(&percentage) {
        return Err(Error::InvalidParameter(format!(
            "percentile must be within 0 and 100, got {percentage}"
        )));
    }
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(f64::NAN);
    }
    ensure_min_size(values.len())?;
    Ok(percentile_of(&values, percentage))
}

/// Interquartile range `Q3 - Q1` of the cleaned values.
pub fn interquartile_range(dataset: &[Option<f64>]) -> Result<f64, Error> {
    let values = clean(dataset);
    if values.is_empty() {
        return Ok(f64::NAN);
    }
    ensure_min_size(values.len())?;
    let (q1, q3) = quartiles_of(&values);
    Ok(q3 - q1)
}

/// Median absolute deviation of the cleaned values, NaN when nothing is left.
pub fn median_absolute_deviation(dataset: &[Option<f64>]) -> f64 {
    let values = clean(dataset);
    if values.is_empty() {
        return f64::NAN;
    }
    let median = median_of(&values);
    median_of(&values.iter().map(|x| (x - median).abs()).collect::<Vec<f64>>())
}

/// Mean of the cleaned values, NaN when nothing is left.
pub fn mean(dataset: &[Option<f64>]) -> f64 {
    Array1::from(clean(dataset)).mean().unwrap_or(f64::NAN)
}

/// Sample standard deviation (n - 1) of the cleaned values, NaN for fewer than two values.
pub fn sample_std_dev(dataset: &[Option<f64>]) -> f64 {
    let values = clean(dataset);
    if values.len() < 2 {
        return f64::NAN;
    }
    Array1::from(values).std(1.0)
}

/// Selects one of the outlier filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierMethod {
    Mad { cutoff: f64 },
    StandardDeviation { k: u32 },
    Quartile,
    /// Extremes and outliers are both excluded.
    Spss,
}

impl Default for OutlierMethod {
    fn default() -> Self {
        OutlierMethod::Mad {
            cutoff: DEFAULT_MAD_CUTOFF,
        }
    }
}

impl OutlierMethod {
    pub fn partition(&self, dataset: &[Option<f64>]) -> Result<Option<OutlierPartition>, Error> {
        match self {
            OutlierMethod::Mad { cutoff } => mad_outliers(dataset, *cutoff),
            OutlierMethod::StandardDeviation { k } => stdev_outliers(dataset, *k),
            OutlierMethod::Quartile => quartile_outliers(dataset),
            OutlierMethod::Spss => Ok(spss_outliers(dataset)?.map(OutlierPartition::from)),
        }
    }

    /// Applies the filter to its own retained values until nothing more is excluded.
    ///
    /// Returns the accumulated partition and the number of passes which excluded values
    /// (at least one). Stops early once fewer than two values are retained.
    ///
    /// # Arguments
    /// * `dataset` - Raw replicate values.
    /// * `max_passes` - Upper limit of filter passes.
    ///
    pub fn partition_until_stable(
        &self,
        dataset: &[Option<f64>],
        max_passes: usize,
    ) -> Result<Option<(OutlierPartition, usize)>, Error> {
        let Some(mut partition) = self.partition(dataset)? else {
            return Ok(None);
        };

        let mut passes = 1;
        while passes < max_passes && partition.retained.len() >= 2 {
            let retained = partition
                .retained
                .iter()
                .copied()
                .map(Some)
                .collect::<Vec<Option<f64>>>();
            let Some(next) = self.partition(&retained)? else {
                break;
            };
            if next.excluded.is_empty() {
                break;
            }
            partition.excluded.extend(next.excluded);
            partition.retained = next.retained;
            passes += 1;
        }

        log::debug!(
            "{:?} excluded {} value(s) in {} pass(es)",
            self,
            partition.excluded.len(),
            passes
        );
        Ok(Some((partition, passes)))
    }

    /// Robust consensus of replicate values: the median of the retained values.
    ///
    /// `None` when no value is left after cleaning.
    pub fn consensus(&self, dataset: &[Option<f64>]) -> Result<Option<f64>, Error> {
        Ok(self.partition(dataset)?.and_then(|partition| {
            if partition.retained.is_empty() {
                None
            } else {
                Some(median_of(&partition.retained))
            }
        }))
    }
}
