/// Mass axis alignment of two spectra
pub mod alignment;
pub mod configuration;
pub mod error;
pub mod identification;
/// Parallel search of a reference library
pub mod library_search;
pub mod outlier;
pub mod scoring_result;
pub mod similarity;
pub mod spectrum;
