use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Dataset too small: {0} value(s), at least 2 required")]
    DatasetTooSmall(usize),
    #[error("Empty spectrum")]
    EmptySpectrum,
    #[error("m/z ({0}) and intensities ({1}) arrays must have the same length")]
    SpectrumShape(usize, usize),
    #[error("Invalid intensity {0}, intensities must be finite and non-negative")]
    InvalidIntensity(f64),
    #[error("Invalid m/z value {0}")]
    InvalidMass(f64),
    #[error("Spectrum has no positive intensity, normalization is undefined")]
    NoPositiveIntensity,
    #[error("Cannot build search thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Library search worker panicked")]
    SearchPanicked,
    #[error("Search outcome was already taken")]
    OutcomeTaken,
    #[error("Cannot write identification rows: {0}")]
    Csv(#[from] csv::Error),
}
