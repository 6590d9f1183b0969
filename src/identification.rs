use std::io::Write;

use serde::Serialize;

use crate::{
    error::Error,
    scoring_result::SearchOutcome,
    spectrum::{normalize_cas, Spectrum},
};

/// Number of cells of every exported row.
pub const ROW_WIDTH: usize = 8;

/// Signal a chromatographic peak was detected from.
#[derive(Debug, Clone, PartialEq)]
pub enum PeakSignal {
    MassSpectrum(Spectrum),
    /// Masses of the extracted ion chromatogram.
    IonChromatogram(Vec<f64>),
}

/// Chromatographic peak as delivered by the peak alignment across replicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    /// Retention time in seconds.
    pub rt: f64,
    pub signal: PeakSignal,
    pub area: Option<f64>,
    /// Scan indices of the left boundary, apex and right boundary.
    pub bounds: Option<(usize, usize, usize)>,
    pub uid: String,
}

impl Peak {
    pub fn new(rt: f64, signal: PeakSignal, uid: impl Into<String>) -> Self {
        Self {
            rt,
            signal,
            area: None,
            bounds: None,
            uid: uid.into(),
        }
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_bounds(mut self, left: usize, apex: usize, right: usize) -> Self {
        self.bounds = Some((left, apex, right));
        self
    }

    pub fn mass_spectrum(&self) -> Option<&Spectrum> {
        match &self.signal {
            PeakSignal::MassSpectrum(spectrum) => Some(spectrum),
            PeakSignal::IonChromatogram(_) => None,
        }
    }
}

/// A library hit attached to an identification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    name: String,
    cas: String,
    library: String,
    match_factor: u32,
    reverse_match_factor: u32,
}

impl SearchResult {
    pub fn new(
        name: impl Into<String>,
        cas: Option<&str>,
        library: impl Into<String>,
        match_factor: u32,
        reverse_match_factor: u32,
    ) -> Self {
        Self {
            name: name.into(),
            cas: normalize_cas(cas),
            library: library.into(),
            match_factor,
            reverse_match_factor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cas(&self) -> &str {
        &self.cas
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    pub fn match_factor(&self) -> u32 {
        self.match_factor
    }

    pub fn reverse_match_factor(&self) -> u32 {
        self.reverse_match_factor
    }
}

/// A peak together with its ranked library hits.
///
/// The retention time is held separately from the embedded [`Peak`] so that it can be
/// replaced by a consensus value across replicates while the peak itself stays as
/// detected.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedPeak {
    peak: Peak,
    rt: f64,
    peak_number: Option<usize>,
    hits: Vec<SearchResult>,
}

impl QualifiedPeak {
    /// Creates a new qualified peak.
    ///
    /// Arguments:
    /// * `peak` - The detected peak.
    /// * `hits` - Library hits in rank order.
    /// * `peak_number` - Optional ordinal number of the peak.
    ///
    pub fn new(peak: Peak, hits: Vec<SearchResult>, peak_number: Option<usize>) -> Self {
        let rt = peak.rt;
        Self {
            peak,
            rt,
            peak_number,
            hits,
        }
    }

    /// Attaches the `n` best matches of a library search.
    pub fn from_search(
        peak: Peak,
        outcome: &SearchOutcome,
        n: usize,
        peak_number: Option<usize>,
    ) -> Self {
        Self::new(peak, outcome.top_hits(n), peak_number)
    }

    pub fn peak(&self) -> &Peak {
        &self.peak
    }

    /// Retention time in seconds.
    pub fn rt(&self) -> f64 {
        self.rt
    }

    pub fn set_rt(&mut self, rt: f64) {
        self.rt = rt;
    }

    pub fn area(&self) -> Option<f64> {
        self.peak.area
    }

    pub fn uid(&self) -> &str {
        &self.peak.uid
    }

    pub fn peak_number(&self) -> Option<usize> {
        self.peak_number
    }

    pub fn hits(&self) -> &[SearchResult] {
        &self.hits
    }

    pub fn add_hit(&mut self, hit: SearchResult) {
        self.hits.push(hit);
    }

    /// Rows for the spreadsheet report.
    ///
    /// The first row holds the retention time in minutes and the area, every following row
    /// one hit: library, match factor, reverse match factor, name and CAS number in the
    /// last five columns.
    pub fn to_rows(&self) -> Vec<[String; ROW_WIDTH]> {
        let mut rows = Vec::with_capacity(self.hits.len() + 1);
        rows.push([
            (self.rt / 60.0).to_string(),
            self.area().map(|area| area.to_string()).unwrap_or_default(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
        for hit in self.hits.iter() {
            rows.push([
                String::new(),
                String::new(),
                String::new(),
                hit.library.clone(),
                hit.match_factor.to_string(),
                hit.reverse_match_factor.to_string(),
                hit.name.clone(),
                hit.cas.clone(),
            ]);
        }
        rows
    }

    pub fn write_rows<W: Write>(&self, writer: &mut csv::Writer<W>) -> Result<(), Error> {
        for row in self.to_rows() {
            writer.write_record(&row)?;
        }
        Ok(())
    }
}

/// Writes the rows of all peaks as CSV.
///
/// Arguments:
/// * `peaks` - Peaks in report order.
/// * `output` - Destination, e.g. a file or buffer.
///
pub fn write_identifications<W: Write>(peaks: &[QualifiedPeak], output: W) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);
    for peak in peaks {
        peak.write_rows(&mut writer)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
