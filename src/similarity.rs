use std::cmp::Ordering;

use crate::{
    alignment::{align_forward, align_reverse, AlignedPair},
    spectrum::SignificantPeaks,
};

/// Library search match factors are reported on a 0-999 scale.
const MAX_MATCH_FACTOR: f64 = 999.0;

/// Cosine similarity of an aligned pair.
///
/// `NoOverlap` replaces the NaN a plain cosine produces when one of the vectors has a zero
/// norm or when no aligned position carries intensity on both sides. A non-finite cosine is never
/// reported as a score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    Score(f64),
    NoOverlap,
}

impl Similarity {
    pub fn score(&self) -> Option<f64> {
        match self {
            Similarity::Score(score) => Some(*score),
            Similarity::NoOverlap => None,
        }
    }

    /// Score as float, `NaN` for [`Similarity::NoOverlap`].
    pub fn value(&self) -> f64 {
        self.score().unwrap_or(f64::NAN)
    }

    pub fn is_no_overlap(&self) -> bool {
        matches!(self, Similarity::NoOverlap)
    }

    /// Integer match factor, `round(score * 1000)` capped at 999. `NoOverlap` is 0.
    pub fn match_factor(&self) -> u32 {
        match self {
            Similarity::Score(score) => {
                (score * 1000.0).round().clamp(0.0, MAX_MATCH_FACTOR) as u32
            }
            Similarity::NoOverlap => 0,
        }
    }

    /// Total order used for ranking. `NoOverlap` ranks below every score.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Similarity::Score(a), Similarity::Score(b)) => a.total_cmp(b),
            (Similarity::Score(_), Similarity::NoOverlap) => Ordering::Greater,
            (Similarity::NoOverlap, Similarity::Score(_)) => Ordering::Less,
            (Similarity::NoOverlap, Similarity::NoOverlap) => Ordering::Equal,
        }
    }
}

/// Forward and reverse similarity of the unknown against one library spectrum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityScore {
    pub forward: Similarity,
    pub reverse: Similarity,
}

/// Cosine similarity `(u·v) / (‖u‖·‖v‖)` between the two intensity vectors of a pair.
///
/// # Arguments
/// * `pair` - Aligned intensities of the unknown and the library spectrum.
///
pub fn cosine_similarity(pair: &AlignedPair) -> Similarity {
    let dot = pair.unknown.dot(&pair.library);
    let unknown_norm = pair.unknown.dot(&pair.unknown).sqrt();
    let library_norm = pair.library.dot(&pair.library).sqrt();

    if unknown_norm == 0.0 || library_norm == 0.0 || dot == 0.0 {
        return Similarity::NoOverlap;
    }

    let cosine = dot / (unknown_norm * library_norm);
    if !cosine.is_finite() {
        return Similarity::NoOverlap;
    }
    Similarity::Score(cosine.min(1.0))
}

/// Scores the unknown against a library spectrum in both directions.
///
/// # Arguments
/// * `unknown` - Significant peaks of the unknown.
/// * `library` - Significant peaks of the library spectrum.
/// * `tolerance` - Mass tolerance used for the alignment.
///
pub fn score_pair(
    unknown: &SignificantPeaks,
    library: &SignificantPeaks,
    tolerance: f64,
) -> SimilarityScore {
    SimilarityScore {
        forward: cosine_similarity(&align_forward(unknown, library, tolerance)),
        reverse: cosine_similarity(&align_reverse(unknown, library, tolerance)),
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array1;

    use super::*;
    use crate::{configuration::SearchConfiguration, spectrum::Spectrum};

    const EPSILON: f64 = 1e-9;

    fn pair(unknown: Vec<f64>, library: Vec<f64>) -> AlignedPair {
        let mz = Array1::from_iter((0..unknown.len()).map(|i| 50.0 + i as f64));
        AlignedPair::new(mz, Array1::from(unknown), Array1::from(library))
    }

    #[test]
    fn test_cosine_similarity() {
        let score = cosine_similarity(&pair(vec![1.0, 0.0], vec![1.0, 1.0]));
        assert!((score.value() - 1.0 / 2f64.sqrt()).abs() < EPSILON);

        let score = cosine_similarity(&pair(vec![3.0, 4.0], vec![6.0, 8.0]));
        assert!((score.value() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_cosine_similarity_without_overlap() {
        let zero = cosine_similarity(&pair(vec![0.0, 0.0], vec![1.0, 1.0]));
        assert!(zero.is_no_overlap());
        assert!(zero.value().is_nan());

        let disjoint = cosine_similarity(&pair(vec![1.0, 0.0], vec![0.0, 1.0]));
        assert_eq!(disjoint, Similarity::NoOverlap);

        assert!(cosine_similarity(&pair(vec![], vec![])).is_no_overlap());
    }

    #[test]
    fn test_non_finite_cosine_is_not_a_perfect_match() {
        let score = cosine_similarity(&pair(vec![f64::INFINITY, 1.0], vec![1.0, 1.0]));
        assert!(score.is_no_overlap());
        assert_eq!(score.match_factor(), 0);
    }

    #[test]
    fn test_intense_spectrum_scores_like_scaled_down_copy() {
        let config = SearchConfiguration::default();
        let intense = Spectrum::new("intense", vec![60.0, 80.0], vec![1e307, 5e306]);
        let scaled = Spectrum::new("scaled", vec![60.0, 80.0], vec![2.0, 1.0]);
        let library = Spectrum::new("library", vec![60.0, 200.0], vec![1.0, 1.0]);
        let library = SignificantPeaks::from_spectrum(&library, &config).unwrap();

        let intense = SignificantPeaks::from_spectrum(&intense, &config).unwrap();
        let score = score_pair(&intense, &library, config.mass_tolerance);
        assert!((score.forward.value() - 0.4 * 10f64.sqrt() / 2.0).abs() < 1e-6);
        assert!((score.reverse.value() - 1.0 / 2f64.sqrt()).abs() < 1e-6);

        let scaled = SignificantPeaks::from_spectrum(&scaled, &config).unwrap();
        let reference = score_pair(&scaled, &library, config.mass_tolerance);
        assert!((score.forward.value() - reference.forward.value()).abs() < 1e-6);
        assert!((score.reverse.value() - reference.reverse.value()).abs() < 1e-6);
    }

    #[test]
    fn test_identical_spectra_score_one() {
        let config = SearchConfiguration::default();
        let spectrum = Spectrum::new(
            "dpa",
            vec![51.0, 77.0, 141.0, 168.0, 169.0, 170.0],
            vec![60.0, 120.0, 80.0, 400.0, 999.0, 130.0],
        );
        let peaks = SignificantPeaks::from_spectrum(&spectrum, &config).unwrap();
        let score = score_pair(&peaks, &peaks, config.mass_tolerance);
        assert!((score.forward.value() - 1.0).abs() < EPSILON);
        assert!((score.reverse.value() - 1.0).abs() < EPSILON);
        assert_eq!(score.forward.match_factor(), 999);
    }

    #[test]
    fn test_forward_and_reverse_are_asymmetric() {
        let config = SearchConfiguration::default();
        let unknown = Spectrum::new("unknown", vec![60.0, 80.0, 100.0], vec![100.0, 100.0, 100.0]);
        let library = Spectrum::new("library", vec![60.0], vec![100.0]);
        let unknown = SignificantPeaks::from_spectrum(&unknown, &config).unwrap();
        let library = SignificantPeaks::from_spectrum(&library, &config).unwrap();

        let score = score_pair(&unknown, &library, config.mass_tolerance);
        assert!((score.forward.value() - 1.0 / 3f64.sqrt()).abs() < EPSILON);
        assert!((score.reverse.value() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_peaks_outside_window_have_no_overlap() {
        let config = SearchConfiguration::default();
        let unknown = Spectrum::new("unknown", vec![20.0, 30.0], vec![100.0, 50.0]);
        let library = Spectrum::new("library", vec![1300.0, 1400.0], vec![100.0, 50.0]);
        let unknown = SignificantPeaks::from_spectrum(&unknown, &config).unwrap();
        let library = SignificantPeaks::from_spectrum(&library, &config).unwrap();

        let score = score_pair(&unknown, &library, config.mass_tolerance);
        assert!(score.forward.value().is_nan());
        assert!(score.reverse.value().is_nan());
    }

    #[test]
    fn test_disjoint_spectra_have_no_overlap() {
        let config = SearchConfiguration::default();
        let unknown = Spectrum::new("unknown", vec![60.0, 80.0], vec![100.0, 50.0]);
        let library = Spectrum::new("library", vec![61.0, 81.0], vec![100.0, 50.0]);
        let unknown = SignificantPeaks::from_spectrum(&unknown, &config).unwrap();
        let library = SignificantPeaks::from_spectrum(&library, &config).unwrap();

        let score = score_pair(&unknown, &library, config.mass_tolerance);
        assert!(score.forward.is_no_overlap());
        assert!(score.reverse.is_no_overlap());
    }

    #[test]
    fn test_rank_cmp() {
        let high = Similarity::Score(0.9);
        let low = Similarity::Score(0.1);
        assert_eq!(high.rank_cmp(&low), Ordering::Greater);
        assert_eq!(Similarity::NoOverlap.rank_cmp(&low), Ordering::Less);
        assert_eq!(
            Similarity::NoOverlap.rank_cmp(&Similarity::NoOverlap),
            Ordering::Equal
        );
    }

    #[test]
    fn test_match_factor() {
        assert_eq!(Similarity::Score(0.8123).match_factor(), 812);
        assert_eq!(Similarity::Score(1.0).match_factor(), 999);
        assert_eq!(Similarity::NoOverlap.match_factor(), 0);
    }
}
