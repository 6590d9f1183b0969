use ndarray::Array1;

use crate::spectrum::SignificantPeaks;

/// Which peaks make it onto the aligned mass axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// Union of both peak sets, used for the forward score.
    Outer,
    /// Only positions carrying a library peak, used for the reverse score.
    Right,
}

/// Two intensity vectors index-aligned to a shared, sorted mass axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub mz: Array1<f64>,
    pub unknown: Array1<f64>,
    pub library: Array1<f64>,
}

impl AlignedPair {
    /// # Panics
    /// If the three arrays differ in length.
    ///
    pub fn new(mz: Array1<f64>, unknown: Array1<f64>, library: Array1<f64>) -> Self {
        assert_eq!(mz.len(), unknown.len(), "aligned arrays differ in length");
        assert_eq!(mz.len(), library.len(), "aligned arrays differ in length");
        Self {
            mz,
            unknown,
            library,
        }
    }

    pub fn len(&self) -> usize {
        self.mz.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }
}

/// Pairs peaks of the unknown with peaks of the library spectrum.
///
/// Every candidate pair within `tolerance` is considered, closest pairs first, and each
/// peak is used at most once. Returns `(unknown_index, library_index)` tuples.
///
/// Arguments:
/// * `unknown_mz` - Sorted masses of the unknown.
/// * `library_mz` - Sorted masses of the library spectrum.
/// * `tolerance` - Maximum mass difference of a pair.
///
fn match_peaks(
    unknown_mz: &Array1<f64>,
    library_mz: &Array1<f64>,
    tolerance: f64,
) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
    let mut window_start = 0;
    for (unknown_index, &mz) in unknown_mz.iter().enumerate() {
        while window_start < library_mz.len() && library_mz[window_start] < mz - tolerance {
            window_start += 1;
        }
        for (library_index, &candidate_mz) in library_mz.iter().enumerate().skip(window_start) {
            if candidate_mz > mz + tolerance {
                break;
            }
            candidates.push(((mz - candidate_mz).abs(), unknown_index, library_index));
        }
    }

    // stable, so equally distant candidates keep their mass order
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut unknown_used = vec![false; unknown_mz.len()];
    let mut library_used = vec![false; library_mz.len()];
    let mut pairs = Vec::new();
    for (_, unknown_index, library_index) in candidates {
        if unknown_used[unknown_index] || library_used[library_index] {
            continue;
        }
        unknown_used[unknown_index] = true;
        library_used[library_index] = true;
        pairs.push((unknown_index, library_index));
    }
    pairs
}

/// Aligns the significant peaks of two spectra onto a common mass axis.
///
/// Matched peaks are placed at the library mass. Intensities missing on one side are zero.
/// With [`JoinKind::Right`] peaks found only in the unknown are dropped.
///
/// Arguments:
/// * `unknown` - Significant peaks of the unknown spectrum.
/// * `library` - Significant peaks of the library spectrum.
/// * `tolerance` - Two masses within this distance are considered the same.
/// * `join` - Join semantics for the axis.
///
pub fn align(
    unknown: &SignificantPeaks,
    library: &SignificantPeaks,
    tolerance: f64,
    join: JoinKind,
) -> AlignedPair {
    let pairs = match_peaks(&unknown.mz, &library.mz, tolerance);

    let mut unknown_matched = vec![false; unknown.len()];
    let mut library_matched = vec![false; library.len()];

    // (mz, unknown intensity, library intensity)
    let mut rows: Vec<(f64, f64, f64)> = Vec::with_capacity(unknown.len() + library.len());
    for &(unknown_index, library_index) in pairs.iter() {
        unknown_matched[unknown_index] = true;
        library_matched[library_index] = true;
        rows.push((
            library.mz[library_index],
            unknown.intensity[unknown_index],
            library.intensity[library_index],
        ));
    }

    if join == JoinKind::Outer {
        rows.extend(
            unknown
                .mz
                .iter()
                .zip(unknown.intensity.iter())
                .zip(unknown_matched.iter())
                .filter(|(_, &matched)| !matched)
                .map(|((&mz, &intensity), _)| (mz, intensity, 0.0)),
        );
    }

    rows.extend(
        library
            .mz
            .iter()
            .zip(library.intensity.iter())
            .zip(library_matched.iter())
            .filter(|(_, &matched)| !matched)
            .map(|((&mz, &intensity), _)| (mz, 0.0, intensity)),
    );

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut mz = Vec::with_capacity(rows.len());
    let mut unknown_intensity = Vec::with_capacity(rows.len());
    let mut library_intensity = Vec::with_capacity(rows.len());
    for (row_mz, row_unknown, row_library) in rows {
        mz.push(row_mz);
        unknown_intensity.push(row_unknown);
        library_intensity.push(row_library);
    }

    AlignedPair::new(
        Array1::from(mz),
        Array1::from(unknown_intensity),
        Array1::from(library_intensity),
    )
}

/// Full outer join of both peak sets.
pub fn align_forward(
    unknown: &SignificantPeaks,
    library: &SignificantPeaks,
    tolerance: f64,
) -> AlignedPair {
    align(unknown, library, tolerance, JoinKind::Outer)
}

/// Right outer join restricted to masses of the library spectrum.
pub fn align_reverse(
    unknown: &SignificantPeaks,
    library: &SignificantPeaks,
    tolerance: f64,
) -> AlignedPair {
    align(unknown, library, tolerance, JoinKind::Right)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peaks(mz: Vec<f64>, intensity: Vec<f64>) -> SignificantPeaks {
        SignificantPeaks {
            mz: Array1::from(mz),
            intensity: Array1::from(intensity),
        }
    }

    #[test]
    fn test_match_peaks_prefers_closest() {
        let unknown = Array1::from(vec![100.0, 100.2]);
        let library = Array1::from(vec![100.15]);
        let pairs = match_peaks(&unknown, &library, 0.25);
        assert_eq!(pairs, vec![(1, 0)]);
    }

    #[test]
    fn test_align_forward_union() {
        let unknown = peaks(vec![50.1, 77.0, 105.0], vec![100.0, 40.0, 60.0]);
        let library = peaks(vec![50.0, 105.2, 152.0], vec![80.0, 100.0, 20.0]);
        let pair = align_forward(&unknown, &library, 0.25);

        assert_eq!(pair.mz, Array1::from(vec![50.0, 77.0, 105.2, 152.0]));
        assert_eq!(pair.unknown, Array1::from(vec![100.0, 40.0, 60.0, 0.0]));
        assert_eq!(pair.library, Array1::from(vec![80.0, 0.0, 100.0, 20.0]));
    }

    #[test]
    fn test_align_reverse_drops_unknown_only_peaks() {
        let unknown = peaks(vec![50.1, 77.0, 105.0], vec![100.0, 40.0, 60.0]);
        let library = peaks(vec![50.0, 105.2, 152.0], vec![80.0, 100.0, 20.0]);
        let pair = align_reverse(&unknown, &library, 0.25);

        assert_eq!(pair.mz, Array1::from(vec![50.0, 105.2, 152.0]));
        assert_eq!(pair.unknown, Array1::from(vec![100.0, 60.0, 0.0]));
        assert_eq!(pair.library, Array1::from(vec![80.0, 100.0, 20.0]));
    }

    #[test]
    fn test_align_outside_tolerance() {
        let unknown = peaks(vec![100.0], vec![100.0]);
        let library = peaks(vec![100.5], vec![100.0]);
        let pair = align_forward(&unknown, &library, 0.25);
        assert_eq!(pair.len(), 2);
        assert_eq!(pair.unknown, Array1::from(vec![100.0, 0.0]));
        assert_eq!(pair.library, Array1::from(vec![0.0, 100.0]));
    }

    #[test]
    fn test_align_empty() {
        let unknown = peaks(vec![], vec![]);
        let library = peaks(vec![], vec![]);
        assert!(align_forward(&unknown, &library, 0.25).is_empty());
        assert!(align_reverse(&unknown, &library, 0.25).is_empty());
    }

    #[test]
    #[should_panic]
    fn test_aligned_pair_length_mismatch() {
        AlignedPair::new(
            Array1::from(vec![1.0, 2.0]),
            Array1::from(vec![1.0]),
            Array1::from(vec![1.0, 2.0]),
        );
    }
}
