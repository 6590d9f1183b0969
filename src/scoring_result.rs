use crate::{
    identification::SearchResult,
    similarity::{Similarity, SimilarityScore},
    spectrum::Spectrum,
};

/// Comparison of the unknown against a single library entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralMatch {
    pub name: String,
    pub cas: String,
    pub library: String,
    pub forward: Similarity,
    pub reverse: Similarity,
}

impl SpectralMatch {
    pub fn new(entry: &Spectrum, score: SimilarityScore) -> Self {
        Self {
            name: entry.name.clone(),
            cas: entry.normalized_cas(),
            library: entry.library_name().to_string(),
            forward: score.forward,
            reverse: score.reverse,
        }
    }

    pub fn to_search_result(&self) -> SearchResult {
        SearchResult::new(
            self.name.clone(),
            Some(self.cas.as_str()),
            self.library.clone(),
            self.forward.match_factor(),
            self.reverse.match_factor(),
        )
    }
}

/// Ranked matches of a full library scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchOutcome {
    /// Sorted by forward similarity, best first.
    pub matches: Vec<SpectralMatch>,
    /// Library entries which could not be compared.
    pub skipped: usize,
}

impl SearchOutcome {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn best(&self) -> Option<&SpectralMatch> {
        self.matches.first()
    }

    /// The `n` best matches as search results, in rank order.
    pub fn top_hits(&self, n: usize) -> Vec<SearchResult> {
        self.matches
            .iter()
            .take(n)
            .map(SpectralMatch::to_search_result)
            .collect()
    }
}
