use std::{
    sync::{
        mpsc::{sync_channel, Receiver, TryRecvError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPoolBuilder};

use crate::{
    configuration::SearchConfiguration,
    error::Error,
    scoring_result::{SearchOutcome, SpectralMatch},
    similarity::score_pair,
    spectrum::{SignificantPeaks, Spectrum},
};

/// Scores one unknown spectrum against a reference library.
pub struct LibrarySearch<'a> {
    config: &'a SearchConfiguration,
    unknown: SignificantPeaks,
}

impl LibrarySearch<'_> {
    /// Creates a new LibrarySearch instance.
    ///
    /// Arguments:
    /// * `config` - The search parameters, validated before anything else is done.
    /// * `unknown` - The spectrum to identify.
    ///
    pub fn new<'a>(
        config: &'a SearchConfiguration,
        unknown: &Spectrum,
    ) -> Result<LibrarySearch<'a>, Error> {
        config.validate()?;
        let peaks = SignificantPeaks::from_spectrum(unknown, config)?;
        debug!(
            "Unknown '{}' has {} significant peaks (tolerance {}, baseline {}%, window {:?}, x_threshold {})",
            unknown.name,
            peaks.len(),
            config.mass_tolerance,
            config.baseline_threshold,
            config.mass_window,
            config.x_threshold
        );
        Ok(LibrarySearch {
            config,
            unknown: peaks,
        })
    }

    /// Forward and reverse similarity against a single library entry.
    ///
    /// # Arguments
    /// * `entry` - Reference spectrum with its metadata.
    ///
    pub fn compare(&self, entry: &Spectrum) -> Result<SpectralMatch, Error> {
        let reference = SignificantPeaks::from_spectrum(entry, self.config)?;
        let score = score_pair(&self.unknown, &reference, self.config.mass_tolerance);
        Ok(SpectralMatch::new(entry, score))
    }

    /// Compares all entries of a shard, skipping the ones which cannot be compared.
    fn search_shard(&self, shard: &[Spectrum]) -> (Vec<SpectralMatch>, usize) {
        let mut matches = Vec::with_capacity(shard.len());
        let mut skipped = 0;
        for entry in shard {
            match self.compare(entry) {
                Ok(spectral_match) => matches.push(spectral_match),
                Err(err) => {
                    warn!("Skipping library entry '{}': {}", entry.name, err);
                    skipped += 1;
                }
            }
        }
        (matches, skipped)
    }

    /// Searches the whole library.
    ///
    /// The library is split into one shard per worker. Shards are scored concurrently and the
    /// combined matches sorted once by forward similarity, best first. The sort is stable, so
    /// equally scored entries keep their library order. Entries without overlap rank last.
    ///
    /// # Arguments
    /// * `library` - Reference spectra, read only for the duration of the search.
    ///
    pub fn search(&self, library: &[Spectrum]) -> Result<SearchOutcome, Error> {
        let start = Instant::now();

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads.unwrap_or(0))
            .build()?;
        let shard_size = library.len().div_ceil(pool.current_num_threads()).max(1);

        let shards: Vec<(Vec<SpectralMatch>, usize)> = pool.install(|| {
            library
                .par_chunks(shard_size)
                .map(|shard| self.search_shard(shard))
                .collect()
        });

        let mut outcome = SearchOutcome::default();
        for (matches, skipped) in shards {
            outcome.matches.extend(matches);
            outcome.skipped += skipped;
        }
        outcome
            .matches
            .sort_by(|a, b| b.forward.rank_cmp(&a.forward));

        info!(
            "Searched {} library entries ({} skipped) on {} workers in {:0.3?}",
            library.len(),
            outcome.skipped,
            pool.current_num_threads(),
            start.elapsed()
        );
        Ok(outcome)
    }

    /// Runs a search on a background thread.
    ///
    /// Arguments:
    /// * `config` - The search parameters.
    /// * `unknown` - The spectrum to identify.
    /// * `library` - Reference spectra, shared with the caller.
    ///
    pub fn spawn(
        config: SearchConfiguration,
        unknown: Spectrum,
        library: Arc<Vec<Spectrum>>,
    ) -> SearchHandle {
        let (sender, receiver) = sync_channel(1);
        let thread = thread::spawn(move || {
            let outcome = LibrarySearch::new(&config, &unknown)
                .and_then(|search| search.search(library.as_slice()));
            // the handle may have been dropped, nobody is waiting then
            let _ = sender.send(outcome);
        });
        SearchHandle {
            receiver,
            thread,
            delivered: false,
        }
    }
}

/// Handle of a search started with [`LibrarySearch::spawn`].
pub struct SearchHandle {
    receiver: Receiver<Result<SearchOutcome, Error>>,
    thread: JoinHandle<()>,
    delivered: bool,
}

impl SearchHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Returns the outcome if the search completed, without blocking.
    ///
    /// The outcome is handed out once, later calls return `None`.
    pub fn try_outcome(&mut self) -> Option<Result<SearchOutcome, Error>> {
        if self.delivered {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(Error::SearchPanicked),
        };
        self.delivered = true;
        Some(outcome)
    }

    /// Blocks until the search completed.
    ///
    /// Fails with [`Error::OutcomeTaken`] if the outcome was already returned by
    /// [`SearchHandle::try_outcome`].
    pub fn join(self) -> Result<SearchOutcome, Error> {
        if self.delivered {
            self.thread.join().map_err(|_| Error::SearchPanicked)?;
            return Err(Error::OutcomeTaken);
        }
        let outcome = self.receiver.recv().map_err(|_| Error::SearchPanicked)?;
        self.thread.join().map_err(|_| Error::SearchPanicked)?;
        outcome
    }
}
