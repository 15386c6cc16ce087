//! Bounded random selection over an album's candidates.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::album::AlbumSource;
use crate::error::{Error, Result};
use crate::filter::{Reason, SuitabilityFilter};
use crate::models::{CandidateUrl, ProcessedImage};
use crate::pipeline::{Outcome, Transformer};

/// Default attempt budget per generation
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

/// Picks random candidates until one survives the pipeline.
pub struct CandidateSelector {
    source: Arc<dyn AlbumSource>,
    filter: Arc<SuitabilityFilter>,
    transformer: Transformer,
    fetch_timeout: Duration,
    rng: Mutex<StdRng>,
}

impl CandidateSelector {
    /// Create a selector seeded from the OS
    pub fn new(
        source: Arc<dyn AlbumSource>,
        filter: Arc<SuitabilityFilter>,
        transformer: Transformer,
        fetch_timeout: Duration,
    ) -> Self {
        Self::with_rng(
            source,
            filter,
            transformer,
            fetch_timeout,
            StdRng::from_os_rng(),
        )
    }

    /// Create a selector with a specific generator
    pub fn with_rng(
        source: Arc<dyn AlbumSource>,
        filter: Arc<SuitabilityFilter>,
        transformer: Transformer,
        fetch_timeout: Duration,
        rng: StdRng,
    ) -> Self {
        Self {
            source,
            filter,
            transformer,
            fetch_timeout,
            rng: Mutex::new(rng),
        }
    }

    /// Draw with replacement until a candidate produces an image or the
    /// budget runs out.
    pub async fn select_and_process(
        &self,
        urls: &[CandidateUrl],
        max_attempts: usize,
    ) -> Result<ProcessedImage> {
        if urls.is_empty() {
            tracing::warn!("No candidates to choose from");
            return Err(Error::ExhaustedAttempts { attempts: 0 });
        }

        for attempt in 1..=max_attempts {
            let candidate = &urls[self.draw(urls.len())];
            tracing::info!(attempt, max_attempts, url = %candidate, "Trying candidate");

            match self.attempt(&candidate.url).await {
                Ok(Some(image)) => return Ok(image),
                Ok(None) => {}
                Err(e) if e.is_per_candidate() => {
                    tracing::warn!(url = %candidate, "Candidate failed: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::ExhaustedAttempts {
            attempts: max_attempts,
        })
    }

    fn draw(&self, len: usize) -> usize {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(0..len)
    }

    /// One fetch/transform cycle. `Ok(None)` means the candidate was rejected.
    async fn attempt(&self, url: &str) -> Result<Option<ProcessedImage>> {
        let verdict = self.filter.check(url).await;
        if !verdict.eligible {
            tracing::debug!(url, reason = ?verdict.reason, "Candidate ineligible");
            return Ok(None);
        }

        let bytes = tokio::time::timeout(self.fetch_timeout, self.source.fetch_image(url))
            .await
            .map_err(|_| Error::Timeout("image download"))??;

        match self.transformer.transform_async(bytes).await? {
            Outcome::Processed(image) => Ok(Some(image)),
            Outcome::Rejected(rejection) => {
                tracing::info!(url, "Rejecting candidate: {rejection}");
                self.filter.reject(url, Reason::NotLandscape);
                Ok(None)
            }
        }
    }
}
