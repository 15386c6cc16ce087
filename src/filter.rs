//! Suitability checks run before a candidate is downloaded.
//!
//! Order matters: the blocklist costs nothing, the video probe costs one
//! HEAD request, and the authoritative orientation check needs the full
//! download (it runs inside the transform pipeline and reports back through
//! [`SuitabilityFilter::reject`]).

use std::sync::Arc;
use std::time::Duration;

use crate::album::AlbumSource;
use crate::db::Blocklist;

/// Why a candidate is ineligible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Previously recorded in the blocklist
    Blocklisted,
    /// Video or motion photo
    Video,
    /// Portrait or square after decoding
    NotLandscape,
}

impl Reason {
    /// Whether the reason is durable and worth blocklisting
    pub const fn is_durable(self) -> bool {
        matches!(self, Self::Video | Self::NotLandscape)
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Blocklisted => "blocklisted",
            Self::Video => "video",
            Self::NotLandscape => "not landscape",
        };
        write!(f, "{s}")
    }
}

/// Outcome of the cheap checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Candidate may be downloaded
    pub eligible: bool,
    /// Set when ineligible
    pub reason: Option<Reason>,
}

impl Verdict {
    const ELIGIBLE: Self = Self {
        eligible: true,
        reason: None,
    };

    const fn ineligible(reason: Reason) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
        }
    }
}

/// Blocklist and video checks for candidate URLs
pub struct SuitabilityFilter {
    source: Arc<dyn AlbumSource>,
    blocklist: Arc<Blocklist>,
    probe_timeout: Duration,
}

impl SuitabilityFilter {
    /// Create a filter
    pub fn new(
        source: Arc<dyn AlbumSource>,
        blocklist: Arc<Blocklist>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            source,
            blocklist,
            probe_timeout,
        }
    }

    /// Run the cheap checks. Videos are blocklisted as a side effect.
    pub async fn check(&self, url: &str) -> Verdict {
        if self.blocklist.contains(url) {
            tracing::debug!(url, "Skipping blocklisted candidate");
            return Verdict::ineligible(Reason::Blocklisted);
        }

        // Probe failures count as "not a video": a miss only wastes a download
        let is_video = match tokio::time::timeout(self.probe_timeout, self.source.probe_video(url))
            .await
        {
            Ok(Ok(v)) => v,
            Ok(Err(e)) => {
                tracing::debug!(url, "Video probe failed, assuming photo: {e}");
                false
            }
            Err(_) => {
                tracing::debug!(url, "Video probe timed out, assuming photo");
                false
            }
        };

        if is_video {
            tracing::info!(url, "Candidate is a video, blocklisting");
            self.reject(url, Reason::Video);
            return Verdict::ineligible(Reason::Video);
        }

        Verdict::ELIGIBLE
    }

    /// Record a durable rejection found later in the pipeline.
    pub fn reject(&self, url: &str, reason: Reason) {
        if !reason.is_durable() {
            return;
        }
        if let Err(e) = self.blocklist.insert(url) {
            tracing::warn!(url, "Failed to persist blocklist entry: {e}");
        }
    }

    /// Whether a URL is blocklisted
    pub fn is_blocked(&self, url: &str) -> bool {
        self.blocklist.contains(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::mock::MockSource;
    use crate::db::KvStore;
    use std::sync::atomic::Ordering;
    use tempfile::tempdir;

    fn filter(source: Arc<MockSource>, blocklist: Arc<Blocklist>) -> SuitabilityFilter {
        SuitabilityFilter::new(source, blocklist, Duration::from_secs(5))
    }

    fn memory_blocklist() -> Arc<Blocklist> {
        Arc::new(Blocklist::load(KvStore::open_in_memory().unwrap()).unwrap())
    }

    #[tokio::test]
    async fn photo_is_eligible() {
        let source = Arc::new(MockSource::new());
        let f = filter(source.clone(), memory_blocklist());
        assert_eq!(f.check("https://img/1").await, Verdict::ELIGIBLE);
        assert_eq!(source.probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn video_is_blocklisted_once() {
        let source = Arc::new(MockSource::new().with_video("https://img/v"));
        let f = filter(source.clone(), memory_blocklist());

        let first = f.check("https://img/v").await;
        assert_eq!(first.reason, Some(Reason::Video));
        assert!(f.is_blocked("https://img/v"));

        let second = f.check("https://img/v").await;
        assert_eq!(second.reason, Some(Reason::Blocklisted));
        assert_eq!(source.probe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blocklist_survives_restart_without_network() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blocklist.sqlite");
        let url = "https://img/portrait";

        {
            let blocklist = Arc::new(Blocklist::load(KvStore::open_path(&path).unwrap()).unwrap());
            filter(Arc::new(MockSource::new()), blocklist).reject(url, Reason::NotLandscape);
        }

        let source = Arc::new(MockSource::new());
        let blocklist = Arc::new(Blocklist::load(KvStore::open_path(&path).unwrap()).unwrap());
        let f = filter(source.clone(), blocklist);
        assert!(!f.check(url).await.eligible);
        assert_eq!(source.network_calls(), 0);
    }

    #[tokio::test]
    async fn probe_error_counts_as_photo() {
        let blocklist = memory_blocklist();
        let f = filter(
            Arc::new(MockSource::new().with_failing_probe()),
            blocklist.clone(),
        );
        assert!(f.check("https://img/1").await.eligible);
        assert!(blocklist.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_probe_counts_as_photo() {
        let blocklist = memory_blocklist();
        let source = Arc::new(MockSource::new().with_video("https://img/v").with_hung_probe());
        let f = filter(source.clone(), blocklist.clone());

        assert_eq!(f.check("https://img/v").await, Verdict::ELIGIBLE);
        assert_eq!(source.probe_calls.load(Ordering::SeqCst), 1);
        assert!(blocklist.is_empty());
    }

    #[tokio::test]
    async fn transient_reasons_are_not_persisted() {
        let blocklist = memory_blocklist();
        let f = filter(Arc::new(MockSource::new()), blocklist.clone());
        f.reject("https://img/1", Reason::Blocklisted);
        assert!(blocklist.is_empty());
    }
}
