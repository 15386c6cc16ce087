//! Album resolution: cache, size hint, lightweight page, heavy scrape.
//!
//! ```text
//! cache hit ───────────────────────────────────────────────► urls
//!     │ miss
//!     ▼
//! hint >= 300? ── yes ─────────────────────┐
//!     │ no                                 ▼
//! lightweight ── error / empty / >= 300 ─► heavy ── empty ─► DiscoveryError
//!     │ ok                                 │ ok
//!     ▼                                    ▼
//! orientation filter, cache, record size   cache, record size
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::album::{AlbumSource, LIGHTWEIGHT_CEILING, UrlCache};
use crate::clock::Clock;
use crate::db::AlbumStore;
use crate::error::{Error, Result};
use crate::models::{AlbumMetadata, CandidateUrl, Orientation};

/// Resolver settings
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    /// Drop candidates whose reported height >= width
    pub landscape_only: bool,
    /// Upper bound on each discovery call
    pub scrape_timeout: Duration,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            landscape_only: true,
            scrape_timeout: Duration::from_secs(180),
        }
    }
}

/// Turns an album reference into candidate image URLs.
pub struct AlbumResolver {
    source: Arc<dyn AlbumSource>,
    cache: UrlCache,
    albums: Arc<AlbumStore>,
    clock: Arc<dyn Clock>,
    options: ResolverOptions,
}

impl AlbumResolver {
    /// Create a resolver
    pub fn new(
        source: Arc<dyn AlbumSource>,
        cache: UrlCache,
        albums: Arc<AlbumStore>,
        clock: Arc<dyn Clock>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            source,
            cache,
            albums,
            clock,
            options,
        }
    }

    /// Resolve an album to its candidate URLs.
    pub async fn resolve(&self, album: &str) -> Result<Arc<Vec<CandidateUrl>>> {
        if let Some(urls) = self.cache.get(album) {
            tracing::debug!(album, count = urls.len(), "Using cached URLs");
            return Ok(urls);
        }

        let known_large = match self.albums.get(album) {
            Ok(Some(meta)) => meta.observed_size >= LIGHTWEIGHT_CEILING,
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(album, "Could not read album metadata: {e}");
                false
            }
        };

        if known_large {
            tracing::info!(album, "Album known to exceed the lightweight page, scraping fully");
        } else if let Some(urls) = self.try_lightweight(album).await {
            return Ok(urls);
        }

        self.heavy(album).await
    }

    /// Lightweight strategy. `None` means escalate to the heavy strategy.
    async fn try_lightweight(&self, album: &str) -> Option<Arc<Vec<CandidateUrl>>> {
        tracing::info!(album, "Fetching album page");
        let items = match tokio::time::timeout(
            self.options.scrape_timeout,
            self.source.fetch_lightweight(album),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                tracing::warn!(album, "Lightweight fetch failed, falling back: {e}");
                return None;
            }
            Err(_) => {
                tracing::warn!(album, "Lightweight fetch timed out, falling back");
                return None;
            }
        };

        let total = items.len();
        if total == 0 {
            tracing::warn!(album, "Lightweight fetch returned nothing, falling back");
            return None;
        }
        if total >= LIGHTWEIGHT_CEILING {
            tracing::info!(album, total, "Lightweight page is likely truncated, falling back");
            return None;
        }

        let urls: Vec<CandidateUrl> = if self.options.landscape_only {
            items
                .into_iter()
                .filter(|c| c.orientation() != Orientation::PortraitOrSquare)
                .collect()
        } else {
            items
        };

        // A small album is fully listed; no landscape photos is a real answer
        if urls.is_empty() {
            tracing::warn!(album, total, "No landscape candidates in album");
        }

        tracing::info!(album, valid = urls.len(), total, "Found candidate images");
        self.record_size(album, total);
        Some(self.cache.insert(album, urls))
    }

    /// Heavy strategy. Results are not orientation-filtered; the
    /// suitability checks catch stragglers.
    async fn heavy(&self, album: &str) -> Result<Arc<Vec<CandidateUrl>>> {
        tracing::info!(album, "Scraping full album");
        let urls = tokio::time::timeout(self.options.scrape_timeout, self.source.fetch_heavy(album))
            .await
            .map_err(|_| Error::Discovery("full album scrape timed out".to_string()))?
            .map_err(|e| Error::Discovery(format!("full album scrape failed: {e}")))?;

        if urls.is_empty() {
            return Err(Error::Discovery("no images found in album".to_string()));
        }

        let total = urls.len();
        tracing::info!(album, total, "Full scrape finished");
        self.record_size(album, total);
        Ok(self
            .cache
            .insert(album, urls.into_iter().map(CandidateUrl::bare).collect()))
    }

    fn record_size(&self, album: &str, observed_size: usize) {
        let meta = AlbumMetadata {
            album_id: album.to_string(),
            observed_size,
            observed_at: self.clock.now(),
        };
        if let Err(e) = self.albums.put(&meta) {
            tracing::warn!(album, "Failed to persist album metadata: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::cache::DEFAULT_TTL;
    use crate::album::mock::MockSource;
    use crate::clock::ManualClock;
    use crate::db::KvStore;
    use std::sync::atomic::Ordering;

    const ALBUM: &str = "https://photos.app.goo.gl/album";

    struct Fixture {
        source: Arc<MockSource>,
        albums: Arc<AlbumStore>,
        clock: Arc<ManualClock>,
        resolver: AlbumResolver,
    }

    fn fixture(source: MockSource) -> Fixture {
        let source = Arc::new(source);
        let albums = Arc::new(AlbumStore::new(KvStore::open_in_memory().unwrap()));
        let clock = Arc::new(ManualClock::new());
        let resolver = AlbumResolver::new(
            source.clone(),
            UrlCache::new(clock.clone(), DEFAULT_TTL),
            albums.clone(),
            clock.clone(),
            ResolverOptions::default(),
        );
        Fixture {
            source,
            albums,
            clock,
            resolver,
        }
    }

    #[tokio::test]
    async fn small_album_uses_lightweight_and_caches() {
        let f = fixture(MockSource::new().with_lightweight(20).with_heavy(5));

        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(urls.len(), 20);
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.albums.get(ALBUM).unwrap().unwrap().observed_size, 20);

        let calls = f.source.network_calls();
        let again = f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(again.len(), 20);
        assert_eq!(f.source.network_calls(), calls);
    }

    #[tokio::test]
    async fn truncated_page_falls_back_and_hint_sticks() {
        let f = fixture(MockSource::new().with_lightweight(300).with_heavy(450));

        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(urls.len(), 450);
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 1);

        f.clock.advance(DEFAULT_TTL);
        f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn recorded_large_album_skips_lightweight() {
        let f = fixture(MockSource::new().with_lightweight(10).with_heavy(350));
        f.albums
            .put(&AlbumMetadata {
                album_id: ALBUM.to_string(),
                observed_size: 350,
                observed_at: f.clock.now(),
            })
            .unwrap();

        f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn portrait_candidates_dropped_at_discovery() {
        let f = fixture(MockSource::new().with_lightweight_items(vec![
            CandidateUrl::new("https://img/portrait", 100, 200),
            CandidateUrl::new("https://img/square", 100, 100),
            CandidateUrl::new("https://img/landscape", 200, 100),
            CandidateUrl::bare("https://img/unknown"),
        ]));

        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        let names: Vec<&str> = urls.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(names, ["https://img/landscape", "https://img/unknown"]);
        assert_eq!(f.albums.get(ALBUM).unwrap().unwrap().observed_size, 4);
        assert_eq!(f.source.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn small_portrait_album_stays_lightweight() {
        let f = fixture(
            MockSource::new()
                .with_lightweight_items(vec![
                    CandidateUrl::new("https://img/a", 100, 200),
                    CandidateUrl::new("https://img/b", 300, 400),
                ])
                .with_heavy(2),
        );

        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        assert!(urls.is_empty());
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.albums.get(ALBUM).unwrap().unwrap().observed_size, 2);

        // Cached empty answer, no rescrape within the window
        f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_lightweight_escalates_to_heavy() {
        let f = fixture(
            MockSource::new()
                .with_lightweight(5)
                .with_hung_lightweight()
                .with_heavy(4),
        );

        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(urls.len(), 4);
        assert_eq!(f.source.lightweight_calls.load(Ordering::SeqCst), 1);
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_heavy_is_discovery_error() {
        let f = fixture(MockSource::new().with_heavy(4).with_hung_heavy());

        let err = f.resolver.resolve(ALBUM).await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert!(f.albums.get(ALBUM).unwrap().is_none());
    }

    #[tokio::test]
    async fn lightweight_failure_escalates() {
        let f = fixture(MockSource::new().with_heavy(3));
        let urls = f.resolver.resolve(ALBUM).await.unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls.iter().all(|c| c.orientation() == Orientation::Unknown));
    }

    #[tokio::test]
    async fn all_strategies_empty_is_discovery_error() {
        let f = fixture(MockSource::new().with_lightweight(0));
        let err = f.resolver.resolve(ALBUM).await.unwrap_err();
        assert!(matches!(err, Error::Discovery(_)));
        assert_eq!(f.source.heavy_calls.load(Ordering::SeqCst), 1);
        assert!(f.albums.get(ALBUM).unwrap().is_none());
    }
}
