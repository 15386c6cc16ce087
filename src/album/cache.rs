//! Time-bounded cache of discovered album URLs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::models::CandidateUrl;

/// Default lifetime of a cache entry
pub const DEFAULT_TTL: Duration = Duration::hours(1);

/// Cache entry for an album
#[derive(Clone, Debug)]
pub struct UrlCacheEntry {
    /// Album the URLs were discovered from
    pub album_id: String,
    /// Candidates in discovery order
    pub urls: Arc<Vec<CandidateUrl>>,
    /// Entry is ignored from this instant on
    pub expires_at: DateTime<Utc>,
}

/// Thread-safe URL cache keyed by album reference.
///
/// Entries are only ever replaced whole.
#[derive(Clone)]
pub struct UrlCache {
    entries: Arc<Mutex<HashMap<String, UrlCacheEntry>>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl UrlCache {
    /// Create an empty cache.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, UrlCacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Store the URL list for an album with a fresh expiry.
    pub fn insert(&self, album_id: &str, urls: Vec<CandidateUrl>) -> Arc<Vec<CandidateUrl>> {
        let urls = Arc::new(urls);
        let entry = UrlCacheEntry {
            album_id: album_id.to_string(),
            urls: Arc::clone(&urls),
            expires_at: self.clock.now() + self.ttl,
        };
        self.lock().insert(album_id.to_string(), entry);
        urls
    }

    /// Get the URL list for an album if it has not expired.
    pub fn get(&self, album_id: &str) -> Option<Arc<Vec<CandidateUrl>>> {
        let now = self.clock.now();
        let mut cache = self.lock();
        match cache.get(album_id) {
            Some(entry) if entry.expires_at > now => Some(Arc::clone(&entry.urls)),
            Some(_) => {
                cache.remove(album_id);
                None
            }
            None => None,
        }
    }

    /// Get the number of cached albums, expired or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
