//! Scripted in-memory album host for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use super::AlbumSource;
use crate::error::{Error, Result};
use crate::models::CandidateUrl;

/// Album host double that counts every call.
#[derive(Default)]
pub struct MockSource {
    pub lightweight: Mutex<Option<Vec<CandidateUrl>>>,
    pub heavy: Mutex<Vec<String>>,
    pub videos: Mutex<HashSet<String>>,
    pub images: Mutex<HashMap<String, Vec<u8>>>,
    pub probe_fails: AtomicBool,
    pub hang_lightweight: AtomicBool,
    pub hang_heavy: AtomicBool,
    pub hang_probe: AtomicBool,
    /// Downloads left that never complete
    pub hung_fetches: AtomicUsize,
    pub lightweight_calls: AtomicUsize,
    pub heavy_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lightweight strategy returns `n` landscape candidates
    pub fn with_lightweight(self, n: usize) -> Self {
        let items = (0..n)
            .map(|i| CandidateUrl::new(format!("https://img/{i}"), 1200, 800))
            .collect();
        *self.lightweight.lock().unwrap() = Some(items);
        self
    }

    pub fn with_lightweight_items(self, items: Vec<CandidateUrl>) -> Self {
        *self.lightweight.lock().unwrap() = Some(items);
        self
    }

    /// Heavy strategy returns `n` bare URLs
    pub fn with_heavy(self, n: usize) -> Self {
        *self.heavy.lock().unwrap() = (0..n).map(|i| format!("https://heavy/{i}")).collect();
        self
    }

    pub fn with_video(self, url: &str) -> Self {
        self.videos.lock().unwrap().insert(url.to_string());
        self
    }

    pub fn with_image(self, url: &str, bytes: Vec<u8>) -> Self {
        self.images.lock().unwrap().insert(url.to_string(), bytes);
        self
    }

    /// Every video probe errors
    pub fn with_failing_probe(self) -> Self {
        self.probe_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Lightweight fetches never complete
    pub fn with_hung_lightweight(self) -> Self {
        self.hang_lightweight.store(true, Ordering::SeqCst);
        self
    }

    /// Heavy scrapes never complete
    pub fn with_hung_heavy(self) -> Self {
        self.hang_heavy.store(true, Ordering::SeqCst);
        self
    }

    /// Video probes never complete
    pub fn with_hung_probe(self) -> Self {
        self.hang_probe.store(true, Ordering::SeqCst);
        self
    }

    /// The first `n` downloads never complete
    pub fn with_hung_fetches(self, n: usize) -> Self {
        self.hung_fetches.store(n, Ordering::SeqCst);
        self
    }

    pub fn network_calls(&self) -> usize {
        self.lightweight_calls.load(Ordering::SeqCst)
            + self.heavy_calls.load(Ordering::SeqCst)
            + self.probe_calls.load(Ordering::SeqCst)
            + self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AlbumSource for MockSource {
    async fn fetch_lightweight(&self, _album: &str) -> Result<Vec<CandidateUrl>> {
        self.lightweight_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_lightweight.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.lightweight
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| Error::Discovery("lightweight page unavailable".to_string()))
    }

    async fn fetch_heavy(&self, _album: &str) -> Result<Vec<String>> {
        self.heavy_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_heavy.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(self.heavy.lock().unwrap().clone())
    }

    async fn probe_video(&self, url: &str) -> Result<bool> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_probe.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.probe_fails.load(Ordering::SeqCst) {
            return Err(Error::Timeout("video probe"));
        }
        Ok(self.videos.lock().unwrap().contains(url))
    }

    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let hung = self
            .hung_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hung {
            std::future::pending::<()>().await;
        }
        self.images
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Io(std::io::Error::other(format!("404 {url}"))))
    }
}
