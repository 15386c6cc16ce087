//! Album discovery: where candidate image URLs come from.
//!
//! The album host has no public API. [`AlbumSource`] is the seam between the
//! resolver and whatever scrapes it; [`google::GooglePhotosClient`] is the
//! production implementation.

pub mod cache;
pub mod google;
pub mod resolver;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CandidateUrl;

pub use cache::UrlCache;
pub use resolver::AlbumResolver;

/// Items at or above which the lightweight strategy is assumed truncated.
pub const LIGHTWEIGHT_CEILING: usize = 300;

/// Everything the pipeline needs from the album host.
#[async_trait]
pub trait AlbumSource: Send + Sync {
    /// One cheap page of album metadata, with dimensions when known.
    ///
    /// Silently capped at roughly [`LIGHTWEIGHT_CEILING`] items.
    async fn fetch_lightweight(&self, album: &str) -> Result<Vec<CandidateUrl>>;

    /// Full scrape of the album. Slow, unbounded.
    async fn fetch_heavy(&self, album: &str) -> Result<Vec<String>>;

    /// Whether the URL serves a video stream (videos and motion photos).
    async fn probe_video(&self, url: &str) -> Result<bool>;

    /// Download the image bytes behind a candidate URL.
    async fn fetch_image(&self, url: &str) -> Result<Vec<u8>>;
}
