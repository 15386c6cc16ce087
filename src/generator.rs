//! One full generation: resolve the album, then pick and render a candidate.

use async_trait::async_trait;

use crate::album::AlbumResolver;
use crate::error::Result;
use crate::models::ProcessedImage;
use crate::selector::CandidateSelector;

/// Produces a display-ready image on demand.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render the next image
    async fn generate(&self) -> Result<ProcessedImage>;
}

/// Generator backed by a shared album.
pub struct AlbumGenerator {
    album: String,
    resolver: AlbumResolver,
    selector: CandidateSelector,
    max_attempts: usize,
}

impl AlbumGenerator {
    /// Create a generator for `album`
    pub fn new(
        album: impl Into<String>,
        resolver: AlbumResolver,
        selector: CandidateSelector,
        max_attempts: usize,
    ) -> Self {
        Self {
            album: album.into(),
            resolver,
            selector,
            max_attempts,
        }
    }

    /// Album reference being served
    pub fn album(&self) -> &str {
        &self.album
    }
}

#[async_trait]
impl ImageGenerator for AlbumGenerator {
    async fn generate(&self) -> Result<ProcessedImage> {
        let urls = self.resolver.resolve(&self.album).await?;
        self.selector
            .select_and_process(&urls, self.max_attempts)
            .await
    }
}
