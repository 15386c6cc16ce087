//! Wiring: builds the stores, album client and pipeline from a [`Config`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::album::google::GooglePhotosClient;
use crate::album::resolver::ResolverOptions;
use crate::album::{AlbumResolver, AlbumSource, UrlCache};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{AlbumStore, Blocklist, KvStore};
use crate::filter::SuitabilityFilter;
use crate::generator::AlbumGenerator;
use crate::paths::{DataPaths, default_data_dir};
use crate::pipeline::Transformer;
use crate::pregen::Pregenerator;
use crate::selector::CandidateSelector;

/// Everything the binary needs to serve or render images
pub struct Service {
    /// Data directory layout
    pub paths: DataPaths,
    /// Full generation for the configured album
    pub generator: Arc<AlbumGenerator>,
    /// Artifact owner used by the HTTP layer
    pub pregen: Pregenerator,
}

impl Service {
    /// Build against the real album host
    pub fn build(config: &Config) -> Result<Self> {
        let source: Arc<dyn AlbumSource> = Arc::new(
            GooglePhotosClient::new(config.fetch_timeout(), config.download_size())
                .context("Failed to build HTTP client")?,
        );
        Self::with_source(config, source, Arc::new(SystemClock))
    }

    /// Build with a specific album source and clock
    pub fn with_source(
        config: &Config,
        source: Arc<dyn AlbumSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let root: PathBuf = match &config.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let paths = DataPaths::create(root)?;
        tracing::info!(data_dir = %paths.root().display(), "Using data directory");

        let blocklist = Blocklist::load(
            KvStore::open_path(&paths.blocklist_db()).context("Failed to open blocklist")?,
        )?;
        tracing::info!(entries = blocklist.len(), "Loaded blocklist");
        let albums = AlbumStore::new(
            KvStore::open_path(&paths.albums_db()).context("Failed to open album store")?,
        );

        let resolver = AlbumResolver::new(
            source.clone(),
            UrlCache::new(clock.clone(), config.url_cache_ttl()),
            Arc::new(albums),
            clock,
            ResolverOptions {
                landscape_only: config.landscape_only,
                scrape_timeout: config.scrape_timeout(),
            },
        );

        let filter = Arc::new(SuitabilityFilter::new(
            source.clone(),
            Arc::new(blocklist),
            config.fetch_timeout(),
        ));
        let options = config.transform_options();
        tracing::info!(
            width = options.width,
            height = options.height,
            crop = %options.crop,
            dither = options.dither.name(),
            landscape_only = options.landscape_only,
            "Pipeline configured"
        );
        let selector = CandidateSelector::new(
            source,
            filter,
            Transformer::new(options),
            config.fetch_timeout(),
        );

        let generator = Arc::new(AlbumGenerator::new(
            config.album_url.clone(),
            resolver,
            selector,
            config.max_attempts,
        ));
        let pregen = Pregenerator::new(paths.clone(), generator.clone());

        Ok(Self {
            paths,
            generator,
            pregen,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::album::mock::MockSource;
    use crate::generator::ImageGenerator;
    use crate::pipeline::tests::sample_png;
    use tempfile::tempdir;

    #[tokio::test]
    async fn builds_and_generates_from_data_dir() {
        let dir = tempdir().unwrap();
        let config = Config {
            album_url: "https://photos.app.goo.gl/abc".to_string(),
            data_dir: Some(dir.path().join("data")),
            width: 80,
            height: 48,
            ..Config::default()
        };
        let source = Arc::new(
            MockSource::new()
                .with_lightweight(1)
                .with_image("https://img/0", sample_png(120, 80)),
        );

        let service = Service::with_source(&config, source, Arc::new(SystemClock)).unwrap();
        assert!(service.paths.blocklist_db().exists());
        assert!(service.paths.albums_db().exists());

        let image = service.generator.generate().await.unwrap();
        assert_eq!((image.width, image.height), (80, 48));
    }
}
