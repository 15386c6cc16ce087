//! Pregeneration of the served image.
//!
//! The artifact on disk is either missing or complete. A read with no
//! artifact pays for a synchronous generation; every read then kicks off a
//! background regeneration so the next request is served instantly. Writes
//! go to a unique temp sibling and are renamed into place only once the
//! whole image is on disk, so a failed or abandoned regeneration leaves the
//! previous artifact untouched.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use httpdate::fmt_http_date;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::Result;
use crate::generator::ImageGenerator;
use crate::paths::DataPaths;

/// Lifecycle of the artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactState {
    /// Nothing on disk yet
    Missing,
    /// A regeneration is running; the previous artifact (if any) is served
    Generating,
    /// A complete artifact is on disk
    Ready,
}

/// The artifact as read from disk, with its freshness metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedImage {
    /// PNG bytes
    pub bytes: Vec<u8>,
    /// File modification time
    pub last_modified: SystemTime,
    /// Weak validator derived from size and mtime
    pub etag: String,
}

impl ServedImage {
    /// `Last-Modified` header value
    pub fn last_modified_header(&self) -> String {
        fmt_http_date(self.last_modified)
    }
}

/// Weak ETag from size and mtime (whole seconds)
pub fn weak_etag(size: u64, modified: SystemTime) -> String {
    let secs = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs();
    format!("W/\"{size}-{secs}\"")
}

/// Owns the on-disk artifact and its regeneration.
#[derive(Clone)]
pub struct Pregenerator {
    paths: DataPaths,
    generator: Arc<dyn ImageGenerator>,
    in_flight: Arc<AtomicBool>,
}

impl Pregenerator {
    /// Create a manager writing under `paths`
    pub fn new(paths: DataPaths, generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            paths,
            generator,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current state of the artifact
    pub async fn state(&self) -> ArtifactState {
        if self.in_flight.load(Ordering::Acquire) {
            ArtifactState::Generating
        } else if fs::try_exists(self.paths.artifact()).await.unwrap_or(false) {
            ArtifactState::Ready
        } else {
            ArtifactState::Missing
        }
    }

    /// Make sure an artifact exists, generating one synchronously if not.
    ///
    /// Not serialized: concurrent callers that all see a missing artifact
    /// each generate one, each into its own temp file, and the last rename
    /// wins. Any of the results is a valid image.
    pub async fn ensure_fresh(&self) -> Result<()> {
        if fs::try_exists(self.paths.artifact()).await? {
            return Ok(());
        }
        tracing::info!("No pregenerated image, generating now");
        self.generate_now().await
    }

    /// Read the current artifact and schedule the next one.
    pub async fn serve_current(&self) -> Result<ServedImage> {
        self.ensure_fresh().await?;
        let served = read_artifact(&self.paths.artifact()).await?;
        self.spawn_regeneration();
        Ok(served)
    }

    /// Generate and atomically replace the artifact.
    pub async fn generate_now(&self) -> Result<()> {
        let image = self.generator.generate().await?;
        write_atomic(&self.paths, &image.bytes).await?;
        tracing::info!(bytes = image.bytes.len(), "Pregenerated image ready");
        Ok(())
    }

    /// Start a background regeneration unless one is already running.
    ///
    /// Returns whether a task was spawned.
    pub fn spawn_regeneration(&self) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!("Regeneration already in flight");
            return false;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let _guard = InFlight(this.in_flight.clone());
            tracing::debug!("Background regeneration started");
            if let Err(e) = this.generate_now().await {
                tracing::error!("Background regeneration failed, keeping previous image: {e}");
            }
        });
        true
    }
}

/// Clears the in-flight flag however the task ends
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Read bytes and metadata through one handle so they describe the same file
async fn read_artifact(path: &Path) -> Result<ServedImage> {
    let mut file = fs::File::open(path).await?;
    let meta = file.metadata().await?;
    let last_modified = meta.modified().unwrap_or_else(|e| {
        tracing::warn!("No modified time for {}: {e}", path.display());
        UNIX_EPOCH
    });

    let mut bytes = Vec::with_capacity(usize::try_from(meta.len()).unwrap_or_default());
    file.read_to_end(&mut bytes).await?;

    Ok(ServedImage {
        etag: weak_etag(meta.len(), last_modified),
        bytes,
        last_modified,
    })
}

/// Write to a fresh temp sibling, then rename over the artifact.
async fn write_atomic(paths: &DataPaths, bytes: &[u8]) -> Result<()> {
    let temp = paths.artifact_temp();
    let written = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, paths.artifact()).await
    }
    .await;

    if let Err(e) = written {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}
