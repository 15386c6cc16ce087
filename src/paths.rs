//! Common paths for inkalbum data storage
//!
//! Everything lives in one data directory (default
//! `~/.local/share/inkalbum/`, overridable with `DATA_DIR`):
//! - blocklist.sqlite - URLs known to be videos or portrait shots
//! - albums.sqlite - Per-album size hints
//! - next.png - The pregenerated image served to the frame
//! - next.png.<uuid>.tmp - In-progress regenerations

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the pregenerated artifact
pub const ARTIFACT_NAME: &str = "next.png";

/// Suffix of in-progress artifact writes
pub const TEMP_SUFFIX: &str = ".tmp";

/// Get the default data directory (~/.local/share/inkalbum/)
pub fn default_data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .context("Could not determine data directory")?;
    Ok(base.join("inkalbum"))
}

/// Resolved locations of everything the service persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Use `root` as the data directory, creating it if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create data directory {}", root.display()))?;
        Ok(Self { root })
    }

    /// The data directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Blocklist database path
    pub fn blocklist_db(&self) -> PathBuf {
        self.root.join("blocklist.sqlite")
    }

    /// Album metadata database path
    pub fn albums_db(&self) -> PathBuf {
        self.root.join("albums.sqlite")
    }

    /// Canonical pregenerated image path
    pub fn artifact(&self) -> PathBuf {
        self.root.join(ARTIFACT_NAME)
    }

    /// A fresh, unique temporary sibling of the artifact.
    ///
    /// Unique per call so concurrent generations never share a file.
    pub fn artifact_temp(&self) -> PathBuf {
        self.root.join(format!(
            "{ARTIFACT_NAME}.{}{TEMP_SUFFIX}",
            uuid::Uuid::new_v4().simple()
        ))
    }

    /// Remove temp files abandoned by regenerations that never finished.
    ///
    /// Returns the number of files removed.
    pub fn remove_stale_temps(&self) -> Result<usize> {
        let prefix = format!("{ARTIFACT_NAME}.");
        let mut removed = 0;
        for entry in fs::read_dir(&self.root).context("Failed to list data directory")? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
                fs::remove_file(entry.path())
                    .with_context(|| format!("Failed to remove {name}"))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}
