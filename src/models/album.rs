//! Persisted per-album metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size hint recorded after each successful resolution of an album.
///
/// Only used to decide whether the lightweight strategy is worth trying.
/// A stale value costs at most one extra heavy scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumMetadata {
    /// Album reference the hint belongs to
    pub album_id: String,
    /// Number of items the last resolution saw
    pub observed_size: usize,
    /// When the hint was recorded
    pub observed_at: DateTime<Utc>,
}
