//! Persistent key-value storage on `SQLite` (blocklist and album metadata)
//!
//! Each dataset gets its own database file. Writes are synchronous: a
//! mutation is on disk before the call returns, so a crash loses at most
//! the write in flight.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::Result;
use crate::models::AlbumMetadata;

/// Durable string-keyed store with JSON values
pub struct KvStore {
    conn: Mutex<Connection>,
}

impl KvStore {
    /// Open or create the store at a specific path
    pub fn open_path(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init()?;

        Ok(store)
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the schema
    fn init(&self) -> Result<()> {
        self.conn().execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves nothing half-applied in SQLite
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Read and deserialize a value. Unreadable values count as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, "Ignoring unreadable stored value: {e}");
                None
            }
        }))
    }

    /// Serialize and store a value, replacing any previous one
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.conn().execute(
            r"INSERT OR REPLACE INTO entries (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// All keys in the store
    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt.query_map([], |row| row.get(0))?;
        keys.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Number of entries
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

// ==================== Blocklist ====================

/// URLs known to be unusable (videos, portrait or square photos).
///
/// Append-only. Membership is mirrored in memory so the check that gates
/// every network fetch never touches the disk.
pub struct Blocklist {
    store: KvStore,
    blocked: Mutex<HashSet<String>>,
}

impl Blocklist {
    /// Load the blocklist from its store
    pub fn load(store: KvStore) -> Result<Self> {
        let blocked: HashSet<String> = store.keys()?.into_iter().collect();
        tracing::info!(entries = blocked.len(), "Blocklist loaded");
        Ok(Self {
            store,
            blocked: Mutex::new(blocked),
        })
    }

    /// Whether a URL has been blocked
    pub fn contains(&self, url: &str) -> bool {
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains(url)
    }

    /// Block a URL and persist the entry before returning
    pub fn insert(&self, url: &str) -> Result<()> {
        if self.contains(url) {
            return Ok(());
        }
        self.store.set(url, &true)?;
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(url.to_string());
        Ok(())
    }

    /// Number of blocked URLs
    pub fn len(&self) -> usize {
        self.blocked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Check if nothing is blocked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==================== Album metadata ====================

/// Per-album size hints
pub struct AlbumStore {
    store: KvStore,
}

impl AlbumStore {
    /// Wrap a store
    pub const fn new(store: KvStore) -> Self {
        Self { store }
    }

    /// Get the recorded metadata for an album
    pub fn get(&self, album_id: &str) -> Result<Option<AlbumMetadata>> {
        self.store.get(album_id)
    }

    /// Record metadata for an album
    pub fn put(&self, metadata: &AlbumMetadata) -> Result<()> {
        self.store.set(&metadata.album_id, metadata)
    }
}
