//! Durable storage for the download queue
//!
//! # Example
//!
//! ```rust,no_run
//! use aria_offline::{DownloadEntry, QueueStore, SqliteQueueStore};
//! use aria_core::Song;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteQueueStore::open("./data/aria.db").await?;
//!
//! let song = Song::new("42", "Intro", Duration::from_secs(93), 3_200_000, "flac");
//! store.insert(&DownloadEntry::new(song, None, 0)).await?;
//!
//! for entry in store.load().await? {
//!     println!("pending: {}", entry.song.title);
//! }
//! # Ok(())
//! # }
//! ```

use crate::entry::DownloadEntry;
use crate::error::StoreError;
use aria_core::{Song, SongId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

type Result<T> = std::result::Result<T, StoreError>;

/// Persistence seam for the download queue
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Every stored entry, in no particular order
    async fn load(&self) -> Result<Vec<DownloadEntry>>;

    /// Insert an entry; returns `false` if the song is already stored
    async fn insert(&self, entry: &DownloadEntry) -> Result<bool>;

    /// Overwrite the retry bookkeeping of a stored entry
    async fn update(&self, entry: &DownloadEntry) -> Result<()>;

    /// Remove an entry; returns `false` if it was not stored
    async fn remove(&self, song_id: &SongId) -> Result<bool>;

    async fn clear(&self) -> Result<()>;
}

/// SQLite-backed queue store
#[derive(Debug, Clone)]
pub struct SqliteQueueStore {
    pool: SqlitePool,
}

impl SqliteQueueStore {
    /// Open (or create) the database file at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database (for testing)
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        const MIGRATIONS: &[&str] =
            &[include_str!("../migrations/20260101000001_create_download_queue.sql")];

        for migration in MIGRATIONS {
            sqlx::raw_sql(migration).execute(pool).await?;
        }

        debug!("Download queue schema ready");
        Ok(())
    }

    fn decode(row: &SqliteRow) -> Result<DownloadEntry> {
        let song: String = row.try_get("song")?;
        let song: Song = serde_json::from_str(&song)?;
        let bitrate: Option<i64> = row.try_get("bitrate")?;
        let attempts: i64 = row.try_get("attempts")?;
        let next_attempt_at: Option<i64> = row.try_get("next_attempt_at")?;
        let enqueued_at: i64 = row.try_get("enqueued_at")?;

        Ok(DownloadEntry {
            song,
            bitrate: bitrate.map(|b| b as u32),
            attempts: attempts as u32,
            last_error: row.try_get("last_error")?,
            next_attempt_at: next_attempt_at.map(from_millis).transpose()?,
            enqueued_at: from_millis(enqueued_at)?,
            sequence: row.try_get("sequence")?,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| StoreError::Serialization(format!("timestamp out of range: {millis}")))
}

#[async_trait]
impl QueueStore for SqliteQueueStore {
    async fn load(&self) -> Result<Vec<DownloadEntry>> {
        let rows = sqlx::query(
            r"
            SELECT song_id, song, bitrate, attempts, last_error, next_attempt_at, enqueued_at, sequence
            FROM download_queue
            ORDER BY sequence ASC
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::decode).collect()
    }

    async fn insert(&self, entry: &DownloadEntry) -> Result<bool> {
        let song = serde_json::to_string(&entry.song)?;

        let result = sqlx::query(
            r"
            INSERT INTO download_queue
                (song_id, song, bitrate, attempts, last_error, next_attempt_at, enqueued_at, sequence)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(song_id) DO NOTHING
            ",
        )
        .bind(entry.song_id().as_str())
        .bind(song)
        .bind(entry.bitrate.map(i64::from))
        .bind(i64::from(entry.attempts))
        .bind(entry.last_error.as_deref())
        .bind(entry.next_attempt_at.map(|t| t.timestamp_millis()))
        .bind(entry.enqueued_at.timestamp_millis())
        .bind(entry.sequence)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update(&self, entry: &DownloadEntry) -> Result<()> {
        sqlx::query(
            r"
            UPDATE download_queue
            SET attempts = ?, last_error = ?, next_attempt_at = ?
            WHERE song_id = ?
            ",
        )
        .bind(i64::from(entry.attempts))
        .bind(entry.last_error.as_deref())
        .bind(entry.next_attempt_at.map(|t| t.timestamp_millis()))
        .bind(entry.song_id().as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, song_id: &SongId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM download_queue WHERE song_id = ?")
            .bind(song_id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM download_queue")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Volatile queue store for tests and ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryQueueStore {
    entries: Mutex<HashMap<SongId, DownloadEntry>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<SongId, DownloadEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn load(&self) -> Result<Vec<DownloadEntry>> {
        let mut entries: Vec<_> = self.entries().values().cloned().collect();
        entries.sort_by_key(|e| e.sequence);
        Ok(entries)
    }

    async fn insert(&self, entry: &DownloadEntry) -> Result<bool> {
        let mut entries = self.entries();
        if entries.contains_key(entry.song_id()) {
            return Ok(false);
        }
        entries.insert(entry.song_id().clone(), entry.clone());
        Ok(true)
    }

    async fn update(&self, entry: &DownloadEntry) -> Result<()> {
        if let Some(stored) = self.entries().get_mut(entry.song_id()) {
            stored.attempts = entry.attempts;
            stored.last_error.clone_from(&entry.last_error);
            stored.next_attempt_at = entry.next_attempt_at;
        }
        Ok(())
    }

    async fn remove(&self, song_id: &SongId) -> Result<bool> {
        Ok(self.entries().remove(song_id).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}
