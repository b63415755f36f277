/// Error types for the local cache and the download queue
use aria_core::{RemoteError, SongId};
use thiserror::Error;

/// Result type alias using `DownloadError`
pub type Result<T> = std::result::Result<T, DownloadError>;

/// Local cache errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Admitting the song would push the cache past its quota
    #[error("Cache quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: u64, available: u64 },

    /// Moving a finished download into place failed; the partial file was removed
    #[error("Failed to write {song_id} into the cache: {source}")]
    WriteFailed {
        song_id: SongId,
        #[source]
        source: std::io::Error,
    },

    /// Neither a cached file nor a streaming URL exists for the song
    #[error("No playable source for song {0}")]
    SourceUnresolved(SongId),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Whether a later attempt at the same write may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::WriteFailed { .. } | Self::Io(_) => true,
            Self::Remote(err) => err.is_transient(),
            Self::QuotaExceeded { .. } | Self::SourceUnresolved(_) => false,
        }
    }
}

/// Queue persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error from `SQLx`
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Download queue errors
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The entry was cancelled while its fetch was in flight
    #[error("Download cancelled")]
    Cancelled,

    #[error("Not found: {0}")]
    NotFound(String),
}
