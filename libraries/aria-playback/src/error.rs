//! Error types for playback orchestration

use aria_core::{RemoteError, SongId};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Neither a cached file nor a stream URL is available
    #[error("No playable source for song {0}")]
    SourceUnresolved(SongId),

    /// The platform audio session could not be configured
    #[error("Audio session configuration failed: {0}")]
    SessionConfigurationFailed(String),

    /// The platform audio session could not be activated
    #[error("Audio session activation failed: {0}")]
    SessionActivationFailed(String),

    #[error("Nothing to play")]
    NothingToPlay,

    /// The operation needs a current song
    #[error("No song is playing")]
    NoCurrentSong,

    /// The platform player rejected a request
    #[error("Playback engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The catalog has nothing for the request
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// The player service task has exited
    #[error("Player service stopped")]
    ServiceStopped,
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
