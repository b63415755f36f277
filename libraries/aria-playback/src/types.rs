//! Core types for playback orchestration

use aria_core::{AriaConfig, Song, StreamingSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    /// Nothing loaded
    #[default]
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-song
    Paused,
}

/// Platform audio session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Inactive,
    Configured,
    Active,
}

/// What `play` should do
#[derive(Debug, Clone, PartialEq)]
pub enum PlayRequest {
    /// Resume whatever is loaded
    Resume,

    /// Replace the queue with these songs
    ///
    /// With `preserve_queue`, songs that were upcoming stay queued after
    /// the new ones.
    Songs {
        songs: Vec<Song>,
        preserve_queue: bool,
    },
}

impl PlayRequest {
    /// Replace the queue with `songs`
    pub fn songs(songs: impl IntoIterator<Item = Song>) -> Self {
        Self::Songs {
            songs: songs.into_iter().collect(),
            preserve_queue: false,
        }
    }
}

/// Observable player state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerSnapshot {
    pub current_song: Option<Song>,
    pub is_playing: bool,
    pub transport: TransportState,
    pub session: SessionState,
    /// Oldest first
    pub history: Vec<Song>,
    pub up_next: Vec<Song>,
    pub buffering: bool,
}

/// Configuration for the playback orchestrator
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Maximum history size (default: 50)
    pub history_size: usize,

    /// Below this position skip-backward goes to the previous song
    pub skip_back_threshold: Duration,

    /// Minimum position for an outgoing song to enter the history
    pub history_threshold: Duration,

    /// Interval between progress reports while playing
    pub progress_interval: Duration,

    pub seek_tolerance: Duration,

    /// Stream URL policy for songs that are not cached
    pub streaming: StreamingSettings,
}

impl PlayerConfig {
    pub fn from_settings(config: &AriaConfig) -> Self {
        let playback = &config.playback;
        Self {
            history_size: playback.history_size,
            skip_back_threshold: playback.skip_back_threshold(),
            history_threshold: playback.history_threshold(),
            progress_interval: playback.progress_interval(),
            seek_tolerance: playback.seek_tolerance(),
            streaming: config.streaming.clone(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::from_settings(&AriaConfig::default())
    }
}
