//! Types for media server API requests and responses.
//!
//! The server speaks the Jellyfin dialect: PascalCase JSON and durations in
//! ticks of 100 ns.

use aria_core::{Album, AlbumId, ServerSettings, Song, StreamingSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ticks per microsecond
const TICKS_PER_MICRO: u64 = 10;

pub(crate) fn to_ticks(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros())
        .unwrap_or(u64::MAX)
        .saturating_mul(TICKS_PER_MICRO)
}

pub(crate) fn from_ticks(ticks: u64) -> Duration {
    Duration::from_micros(ticks / TICKS_PER_MICRO)
}

/// Configuration for connecting to a media server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the server (e.g., "https://music.example.com")
    pub url: String,
    /// Current access token (if authenticated)
    pub access_token: Option<String>,
    /// User the token belongs to
    pub user_id: Option<String>,
    /// Stable identifier of this installation
    pub device_id: String,
    /// Containers the local player decodes without transcoding
    pub natively_playable: Vec<String>,
    /// Codec requested when the server has to transcode
    pub transcoding_codec: String,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        let streaming = StreamingSettings::default();
        Self {
            url: url.into(),
            access_token: None,
            user_id: None,
            device_id: "aria-device".to_string(),
            natively_playable: streaming.natively_playable,
            transcoding_codec: streaming.fallback_codec,
        }
    }

    /// Create a config with an existing session.
    pub fn with_token(
        url: impl Into<String>,
        access_token: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            user_id: Some(user_id.into()),
            ..Self::new(url)
        }
    }

    /// Build from the `server` and `streaming` configuration sections.
    pub fn from_settings(server: &ServerSettings, streaming: &StreamingSettings) -> Self {
        Self {
            url: server.url.clone(),
            access_token: server.access_token.clone(),
            user_id: server.user_id.clone(),
            device_id: server.device_id.clone(),
            natively_playable: streaming.natively_playable.clone(),
            transcoding_codec: streaming.fallback_codec.clone(),
        }
    }
}

// =============================================================================
// Authentication Types
// =============================================================================

/// Request body for `/Users/AuthenticateByName`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub username: String,
    pub pw: String,
}

/// Response from successful login.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub user: UserInfo,
    #[serde(default)]
    pub server_id: Option<String>,
}

/// User record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

/// Public server information.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    pub server_name: String,
    pub version: String,
    pub id: String,
}

// =============================================================================
// Library Types
// =============================================================================

/// Media file behind an item.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MediaSourceInfo {
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Library item (song or album).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerItem {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "Type")]
    pub item_type: Option<String>,
    #[serde(default)]
    pub album_id: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub album_artist: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    #[serde(default)]
    pub run_time_ticks: Option<u64>,
    /// Track number
    #[serde(default)]
    pub index_number: Option<u32>,
    /// Disc number
    #[serde(default)]
    pub parent_index_number: Option<u32>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub media_sources: Vec<MediaSourceInfo>,
    #[serde(default)]
    pub child_count: Option<u32>,
}

impl ServerItem {
    /// Convert an audio item to a song record
    pub fn into_song(self) -> Song {
        let source = self.media_sources.into_iter().next().unwrap_or_default();
        let container = source
            .container
            .or(self.container)
            .unwrap_or_else(|| "mp3".to_string());

        let mut song = Song::new(
            self.id,
            self.name,
            self.run_time_ticks.map(from_ticks).unwrap_or_default(),
            source.size.unwrap_or(0),
            container,
        );
        song.artist = self.artists.into_iter().next().or(self.album_artist);
        song.album = self.album;
        song.album_id = self.album_id.map(AlbumId::new);
        song.index = self.index_number;
        song.disc = self.parent_index_number;
        song
    }

    /// Convert an album item to an album record
    pub fn into_album(self) -> Album {
        Album {
            id: AlbumId::new(self.id),
            name: self.name,
            artist: self.album_artist,
            song_count: self.child_count.unwrap_or(0),
        }
    }
}

/// Paged item query response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    pub items: Vec<ServerItem>,
    #[serde(default)]
    pub total_record_count: u32,
}

// =============================================================================
// Playback Reporting Types
// =============================================================================

/// Body of `/Sessions/Playing[/Progress|/Stopped]`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackInfo {
    pub item_id: String,
    pub position_ticks: u64,
    pub is_paused: bool,
    pub volume_level: u8,
    pub can_seek: bool,
}

impl From<&aria_core::PlaybackReport> for PlaybackInfo {
    fn from(report: &aria_core::PlaybackReport) -> Self {
        Self {
            item_id: report.song_id.to_string(),
            position_ticks: to_ticks(report.position),
            is_paused: report.is_paused,
            volume_level: report.volume,
            can_seek: true,
        }
    }
}

// =============================================================================
// Download Types
// =============================================================================

/// Download progress information.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    pub song_id: String,
    pub bytes_received: u64,
    pub bytes_total: Option<u64>,
    /// 0.0 - 1.0, or 0.0 when the size is unknown
    pub progress: f32,
}
