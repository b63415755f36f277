/// Collaborator traits consumed by the download queue and the orchestrator
use crate::error::RemoteError;
use crate::types::{Album, AlbumId, Song, SongId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Result type for remote collaborators
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Catalog repository
///
/// Supplies song and album records. Implementations may be backed by a local
/// metadata cache, the media server, or both.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Songs of an album, ordered by disc then index
    async fn songs_in_album(&self, album_id: &AlbumId) -> RemoteResult<Vec<Song>>;

    /// Look up a single song
    async fn song(&self, id: &SongId) -> RemoteResult<Option<Song>>;

    /// Look up a single album
    async fn album(&self, id: &AlbumId) -> RemoteResult<Option<Album>>;
}

/// Playback lifecycle report sent to the media server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackReport {
    pub song_id: SongId,
    pub position: Duration,
    pub is_paused: bool,
    /// Volume level (0-100)
    pub volume: u8,
}

/// Remote media service
///
/// Issues streaming URLs, performs authenticated downloads and receives
/// playback reports. Network timeouts are the implementation's concern.
#[async_trait]
pub trait RemoteMediaService: Send + Sync {
    /// Streaming URL for a song; `bitrate` of `None` requests the original file
    async fn stream_url(&self, song_id: &SongId, bitrate: Option<u32>)
        -> RemoteResult<Option<String>>;

    /// Download a song to `destination`
    ///
    /// Returns the container of the delivered bytes when the server names
    /// one, which may differ from the song's own after transcoding.
    async fn download(
        &self,
        song_id: &SongId,
        destination: &Path,
        bitrate: Option<u32>,
    ) -> RemoteResult<Option<String>>;

    async fn report_playback_started(&self, report: &PlaybackReport) -> RemoteResult<()>;

    async fn report_playback_progress(&self, report: &PlaybackReport) -> RemoteResult<()>;

    async fn report_playback_stopped(&self, report: &PlaybackReport) -> RemoteResult<()>;

    /// Played through to the end or superseded by another song
    async fn report_playback_finished(&self, report: &PlaybackReport) -> RemoteResult<()>;

    /// Mark or unmark an item as favorite
    async fn set_favorite(&self, item_id: &str, favorite: bool) -> RemoteResult<()>;
}
