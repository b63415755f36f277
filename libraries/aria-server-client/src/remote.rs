//! Engine-facing trait implementations.

use crate::client::MediaServerClient;
use crate::types::PlaybackInfo;
use aria_core::{
    Album, AlbumId, CatalogRepository, PlaybackReport, RemoteMediaService, RemoteResult, Song,
    SongId,
};
use async_trait::async_trait;
use std::path::Path;

#[async_trait]
impl RemoteMediaService for MediaServerClient {
    async fn stream_url(&self, song_id: &SongId, bitrate: Option<u32>) -> RemoteResult<Option<String>> {
        let credentials = self.credentials().await?;
        let url = self
            .downloads(&credentials)
            .stream_url(song_id.as_str(), bitrate)?;
        Ok(Some(url.into()))
    }

    async fn download(&self, song_id: &SongId, destination: &Path, bitrate: Option<u32>) -> RemoteResult<Option<String>> {
        let credentials = self.credentials().await?;
        let container = self
            .downloads(&credentials)
            .download_song(song_id.as_str(), destination, bitrate, |_| {})
            .await?;
        Ok(container)
    }

    async fn report_playback_started(&self, report: &PlaybackReport) -> RemoteResult<()> {
        let credentials = self.credentials().await?;
        self.sessions(&credentials)
            .playing(&PlaybackInfo::from(report))
            .await?;
        Ok(())
    }

    async fn report_playback_progress(&self, report: &PlaybackReport) -> RemoteResult<()> {
        let credentials = self.credentials().await?;
        self.sessions(&credentials)
            .progress(&PlaybackInfo::from(report))
            .await?;
        Ok(())
    }

    async fn report_playback_stopped(&self, report: &PlaybackReport) -> RemoteResult<()> {
        let credentials = self.credentials().await?;
        self.sessions(&credentials)
            .stopped(&PlaybackInfo::from(report))
            .await?;
        Ok(())
    }

    async fn report_playback_finished(&self, report: &PlaybackReport) -> RemoteResult<()> {
        let credentials = self.credentials().await?;
        self.sessions(&credentials)
            .mark_played(report.song_id.as_str())
            .await?;
        Ok(())
    }

    async fn set_favorite(&self, item_id: &str, favorite: bool) -> RemoteResult<()> {
        let credentials = self.credentials().await?;
        self.library(&credentials)
            .set_favorite(item_id, favorite)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for MediaServerClient {
    async fn songs_in_album(&self, album_id: &AlbumId) -> RemoteResult<Vec<Song>> {
        let credentials = self.credentials().await?;
        Ok(self
            .library(&credentials)
            .album_songs(album_id.as_str())
            .await?)
    }

    async fn song(&self, id: &SongId) -> RemoteResult<Option<Song>> {
        let credentials = self.credentials().await?;
        Ok(self.library(&credentials).song(id.as_str()).await?)
    }

    async fn album(&self, id: &AlbumId) -> RemoteResult<Option<Album>> {
        let credentials = self.credentials().await?;
        Ok(self.library(&credentials).album(id.as_str()).await?)
    }
}
