//! Catalog queries and favorites.

use crate::auth::TOKEN_HEADER;
use crate::client::Credentials;
use crate::error::{Result, ServerClientError};
use crate::types::{ItemsResponse, ServerItem};
use aria_core::{Album, Song};
use reqwest::{Client, StatusCode};
use tracing::debug;

/// Library client for the media server.
pub struct LibraryClient<'a> {
    http: &'a Client,
    credentials: &'a Credentials,
}

impl<'a> LibraryClient<'a> {
    pub(crate) fn new(http: &'a Client, credentials: &'a Credentials) -> Self {
        Self { http, credentials }
    }

    /// Songs of an album, ordered by disc then track number.
    pub async fn album_songs(&self, album_id: &str) -> Result<Vec<Song>> {
        let url = format!(
            "{}/Users/{}/Items",
            self.credentials.url, self.credentials.user_id
        );
        debug!(url = %url, album_id = %album_id, "Fetching album songs");

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.credentials.token)
            .query(&[
                ("ParentId", album_id),
                ("IncludeItemTypes", "Audio"),
                ("Recursive", "true"),
                ("SortBy", "ParentIndexNumber,IndexNumber,SortName"),
                ("Fields", "MediaSources"),
            ])
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        if !response.status().is_success() {
            return Err(ServerClientError::from_response(response, album_id).await);
        }

        let items: ItemsResponse = response.json().await.map_err(|e| {
            ServerClientError::ParseError(format!("Failed to parse album items: {e}"))
        })?;

        let mut songs: Vec<Song> = items.items.into_iter().map(ServerItem::into_song).collect();
        songs.sort_by_key(Song::album_position);

        debug!(album_id = %album_id, songs = songs.len(), "Fetched album songs");
        Ok(songs)
    }

    /// Fetch a single item, `None` if the server does not know it.
    pub async fn item(&self, item_id: &str) -> Result<Option<ServerItem>> {
        let url = format!(
            "{}/Users/{}/Items/{}",
            self.credentials.url, self.credentials.user_id, item_id
        );
        debug!(url = %url, item_id = %item_id, "Fetching item");

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.credentials.token)
            .query(&[("Fields", "MediaSources")])
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            Ok(None)
        } else if status.is_success() {
            let item = response.json().await.map_err(|e| {
                ServerClientError::ParseError(format!("Failed to parse item: {e}"))
            })?;
            Ok(Some(item))
        } else {
            Err(ServerClientError::from_response(response, item_id).await)
        }
    }

    pub async fn song(&self, song_id: &str) -> Result<Option<Song>> {
        Ok(self.item(song_id).await?.map(ServerItem::into_song))
    }

    pub async fn album(&self, album_id: &str) -> Result<Option<Album>> {
        Ok(self.item(album_id).await?.map(ServerItem::into_album))
    }

    /// Mark or unmark an item as favorite.
    pub async fn set_favorite(&self, item_id: &str, favorite: bool) -> Result<()> {
        let url = format!(
            "{}/Users/{}/FavoriteItems/{}",
            self.credentials.url, self.credentials.user_id, item_id
        );
        debug!(url = %url, item_id = %item_id, favorite, "Setting favorite");

        let request = if favorite {
            self.http.post(&url)
        } else {
            self.http.delete(&url)
        };

        let response = request
            .header(TOKEN_HEADER, &self.credentials.token)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServerClientError::from_response(response, item_id).await)
        }
    }
}
