//! Playback reporting.

use crate::auth::TOKEN_HEADER;
use crate::client::Credentials;
use crate::error::{Result, ServerClientError};
use crate::types::PlaybackInfo;
use reqwest::Client;
use tracing::trace;

/// Playback reporting client for the media server.
pub struct SessionClient<'a> {
    http: &'a Client,
    credentials: &'a Credentials,
}

impl<'a> SessionClient<'a> {
    pub(crate) fn new(http: &'a Client, credentials: &'a Credentials) -> Self {
        Self { http, credentials }
    }

    pub async fn playing(&self, info: &PlaybackInfo) -> Result<()> {
        self.post("/Sessions/Playing", info).await
    }

    pub async fn progress(&self, info: &PlaybackInfo) -> Result<()> {
        self.post("/Sessions/Playing/Progress", info).await
    }

    pub async fn stopped(&self, info: &PlaybackInfo) -> Result<()> {
        self.post("/Sessions/Playing/Stopped", info).await
    }

    /// Mark an item as played for the current user.
    pub async fn mark_played(&self, item_id: &str) -> Result<()> {
        let url = format!(
            "{}/Users/{}/PlayedItems/{}",
            self.credentials.url, self.credentials.user_id, item_id
        );
        trace!(url = %url, "Marking item played");

        let response = self
            .http
            .post(&url)
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

    async fn post(&self, endpoint: &str, info: &PlaybackInfo) -> Result<()> {
        let url = format!("{}{}", self.credentials.url, endpoint);
        trace!(url = %url, item_id = %info.item_id, position_ticks = info.position_ticks, "Reporting playback");

        let response = self
            .http
            .post(&url)
            .header(TOKEN_HEADER, &self.credentials.token)
            .json(info)
            .send()
            .await
            .map_err(ServerClientError::from_send)?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ServerClientError::from_response(response, &info.item_id).await)
        }
    }
}
