//! Streaming URLs and song downloads.

use crate::auth::TOKEN_HEADER;
use crate::client::Credentials;
use crate::error::{Result, ServerClientError};
use crate::types::DownloadProgress;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

/// Download client for the media server.
pub struct DownloadClient<'a> {
    http: &'a Client,
    credentials: &'a Credentials,
}

impl<'a> DownloadClient<'a> {
    pub(crate) fn new(http: &'a Client, credentials: &'a Credentials) -> Self {
        Self { http, credentials }
    }

    /// URL of the universal audio endpoint for a song.
    ///
    /// The token travels in the query so a platform player can fetch the
    /// URL without custom headers. With `bitrate_kbps` the server transcodes
    /// anything above that bitrate.
    pub fn stream_url(&self, song_id: &str, bitrate_kbps: Option<u32>) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/Audio/{}/universal", self.credentials.url, song_id))
            .map_err(|e| ServerClientError::InvalidUrl(e.to_string()))?;

        {
            let codec = self.credentials.transcoding_codec.as_str();
            let mut query = url.query_pairs_mut();
            query
                .append_pair("UserId", &self.credentials.user_id)
                .append_pair("DeviceId", &self.credentials.device_id)
                .append_pair("Container", &self.credentials.natively_playable.join(","))
                .append_pair("TranscodingContainer", codec)
                .append_pair("TranscodingProtocol", "http")
                .append_pair("AudioCodec", codec);
            if let Some(kbps) = bitrate_kbps {
                query.append_pair(
                    "MaxStreamingBitrate",
                    &u64::from(kbps).saturating_mul(1000).to_string(),
                );
            }
            query.append_pair("api_key", &self.credentials.token);
        }

        Ok(url)
    }

    /// Download a song file.
    ///
    /// # Arguments
    /// * `song_id` - The server item ID
    /// * `dest_path` - Where to save the file
    /// * `bitrate_kbps` - `None` for the original file, else a transcoded copy
    /// * `progress_callback` - Called for every received chunk
    ///
    /// Returns the container named by the response's `Content-Type`, if any.
    pub async fn download_song<F>(
        &self,
        song_id: &str,
        dest_path: &Path,
        bitrate_kbps: Option<u32>,
        mut progress_callback: F,
    ) -> Result<Option<String>>
    where
        F: FnMut(DownloadProgress),
    {
        let request = match bitrate_kbps {
            None => self
                .http
                .get(format!("{}/Items/{}/Download", self.credentials.url, song_id))
                .header(TOKEN_HEADER, &self.credentials.token),
            Some(_) => self.http.get(self.stream_url(song_id, bitrate_kbps)?),
        };
        debug!(song_id = %song_id, dest = %dest_path.display(), ?bitrate_kbps, "Downloading song");

        let response = request.send().await.map_err(ServerClientError::from_send)?;

        if !response.status().is_success() {
            return Err(ServerClientError::from_response(response, song_id).await);
        }

        // Get content length if available
        let total_size = response.content_length();
        let container = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(container_for_mime);

        if let Some(parent) = dest_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest_path).await?;
        let mut downloaded: u64 = 0;

        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            #[allow(clippy::cast_precision_loss)]
            let progress = total_size.map_or(0.0, |total| downloaded as f32 / total as f32);

            progress_callback(DownloadProgress {
                song_id: song_id.to_string(),
                bytes_received: downloaded,
                bytes_total: total_size,
                progress,
            });
        }

        file.flush().await?;

        info!(
            song_id = %song_id,
            dest = %dest_path.display(),
            size = downloaded,
            container = ?container,
            "Song downloaded"
        );

        Ok(container.map(str::to_string))
    }
}

/// File extension for an audio MIME type
fn container_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    let container = match essence.to_ascii_lowercase().as_str() {
        "audio/mpeg" | "audio/mp3" => "mp3",
        "audio/flac" | "audio/x-flac" => "flac",
        "audio/aac" | "audio/x-aac" => "aac",
        "audio/mp4" | "audio/x-m4a" | "audio/m4a" => "m4a",
        "audio/ogg" | "application/ogg" => "ogg",
        "audio/opus" => "opus",
        "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
        "audio/webm" => "webm",
        _ => return None,
    };
    Some(container)
}
