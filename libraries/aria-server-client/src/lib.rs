//! Aria Server Client
//!
//! HTTP client for Jellyfin-compatible media servers.
//!
//! # Features
//!
//! - **Authentication**: Login with username/password, token validation
//! - **Catalog**: Album listings and item lookups
//! - **Streaming**: Tokenized universal-audio URLs with optional bitrate cap
//! - **Download**: Original or transcoded files streamed to disk
//! - **Reporting**: Playback start, progress, stop and played markers
//!
//! [`MediaServerClient`] implements [`aria_core::RemoteMediaService`] and
//! [`aria_core::CatalogRepository`], so it plugs directly into the download
//! queue and the playback orchestrator.
//!
//! # Example
//!
//! ```no_run
//! use aria_core::{AlbumId, CatalogRepository};
//! use aria_server_client::{MediaServerClient, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MediaServerClient::new(ServerConfig::new("https://music.example.com"))?;
//!     client.login("user", "password").await?;
//!
//!     let songs = client.songs_in_album(&AlbumId::new("album-id")).await?;
//!     println!("Found {} songs", songs.len());
//!
//!     Ok(())
//! }
//! ```

mod auth;
mod client;
mod download;
mod error;
mod library;
mod remote;
mod sessions;
mod types;

pub use client::MediaServerClient;
pub use error::{Result, ServerClientError};
pub use types::{
    DownloadProgress, ItemsResponse, LoginResponse, MediaSourceInfo, PlaybackInfo, ServerConfig,
    ServerInfo, ServerItem, UserInfo,
};
