//! Aria Core
//!
//! Shared building blocks for the Aria offline media engine.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `Song`, `Album` and their identifiers
//! - **Collaborator Traits**: `CatalogRepository`, `RemoteMediaService`
//! - **Notification Bus**: song status changes fanned out to every subscriber
//! - **Configuration**: `AriaConfig`, loaded from file and environment
//! - **Error Handling**: `CoreError` and the remote error taxonomy `RemoteError`
//!
//! # Example
//!
//! ```rust
//! use aria_core::{Notification, NotificationBus, Song, SongId};
//! use std::time::Duration;
//!
//! let bus = NotificationBus::default();
//! let mut rx = bus.subscribe();
//!
//! let song = Song::new("42", "Intro", Duration::from_secs(93), 3_200_000, "flac");
//! bus.publish(Notification::SongDownloaded(song.id.clone()));
//!
//! assert_eq!(rx.try_recv().unwrap().song_id(), &SongId::new("42"));
//! ```

#![forbid(unsafe_code)]

pub mod bus;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use bus::{Notification, NotificationBus};
pub use config::{
    AriaConfig, CacheSettings, DownloadSettings, PlaybackSettings, ServerSettings,
    StreamingSettings,
};
pub use error::{CoreError, RemoteError, Result};
pub use traits::{CatalogRepository, PlaybackReport, RemoteMediaService, RemoteResult};
pub use types::{Album, AlbumId, MediaSource, Song, SongId};
