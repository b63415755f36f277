//! Song and album records

use super::{AlbumId, SongId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A playable song
///
/// Immutable from the engine's point of view. The same record is the unit
/// of caching (size, container) and of playback (runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: Option<String>,
    pub album_id: Option<AlbumId>,
    pub album: Option<String>,
    /// Runtime as reported by the catalog
    #[serde(with = "duration_ms")]
    pub runtime: Duration,
    /// Size of the original file in bytes
    pub size_bytes: u64,
    /// Source codec/container extension, lowercase (e.g. "flac")
    pub container: String,
    /// Track number within its disc
    pub index: Option<u32>,
    pub disc: Option<u32>,
}

impl Song {
    /// Create a song with the fields the engine cannot work without
    pub fn new(
        id: impl Into<SongId>,
        title: impl Into<String>,
        runtime: Duration,
        size_bytes: u64,
        container: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: None,
            album_id: None,
            album: None,
            runtime,
            size_bytes,
            container: container.into().to_ascii_lowercase(),
            index: None,
            disc: None,
        }
    }

    /// Attach album placement (album, disc, index)
    #[must_use]
    pub fn on_album(mut self, album_id: impl Into<AlbumId>, disc: u32, index: u32) -> Self {
        self.album_id = Some(album_id.into());
        self.disc = Some(disc);
        self.index = Some(index);
        self
    }

    /// Sort key placing songs in album order (disc, then index)
    pub fn album_position(&self) -> (u32, u32) {
        (self.disc.unwrap_or(1), self.index.unwrap_or(u32::MAX))
    }
}

/// An album as seen by the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    pub name: String,
    pub artist: Option<String>,
    pub song_count: u32,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
