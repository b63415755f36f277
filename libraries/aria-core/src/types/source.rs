//! Playable sources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Where the audio for a song is read from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaSource {
    /// File in the local cache
    Local(PathBuf),

    /// Streaming URL issued by the media server
    Remote(String),
}

impl MediaSource {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "file://{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}
