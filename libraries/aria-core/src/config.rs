//! Aria configuration
//!
//! Loaded from an optional TOML file and overridden by `ARIA__*` environment
//! variables (e.g. `ARIA__CACHE__QUOTA_BYTES=1073741824`). Every field has a
//! default so an empty configuration is valid.

use crate::error::{CoreError, Result};
use crate::types::Song;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AriaConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub downloads: DownloadSettings,

    #[serde(default)]
    pub streaming: StreamingSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerSettings {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default = "default_device_id")]
    pub device_id: String,

    /// Previously issued access token, if any
    #[serde(default)]
    pub access_token: Option<String>,

    /// User the access token belongs to
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Upper bound on bytes occupied by downloaded audio
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,

    /// SQLite file holding the durable download queue
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DownloadSettings {
    /// Concurrent fetches allowed by the download worker
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,

    /// Attempts before a failing entry is parked
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: u64,

    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Target bitrate for downloads (kbps); `None` keeps the original file
    #[serde(default)]
    pub bitrate: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamingSettings {
    /// Forces transcoding to this bitrate (kbps) for every stream
    #[serde(default)]
    pub max_bitrate: Option<u32>,

    /// Containers the platform engine plays without transcoding
    #[serde(default = "default_natively_playable")]
    pub natively_playable: Vec<String>,

    /// Bitrate (kbps) requested when the server has to transcode
    #[serde(default = "default_fallback_bitrate")]
    pub fallback_bitrate: u32,

    #[serde(default = "default_fallback_codec")]
    pub fallback_codec: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default = "default_history_size")]
    pub history_size: usize,

    /// Below this position "previous" goes back a song, above it restarts
    #[serde(default = "default_threshold_ms")]
    pub skip_back_threshold_ms: u64,

    /// Minimum position a song must reach to be recorded in history
    #[serde(default = "default_threshold_ms")]
    pub history_threshold_ms: u64,

    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    #[serde(default)]
    pub seek_tolerance_ms: u64,
}

impl AriaConfig {
    /// Load configuration from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(CoreError::invalid_input(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path.to_path_buf()));
        }

        // Override with environment variables (prefixed with ARIA__)
        settings = settings.add_source(
            config::Environment::with_prefix("ARIA")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.downloads.max_concurrent_downloads == 0 {
            return Err(CoreError::invalid_input(
                "downloads.max_concurrent_downloads must be at least 1",
            ));
        }

        if self.downloads.max_attempts == 0 {
            return Err(CoreError::invalid_input(
                "downloads.max_attempts must be at least 1",
            ));
        }

        if !self.server.url.is_empty()
            && !self.server.url.starts_with("http://")
            && !self.server.url.starts_with("https://")
        {
            return Err(CoreError::invalid_input(
                "server.url must start with http:// or https://",
            ));
        }

        Ok(())
    }
}

impl StreamingSettings {
    /// Bitrate to request for a stream of `song`
    ///
    /// `None` asks for the original file: only when the container is natively
    /// playable and no override is configured.
    pub fn bitrate_for(&self, song: &Song) -> Option<u32> {
        if let Some(max) = self.max_bitrate {
            return Some(max);
        }

        let native = self
            .natively_playable
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&song.container));

        if native {
            None
        } else {
            Some(self.fallback_bitrate)
        }
    }
}

impl DownloadSettings {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_secs(self.base_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }
}

impl PlaybackSettings {
    pub fn skip_back_threshold(&self) -> Duration {
        Duration::from_millis(self.skip_back_threshold_ms)
    }

    pub fn history_threshold(&self) -> Duration {
        Duration::from_millis(self.history_threshold_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs.max(1))
    }

    pub fn seek_tolerance(&self) -> Duration {
        Duration::from_millis(self.seek_tolerance_ms)
    }
}

// Default values
fn default_device_id() -> String {
    "aria-device".to_string()
}

fn default_cache_directory() -> PathBuf {
    PathBuf::from("./data/cache")
}

fn default_quota_bytes() -> u64 {
    2 * 1024 * 1024 * 1024
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./data/aria.db")
}

fn default_max_concurrent_downloads() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff_secs() -> u64 {
    5
}

fn default_max_backoff_secs() -> u64 {
    300
}

fn default_natively_playable() -> Vec<String> {
    ["mp3", "aac", "m4a", "flac", "alac", "wav"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_fallback_bitrate() -> u32 {
    320
}

fn default_fallback_codec() -> String {
    "aac".to_string()
}

fn default_history_size() -> usize {
    50
}

fn default_threshold_ms() -> u64 {
    3000
}

fn default_progress_interval_secs() -> u64 {
    10
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: None,
            device_id: default_device_id(),
            access_token: None,
            user_id: None,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            quota_bytes: default_quota_bytes(),
            database_path: default_database_path(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_concurrent_downloads(),
            max_attempts: default_max_attempts(),
            base_backoff_secs: default_base_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            bitrate: None,
        }
    }
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            max_bitrate: None,
            natively_playable: default_natively_playable(),
            fallback_bitrate: default_fallback_bitrate(),
            fallback_codec: default_fallback_codec(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            history_size: default_history_size(),
            skip_back_threshold_ms: default_threshold_ms(),
            history_threshold_ms: default_threshold_ms(),
            progress_interval_secs: default_progress_interval_secs(),
            seek_tolerance_ms: 0,
        }
    }
}
