//! Platform audio session and now-playing seams

use std::time::Duration;
use thiserror::Error;

/// Failure reported by the platform audio session
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SessionError(pub String);

/// Interruptions reported by the platform (calls, other apps)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    InterruptionBegan,
    InterruptionEnded { should_resume: bool },
}

/// Platform audio session
pub trait AudioSession: Send + Sync {
    /// Declare the playback category; called once before the first activation
    fn configure(&mut self) -> Result<(), SessionError>;

    fn activate(&mut self) -> Result<(), SessionError>;

    fn deactivate(&mut self) -> Result<(), SessionError>;
}

/// What the system's now-playing surface shows
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration: Duration,
    pub elapsed: Duration,
    pub rate: f32,
    pub buffering: bool,
}

/// System now-playing surface (lock screen, media keys)
pub trait NowPlayingCenter: Send + Sync {
    /// Show `info`, or clear the surface with `None`
    fn update(&mut self, info: Option<NowPlayingInfo>);
}

/// Now-playing surface that shows nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNowPlaying;

impl NowPlayingCenter for NoNowPlaying {
    fn update(&mut self, _info: Option<NowPlayingInfo>) {}
}
