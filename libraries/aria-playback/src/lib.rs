//! Aria - Playback Orchestration
//!
//! Platform-agnostic playback control on top of a platform queue player.
//!
//! This crate provides:
//! - The playback state machine (stopped, playing, paused)
//! - Audio session lifecycle and interruption handling
//! - Bounded playback history and skip-backward
//! - Local-first source resolution through the offline cache
//! - Playback reporting to the media server
//!
//! # Architecture
//!
//! `aria-playback` never produces audio itself. The platform supplies:
//! - [`PlaybackEngine`]: the queue player, reporting [`EngineEvent`]s on a channel
//! - [`AudioSession`]: category and activation, reporting [`SessionEvent`]s
//! - [`NowPlayingCenter`]: lock screen / media key surface (optional)
//!
//! [`PlaybackOrchestrator`] owns the state; [`PlayerService`] runs it on a
//! task and hands out cloneable [`PlayerHandle`]s.
//!
//! # Example: Platform Integration
//!
//! ```rust,no_run
//! use aria_playback::{
//!     AudioSession, EngineItem, InsertPosition, PlaybackEngine, Result, SessionError,
//! };
//! use std::time::Duration;
//!
//! struct MyEngine;
//!
//! impl PlaybackEngine for MyEngine {
//!     fn append(&mut self, items: Vec<EngineItem>, position: InsertPosition) -> Result<()> {
//!         // Hand items to the platform player
//!         Ok(())
//!     }
//!     fn clear(&mut self, keep_current: bool) {}
//!     fn advance_to_next(&mut self) {}
//!     fn seek(&mut self, to: Duration, tolerance: Duration) -> Result<()> { Ok(()) }
//!     fn current_time(&self) -> Duration { Duration::ZERO }
//!     fn current_item(&self) -> Option<EngineItem> { None }
//!     fn items(&self) -> Vec<EngineItem> { Vec::new() }
//!     fn play(&mut self) {}
//!     fn pause(&mut self) {}
//!     fn rate(&self) -> f32 { 0.0 }
//!     fn volume(&self) -> f32 { 1.0 }
//! }
//!
//! struct MySession;
//!
//! impl AudioSession for MySession {
//!     fn configure(&mut self) -> std::result::Result<(), SessionError> { Ok(()) }
//!     fn activate(&mut self) -> std::result::Result<(), SessionError> { Ok(()) }
//!     fn deactivate(&mut self) -> std::result::Result<(), SessionError> { Ok(()) }
//! }
//! ```

#![forbid(unsafe_code)]

mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod history;
pub mod orchestrator;
pub mod service;
pub mod session;
pub mod types;

pub use engine::{
    EngineEvent, EngineItem, EngineStatus, InsertPosition, ItemKey, PlaybackEngine, WaitingReason,
};
pub use error::{PlaybackError, Result};
pub use events::PlayerEvent;
pub use history::History;
pub use orchestrator::PlaybackOrchestrator;
pub use service::{PlayerCommand, PlayerHandle, PlayerService};
pub use session::{
    AudioSession, NoNowPlaying, NowPlayingCenter, NowPlayingInfo, SessionError, SessionEvent,
};
pub use types::{PlayRequest, PlayerConfig, PlayerSnapshot, SessionState, TransportState};
