//! Playback engine adapter
//!
//! Seam over the platform's queue player. The adapter only sees opaque
//! items (a reference string plus a source); mapping references back to
//! songs is the orchestrator's job.
//!
//! Engines report what happens to them on an unbounded channel handed to
//! the player service, so events are observed strictly in emission order.

use crate::error::Result;
use aria_core::MediaSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Identity of one enqueued item
///
/// Two items for the same song (e.g. a fresh copy spliced in by
/// skip-backward) have different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey(u64);

impl ItemKey {
    fn next() -> Self {
        Self(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }
}

/// An item in the engine's queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineItem {
    pub key: ItemKey,
    /// Opaque reference the orchestrator maps back to a song
    pub reference: String,
    pub source: MediaSource,
}

impl EngineItem {
    /// New item with a fresh key
    pub fn new(reference: impl Into<String>, source: MediaSource) -> Self {
        Self {
            key: ItemKey::next(),
            reference: reference.into(),
            source,
        }
    }
}

/// Where appended items go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// After every queued item
    Last,
    /// Right after the current item
    Next,
}

/// Readiness of the current item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Unknown,
    ReadyToPlay,
    Failed,
}

/// Why the engine is not producing audio although asked to play
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingReason {
    Buffering,
    NetworkStalled,
    NoItem,
}

/// Observations reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CurrentItemChanged {
        previous: Option<EngineItem>,
        next: Option<EngineItem>,
    },
    RateChanged(f32),
    StatusChanged(EngineStatus),
    WaitingReasonChanged(Option<WaitingReason>),
    /// An item could not be played; the engine moves on by itself
    ItemFailed { item: EngineItem, message: String },
}

/// Platform queue player
pub trait PlaybackEngine: Send + Sync {
    /// Add items at `position`
    fn append(&mut self, items: Vec<EngineItem>, position: InsertPosition) -> Result<()>;

    /// Drop queued items, optionally keeping the current one
    fn clear(&mut self, keep_current: bool);

    /// Skip to the next queued item
    fn advance_to_next(&mut self);

    fn seek(&mut self, to: Duration, tolerance: Duration) -> Result<()>;

    /// Position within the current item
    fn current_time(&self) -> Duration;

    fn current_item(&self) -> Option<EngineItem>;

    /// Current item first, then the upcoming ones
    fn items(&self) -> Vec<EngineItem>;

    fn play(&mut self);

    fn pause(&mut self);

    /// 0.0 when paused or stalled
    fn rate(&self) -> f32;

    /// 0.0..=1.0
    fn volume(&self) -> f32;
}
