//! Notification bus
//!
//! Process-wide publish/subscribe channel telling interested parties (UI,
//! catalog repository) that a song's on-disk or download status changed.
//! Publishers never know who is listening; a subscriber that falls behind
//! loses the oldest notifications instead of blocking the publisher.

use crate::types::SongId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default number of buffered notifications per subscriber
const DEFAULT_CAPACITY: usize = 256;

/// Song status notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A song finished downloading and is now served from the local cache
    SongDownloaded(SongId),

    /// A song's cached file was deleted
    SongFileDeleted(SongId),

    /// A download exhausted its attempts and was parked
    DownloadFailed { song_id: SongId, reason: String },
}

impl Notification {
    /// Song the notification is about
    pub fn song_id(&self) -> &SongId {
        match self {
            Self::SongDownloaded(id) | Self::SongFileDeleted(id) => id,
            Self::DownloadFailed { song_id, .. } => song_id,
        }
    }
}

/// Typed broadcast bus
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Debug, Clone)]
pub struct NotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl NotificationBus {
    /// Create a bus buffering up to `capacity` notifications per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a notification
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, notification: Notification) {
        trace!(?notification, "Publishing notification");
        let _ = self.sender.send(notification);
    }

    /// Subscribe to notifications published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
