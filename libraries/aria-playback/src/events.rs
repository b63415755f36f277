//! Events emitted by the player to UI observers

use crate::types::{SessionState, TransportState};
use aria_core::{Song, SongId};

/// Player events
///
/// Delivered on a broadcast channel; the latest full state is always
/// available from the snapshot channel as well.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Transport or session state changed
    StateChanged {
        transport: TransportState,
        session: SessionState,
    },

    /// The current song changed
    SongChanged {
        previous: Option<SongId>,
        current: Option<Song>,
    },

    /// Upcoming songs changed
    QueueChanged { up_next: usize },

    /// A song entered the history
    HistoryChanged { len: usize },

    /// Buffering started or stopped
    BufferingChanged(bool),

    /// Something the user should be told about
    Alert { message: String },
}
