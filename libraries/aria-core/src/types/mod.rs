//! Domain types shared by every Aria crate

mod ids;
mod song;
mod source;

pub use ids::{AlbumId, SongId};
pub use song::{Album, Song};
pub use source::MediaSource;
