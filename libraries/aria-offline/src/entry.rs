//! Download queue entries and their processing order

use aria_core::{AlbumId, Song, SongId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pending song download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadEntry {
    pub song: Song,
    /// Target bitrate in kbps; `None` fetches the original file
    pub bitrate: Option<u32>,
    /// Failed attempts so far
    pub attempts: u32,
    pub last_error: Option<String>,
    /// Earliest time the entry may be retried
    pub next_attempt_at: Option<DateTime<Utc>>,
    pub enqueued_at: DateTime<Utc>,
    /// Monotonic enqueue counter
    pub sequence: i64,
}

impl DownloadEntry {
    pub fn new(song: Song, bitrate: Option<u32>, sequence: i64) -> Self {
        Self {
            song,
            bitrate,
            attempts: 0,
            last_error: None,
            next_attempt_at: None,
            enqueued_at: Utc::now(),
            sequence,
        }
    }

    pub fn song_id(&self) -> &SongId {
        &self.song.id
    }

    /// Whether the back-off for this entry has elapsed
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_attempt_at.map_or(true, |at| at <= now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Group {
    Album(AlbumId),
    Single(SongId),
}

impl Group {
    fn of(entry: &DownloadEntry) -> Self {
        match &entry.song.album_id {
            Some(album) => Self::Album(album.clone()),
            None => Self::Single(entry.song.id.clone()),
        }
    }
}

/// Sort entries into download order
///
/// Songs of one album are contiguous; albums come in order of their first
/// enqueued song; within an album songs go by disc, then index.
pub fn sort_for_download(entries: &mut [DownloadEntry]) {
    let mut first_seen: HashMap<Group, i64> = HashMap::new();
    for entry in entries.iter() {
        let seq = first_seen.entry(Group::of(entry)).or_insert(entry.sequence);
        *seq = (*seq).min(entry.sequence);
    }

    entries.sort_by_cached_key(|entry| {
        let group = first_seen
            .get(&Group::of(entry))
            .copied()
            .unwrap_or(entry.sequence);
        let (disc, index) = entry.song.album_position();
        (group, disc, index, entry.sequence)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    fn entry(id: &str, album: Option<(&str, u32, u32)>, sequence: i64) -> DownloadEntry {
        let mut song = Song::new(id, id, Duration::from_secs(1), 1, "mp3");
        if let Some((album, disc, index)) = album {
            song = song.on_album(album, disc, index);
        }
        DownloadEntry::new(song, None, sequence)
    }

    fn ids(entries: &[DownloadEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.song_id().as_str()).collect()
    }

    #[test]
    fn albums_are_grouped_in_first_enqueue_order() {
        let mut entries = vec![
            entry("b2", Some(("b", 1, 2)), 0),
            entry("a1", Some(("a", 1, 1)), 1),
            entry("single", None, 2),
            entry("b1", Some(("b", 1, 1)), 3),
            entry("a2", Some(("a", 1, 2)), 4),
        ];

        sort_for_download(&mut entries);

        assert_eq!(ids(&entries), ["b1", "b2", "a1", "a2", "single"]);
    }

    #[test]
    fn disc_orders_before_index() {
        let mut entries = vec![
            entry("d2t1", Some(("x", 2, 1)), 0),
            entry("d1t9", Some(("x", 1, 9)), 1),
        ];

        sort_for_download(&mut entries);

        assert_eq!(ids(&entries), ["d1t9", "d2t1"]);
    }

    fn arbitrary_entries() -> impl Strategy<Value = Vec<DownloadEntry>> {
        prop::collection::vec((proptest::option::of(0u8..4), 1u32..3, 1u32..20), 0..40).prop_map(
            |specs| {
                specs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (album, disc, index))| {
                        let album = album.map(|a| format!("album-{a}"));
                        entry(
                            &format!("song-{i}"),
                            album.as_deref().map(|a| (a, disc, index)),
                            i as i64,
                        )
                    })
                    .collect()
            },
        )
    }

    proptest! {
        /// Property: every album forms one contiguous run, ordered by disc then index
        #[test]
        fn albums_are_contiguous_and_ordered(mut entries in arbitrary_entries()) {
            let before = entries.len();
            sort_for_download(&mut entries);
            prop_assert_eq!(entries.len(), before);

            let mut finished: Vec<&AlbumId> = Vec::new();
            let mut current: Option<&AlbumId> = None;
            let mut last_position = (0, 0);

            for e in &entries {
                let album = e.song.album_id.as_ref();
                if album != current {
                    if let Some(done) = current {
                        finished.push(done);
                    }
                    if let Some(next) = album {
                        prop_assert!(!finished.contains(&next), "album {} split", next);
                    }
                    current = album;
                    last_position = (0, 0);
                }
                if album.is_some() {
                    prop_assert!(e.song.album_position() >= last_position);
                    last_position = e.song.album_position();
                }
            }
        }
    }
}
