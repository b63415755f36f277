//! Playback history tracking
//!
//! Maintains a bounded history of played songs for skip-backward

use aria_core::Song;
use std::collections::VecDeque;

/// Playback history with bounded size
///
/// Ring buffer that discards the oldest entries once full.
#[derive(Debug, Clone)]
pub struct History {
    /// Most recent at the back
    songs: VecDeque<Song>,
    max_size: usize,
}

impl History {
    pub fn new(max_size: usize) -> Self {
        Self {
            songs: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Append a song; the oldest one is dropped when full
    pub fn push(&mut self, song: Song) {
        if self.max_size == 0 {
            return;
        }
        if self.songs.len() >= self.max_size {
            self.songs.pop_front();
        }
        self.songs.push_back(song);
    }

    /// Most recent song, without removing it
    pub fn peek(&self) -> Option<&Song> {
        self.songs.back()
    }

    /// Remove and return the most recent song
    pub fn pop(&mut self) -> Option<Song> {
        self.songs.pop_back()
    }

    /// All songs, oldest first
    pub fn to_vec(&self) -> Vec<Song> {
        self.songs.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(50)
    }
}
