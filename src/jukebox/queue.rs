//! Per-session song queue and now-playing state.
//!
//! ```text
//!   Empty --admit--> Queued --start--> Playing --advance--> Queued | Empty
//! ```
//!
//! `admit` and `play_direct` consult the catalogue, so callers on the async
//! side run them on the blocking pool.

use serde::Serialize;

use super::background::DEFAULT_THEME;
use super::catalogue::{Catalogue, ResolvedSong};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Empty,
    Queued,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Already waiting in the queue
    Duplicate,
    /// Not in the catalogue, or the file is empty
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Carries a snapshot of the queue after the append
    Admitted(Vec<String>),
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Advance {
    Next { next_song: String },
    Empty,
}

/// Ordered, duplicate-free list of song identifiers. Insertion order is play
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SongQueue {
    songs: Vec<String>,
}

impl SongQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, song: &str) -> bool {
        self.songs.iter().any(|s| s == song)
    }

    pub fn head(&self) -> Option<&str> {
        self.songs.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// 1-based position of `song`
    pub fn position(&self, song: &str) -> Option<usize> {
        self.songs.iter().position(|s| s == song).map(|i| i + 1)
    }

    /// Appends `song` unless it is already queued. Returns whether it was added.
    pub fn push(&mut self, song: &str) -> bool {
        if self.contains(song) {
            return false;
        }
        self.songs.push(song.to_string());
        true
    }

    /// Removes `song` if present. Returns whether anything was removed.
    pub fn remove(&mut self, song: &str) -> bool {
        match self.songs.iter().position(|s| s == song) {
            Some(index) => {
                self.songs.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.songs
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.songs.clone()
    }
}

impl<S: Into<String>> FromIterator<S> for SongQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut queue = SongQueue::new();
        for song in iter {
            let song = song.into();
            queue.push(&song);
        }
        queue
    }
}

/// Everything one client session remembers between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlaybackState {
    pub queue: SongQueue,
    pub current_song: Option<String>,
    pub background_folder: String,
}

impl Default for SessionPlaybackState {
    fn default() -> Self {
        Self {
            queue: SongQueue::new(),
            current_song: None,
            background_folder: DEFAULT_THEME.to_string(),
        }
    }
}

impl SessionPlaybackState {
    pub fn phase(&self) -> PlaybackPhase {
        match (&self.current_song, self.queue.is_empty()) {
            (Some(_), _) => PlaybackPhase::Playing,
            (None, false) => PlaybackPhase::Queued,
            (None, true) => PlaybackPhase::Empty,
        }
    }

    /// Validates `song` and appends it to the queue.
    ///
    /// The duplicate check runs first so a queued song is never looked up
    /// again.
    pub fn admit(&mut self, song: &str, catalogue: &Catalogue) -> Admission {
        if self.queue.contains(song) {
            tracing::debug!("Rejecting duplicate song {}", song);
            return Admission::Rejected(RejectReason::Duplicate);
        }

        match catalogue.resolve(song) {
            Some(resolved) if resolved.size > 0 => {}
            Some(_) => {
                tracing::debug!("Rejecting empty video for song {}", song);
                return Admission::Rejected(RejectReason::Invalid);
            }
            None => {
                tracing::debug!("Rejecting unknown song {}", song);
                return Admission::Rejected(RejectReason::Invalid);
            }
        }

        self.queue.push(song);
        Admission::Admitted(self.queue.to_vec())
    }

    /// Promotes the head of the queue to the current song when it resolves.
    /// Returns the resolved video, or `None` when the queue is empty or the
    /// head has vanished from the catalogue.
    pub fn start(&mut self, catalogue: &Catalogue) -> Option<ResolvedSong> {
        let head = self.queue.head()?.to_string();
        let resolved = catalogue.resolve(&head)?;
        self.current_song = Some(head);
        Some(resolved)
    }

    /// Drops the current song from the queue and reports what comes next.
    /// Loading the next song is left to the following `start`.
    pub fn advance(&mut self) -> Advance {
        if let Some(current) = self.current_song.take() {
            self.queue.remove(&current);
        }

        match self.queue.head() {
            Some(next) => Advance::Next {
                next_song: next.to_string(),
            },
            None => Advance::Empty,
        }
    }

    /// Plays `song` right away, bypassing the queue entirely.
    pub fn play_direct(&mut self, song: &str, catalogue: &Catalogue) -> Option<ResolvedSong> {
        let resolved = catalogue.resolve(song)?;
        self.current_song = Some(song.to_string());
        Some(resolved)
    }

    /// 1-based position of the current song and the queue length, when the
    /// current song is queued.
    pub fn queue_position(&self) -> Option<(usize, usize)> {
        let current = self.current_song.as_deref()?;
        self.queue
            .position(current)
            .map(|position| (position, self.queue.len()))
    }
}
