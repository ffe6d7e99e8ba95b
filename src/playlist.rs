//! Ordered track lists as owned by the caller.
//!
//! The player never owns a playlist: callers hand one in when skipping, and
//! are free to shuffle it or toggle favorites in between.

use std::collections::HashSet;

use crate::track::{Track, TrackId};

/// Ordered tracks plus the ids the listener marked as favorite.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    tracks: Vec<Track>,
    favorites: HashSet<TrackId>,
}

impl Playlist {
    /// Creates a playlist of `tracks` in the given order, with no favorites.
    #[must_use]
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            favorites: HashSet::new(),
        }
    }

    /// Tracks in playing order.
    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track at `index`, if any.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Number of tracks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Position of the track with `id`, if it is in this playlist.
    #[must_use]
    pub fn position(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| track.id() == id)
    }

    /// Index of the track after `current`, wrapping to the first track.
    ///
    /// A track that is not in the playlist counts as sitting just before the
    /// first track. Returns `None` for an empty playlist.
    #[must_use]
    pub fn next_index(&self, current: Option<TrackId>) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        match current.and_then(|id| self.position(id)) {
            Some(position) if position + 1 < self.len() => Some(position + 1),
            _ => Some(0),
        }
    }

    /// Index of the track before `current`, wrapping to the last track.
    #[must_use]
    pub fn previous_index(&self, current: Option<TrackId>) -> Option<usize> {
        if self.is_empty() {
            return None;
        }

        match current.and_then(|id| self.position(id)) {
            Some(position) if position > 0 => Some(position - 1),
            _ => Some(self.len() - 1),
        }
    }

    /// Whether `current` is the last track of this playlist.
    #[must_use]
    pub fn is_last(&self, current: TrackId) -> bool {
        self.position(current)
            .is_some_and(|position| position + 1 == self.len())
    }

    /// Shuffles the track order in place.
    pub fn shuffle(&mut self) {
        fastrand::shuffle(&mut self.tracks);
        debug!("shuffled playlist of {} tracks", self.tracks.len());
    }

    /// Toggles the favorite flag of a track and returns the new value.
    ///
    /// Ids that are not in the playlist are ignored and return `false`.
    pub fn toggle_favorite(&mut self, id: TrackId) -> bool {
        if self.position(id).is_none() {
            warn!("cannot favorite track {id}: not in playlist");
            return false;
        }

        if self.favorites.remove(&id) {
            false
        } else {
            self.favorites.insert(id);
            true
        }
    }

    /// Whether the track with `id` is marked as favorite.
    #[must_use]
    pub fn is_favorite(&self, id: TrackId) -> bool {
        self.favorites.contains(&id)
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self::new(tracks)
    }
}
