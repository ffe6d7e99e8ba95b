//! Candidate audio sources for a track.

use std::ops::Index;

use url::Url;

use crate::track::Track;

/// Ordered candidate sources for one playback session.
///
/// The list is the canonical source list rotated left by `track id mod N`,
/// so it always holds the same `N` sources as the canonical list, just in a
/// different order per track.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceList {
    sources: Vec<Url>,
    offset: usize,
}

impl SourceList {
    /// Builds the rotated candidate list for `track`.
    #[must_use]
    pub fn for_track(track: &Track, canonical: &[Url]) -> Self {
        let offset = if canonical.is_empty() {
            0
        } else {
            usize::try_from(track.id().0).map_or(0, |id| id % canonical.len())
        };

        let mut sources = canonical.to_vec();
        sources.rotate_left(offset);

        Self { sources, offset }
    }

    /// Position in the canonical list that this list starts at.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Url> {
        self.sources.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Url> {
        self.sources.iter()
    }
}

impl Index<usize> for SourceList {
    type Output = Url;

    fn index(&self, index: usize) -> &Self::Output {
        &self.sources[index]
    }
}
