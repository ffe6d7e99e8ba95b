use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a track in the catalog.
///
/// The identifier also seeds the rotation of the candidate source list, so
/// different tracks start playback from different sources.
#[derive(
    Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for TrackId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Relaxed,
    Adventurous,
    Romantic,
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mood::Happy => write!(f, "happy"),
            Mood::Relaxed => write!(f, "relaxed"),
            Mood::Adventurous => write!(f, "adventurous"),
            Mood::Romantic => write!(f, "romantic"),
        }
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Mood::Happy),
            "relaxed" => Ok(Mood::Relaxed),
            "adventurous" => Ok(Mood::Adventurous),
            "romantic" => Ok(Mood::Romantic),
            _ => Err(Error::invalid_argument(format!("unknown mood: {s}"))),
        }
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Genre {
    Ambient,
    Bollywood,
    Chill,
    Classical,
    Electronic,
    Instrumental,
    Jazz,
    Pop,
    World,
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Genre::Ambient => "Ambient",
            Genre::Bollywood => "Bollywood",
            Genre::Chill => "Chill",
            Genre::Classical => "Classical",
            Genre::Electronic => "Electronic",
            Genre::Instrumental => "Instrumental",
            Genre::Jazz => "Jazz",
            Genre::Pop => "Pop",
            Genre::World => "World",
        };
        write!(f, "{name}")
    }
}

/// A track as presented by the catalog.
///
/// Tracks are immutable once constructed. The duration is nominal: it is
/// used for display and to bound seeking, and is not checked against the
/// length of whatever media a source actually serves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    title: String,
    artist: String,
    genre: Genre,
    mood: Mood,
    duration: Duration,
}

impl Track {
    /// Duration assumed for tracks that were created without one.
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(180);

    #[must_use]
    pub fn new(
        id: impl Into<TrackId>,
        title: impl Into<String>,
        artist: impl Into<String>,
        genre: Genre,
        mood: Mood,
        duration: Duration,
    ) -> Self {
        let duration = if duration.is_zero() {
            Self::DEFAULT_DURATION
        } else {
            duration
        };

        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            genre,
            mood,
            duration,
        }
    }

    #[must_use]
    pub fn id(&self) -> TrackId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn genre(&self) -> Genre {
        self.genre
    }

    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    /// The nominal duration of the track.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} - {}", self.id, self.artist, self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_falls_back_to_default() {
        let track = Track::new(1, "Silence", "Nobody", Genre::Ambient, Mood::Relaxed, Duration::ZERO);
        assert_eq!(track.duration(), Track::DEFAULT_DURATION);
    }

    #[test]
    fn display_shows_id_artist_and_title() {
        let track = Track::new(
            3,
            "Mountain Echoes",
            "Nature Vibes",
            Genre::Ambient,
            Mood::Adventurous,
            Duration::from_secs(267),
        );
        assert_eq!(track.to_string(), "3: Nature Vibes - Mountain Echoes");
    }

    #[test]
    fn mood_parses_case_insensitively() {
        assert_eq!("Romantic".parse::<Mood>().unwrap(), Mood::Romantic);
        assert_eq!(" happy ".parse::<Mood>().unwrap(), Mood::Happy);
        assert!("grumpy".parse::<Mood>().is_err());
    }
}
