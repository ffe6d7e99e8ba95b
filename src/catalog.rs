//! Mood based playlist generation.
//!
//! The catalog is fixed: six base tracks whose genres follow the listener's
//! preferences, plus one track matching the weather.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    playlist::Playlist,
    track::{Genre, Mood, Track},
};

/// Longest playlist the catalog generates.
pub const MAX_TRACKS: usize = 8;

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weather {
    Sunny,
    Rainy,
    Cloudy,
    Snowy,
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weather::Sunny => write!(f, "sunny"),
            Weather::Rainy => write!(f, "rainy"),
            Weather::Cloudy => write!(f, "cloudy"),
            Weather::Snowy => write!(f, "snowy"),
        }
    }
}

impl FromStr for Weather {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunny" => Ok(Weather::Sunny),
            "rainy" => Ok(Weather::Rainy),
            "cloudy" => Ok(Weather::Cloudy),
            "snowy" => Ok(Weather::Snowy),
            _ => Err(Error::invalid_argument(format!("unknown weather: {s}"))),
        }
    }
}

/// Travel region of the listener.
///
/// Recorded with the request, but does not influence the tracks.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    NorthAmerica,
    SouthAmerica,
    Europe,
    Asia,
    Africa,
    Oceania,
    MiddleEast,
    Caribbean,
}

impl Region {
    pub const ALL: [Region; 8] = [
        Region::NorthAmerica,
        Region::SouthAmerica,
        Region::Europe,
        Region::Asia,
        Region::Africa,
        Region::Oceania,
        Region::MiddleEast,
        Region::Caribbean,
    ];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Region::NorthAmerica => "north-america",
            Region::SouthAmerica => "south-america",
            Region::Europe => "europe",
            Region::Asia => "asia",
            Region::Africa => "africa",
            Region::Oceania => "oceania",
            Region::MiddleEast => "middle-east",
            Region::Caribbean => "caribbean",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::NorthAmerica => "North America",
            Region::SouthAmerica => "South America",
            Region::Europe => "Europe",
            Region::Asia => "Asia",
            Region::Africa => "Africa",
            Region::Oceania => "Oceania",
            Region::MiddleEast => "Middle East",
            Region::Caribbean => "Caribbean",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Region {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let slug = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        Region::ALL
            .into_iter()
            .find(|region| region.slug() == slug)
            .ok_or_else(|| Error::invalid_argument(format!("unknown region: {s}")))
    }
}

#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Bollywood,
    Hollywood,
    Instrumental,
    Mixed,
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preference::Bollywood => write!(f, "bollywood"),
            Preference::Hollywood => write!(f, "hollywood"),
            Preference::Instrumental => write!(f, "instrumental"),
            Preference::Mixed => write!(f, "mixed"),
        }
    }
}

impl FromStr for Preference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bollywood" => Ok(Preference::Bollywood),
            "hollywood" => Ok(Preference::Hollywood),
            "instrumental" => Ok(Preference::Instrumental),
            "mixed" => Ok(Preference::Mixed),
            _ => Err(Error::invalid_argument(format!("unknown preference: {s}"))),
        }
    }
}

/// What the listener asked for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRequest {
    mood: Mood,
    weather: Weather,
    region: Region,
    preferences: Vec<Preference>,
}

impl PlaylistRequest {
    /// Creates a request.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` when no preference is given.
    pub fn new(
        mood: Mood,
        weather: Weather,
        region: Region,
        preferences: Vec<Preference>,
    ) -> Result<Self> {
        let mut unique = Vec::with_capacity(preferences.len());
        for preference in preferences {
            if !unique.contains(&preference) {
                unique.push(preference);
            }
        }

        if unique.is_empty() {
            return Err(Error::invalid_argument(
                "at least one music preference is required",
            ));
        }

        Ok(Self {
            mood,
            weather,
            region,
            preferences: unique,
        })
    }

    #[must_use]
    pub fn mood(&self) -> Mood {
        self.mood
    }

    #[must_use]
    pub fn weather(&self) -> Weather {
        self.weather
    }

    #[must_use]
    pub fn region(&self) -> Region {
        self.region
    }

    #[must_use]
    pub fn preferences(&self) -> &[Preference] {
        &self.preferences
    }

    fn prefers(&self, preference: Preference) -> bool {
        self.preferences.contains(&preference)
    }

    fn pick(&self, preference: Preference, preferred: Genre, otherwise: Genre) -> Genre {
        if self.prefers(preference) {
            preferred
        } else {
            otherwise
        }
    }
}

/// Builds the playlist for `request`.
#[must_use]
pub fn generate(request: &PlaylistRequest) -> Playlist {
    let mood = request.mood();
    let track = |id: u32, title: &str, artist: &str, genre: Genre, secs: u64| {
        Track::new(id, title, artist, genre, mood, Duration::from_secs(secs))
    };

    let mut tracks = vec![
        track(
            1,
            "Wanderlust Dreams",
            "Travel Beats",
            request.pick(Preference::Instrumental, Genre::Instrumental, Genre::Pop),
            245,
        ),
        track(
            2,
            "Sunset Boulevard",
            "Journey Sounds",
            request.pick(Preference::Bollywood, Genre::Bollywood, Genre::Electronic),
            198,
        ),
        track(
            3,
            "Mountain Echoes",
            "Nature Vibes",
            request.pick(Preference::Instrumental, Genre::Instrumental, Genre::Ambient),
            267,
        ),
        track(
            4,
            "City Lights",
            "Urban Melody",
            request.pick(Preference::Hollywood, Genre::Pop, Genre::Jazz),
            223,
        ),
        track(
            5,
            "Ocean Breeze",
            "Coastal Sounds",
            request.pick(Preference::Mixed, Genre::World, Genre::Chill),
            189,
        ),
        track(
            6,
            "Desert Mirage",
            "Exotic Rhythms",
            request.pick(Preference::Bollywood, Genre::Bollywood, Genre::World),
            234,
        ),
    ];

    tracks.push(match request.weather() {
        Weather::Sunny => track(7, "Sunshine Vibes", "Bright Beats", Genre::Pop, 201),
        Weather::Rainy => track(8, "Raindrop Melody", "Storm Sounds", Genre::Ambient, 256),
        Weather::Cloudy => track(9, "Cloudy Skies", "Mellow Tunes", Genre::Chill, 178),
        Weather::Snowy => track(
            10,
            "Winter Wonderland",
            "Frosty Melodies",
            Genre::Classical,
            243,
        ),
    });
    tracks.truncate(MAX_TRACKS);

    debug!(
        "generated {} {mood} tracks for {} weather in {}",
        tracks.len(),
        request.weather(),
        request.region()
    );
    Playlist::new(tracks)
}

/// Builds the playlist for `request` after `delay`, as a remote
/// recommendation service would.
pub async fn generate_with_delay(request: &PlaylistRequest, delay: Duration) -> Playlist {
    info!("curating playlist for a {} mood", request.mood());
    tokio::time::sleep(delay).await;
    generate(request)
}
