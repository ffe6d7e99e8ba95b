use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Canonical audio sources, in the order that track id `0` tries them.
const DEFAULT_SOURCES: [&str; 5] = [
    "https://archive.org/download/testmp3testfile/mpthreetest.mp3",
    "https://html5demos.com/assets/dizzy.mp3",
    "https://www.soundjay.com/misc/sounds/clock-ticking-3.mp3",
    "https://actions.google.com/sounds/v1/alarms/digital_watch_alarm_long.ogg",
    "https://actions.google.com/sounds/v1/cartoon/cartoon_boing.ogg",
];

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Canonical candidate sources. Every track rotates this list.
    pub sources: Vec<Url>,

    /// Wait before loading the next candidate after a source failed.
    pub retry_backoff_ms: u64,

    /// Initial output volume in `0.0..=1.0`.
    pub volume: f32,

    /// Simulated time it takes to generate a playlist.
    pub generation_delay_ms: u64,

    pub simulation: Simulation,
}

/// Behavior of the simulated media driver.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Simulation {
    /// Hosts whose sources fail to load.
    pub unreachable_hosts: Vec<String>,

    pub load_latency_ms: u64,

    /// Length of the simulated media, regardless of the track's nominal
    /// duration.
    pub media_length_secs: u64,

    /// Interval between position updates.
    pub tick_ms: u64,

    /// Whether playback may start without a user gesture.
    pub autoplay: bool,
}

impl Config {
    /// Longest backoff accepted between two candidate sources.
    pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(10);

    /// Reads and validates a TOML configuration file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Checks the values that deserialization cannot enforce.
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::invalid_argument("at least one source is required"));
        }

        if let Some(source) = self
            .sources
            .iter()
            .find(|source| !matches!(source.scheme(), "http" | "https"))
        {
            return Err(Error::invalid_argument(format!(
                "source {source} is not an http(s) url"
            )));
        }

        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::out_of_range(format!(
                "volume must be between 0 and 1, not {}",
                self.volume
            )));
        }

        if self.retry_backoff() > Self::MAX_RETRY_BACKOFF {
            return Err(Error::out_of_range(format!(
                "retry backoff cannot exceed {}s",
                Self::MAX_RETRY_BACKOFF.as_secs()
            )));
        }

        if self.simulation.tick_ms == 0 {
            return Err(Error::invalid_argument("simulation tick must be positive"));
        }

        Ok(())
    }

    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    #[must_use]
    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: DEFAULT_SOURCES
                .iter()
                .filter_map(|source| Url::parse(source).ok())
                .collect(),
            retry_backoff_ms: 1_000,
            volume: 0.7,
            generation_delay_ms: 3_000,
            simulation: Simulation::default(),
        }
    }
}

impl Simulation {
    #[must_use]
    pub fn load_latency(&self) -> Duration {
        Duration::from_millis(self.load_latency_ms)
    }

    #[must_use]
    pub fn media_length(&self) -> Duration {
        Duration::from_secs(self.media_length_secs)
    }

    #[must_use]
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            unreachable_hosts: vec!["www.soundjay.com".to_owned()],
            load_latency_ms: 300,
            media_length_secs: 30,
            tick_ms: 1_000,
            autoplay: true,
        }
    }
}
