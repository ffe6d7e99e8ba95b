use std::{error::Error, process};

use clap::{command, Parser, ValueHint};
use log::{debug, error, info, trace, warn, LevelFilter};
use tokio::sync::mpsc;

use echotour::{
    app::{AppState, FileStore, User},
    catalog::{self, PlaylistRequest, Preference, Region, Weather},
    config::Config,
    error::{ErrorKind, Result},
    events::Event,
    player::{Handle, Player},
    playlist::Playlist,
    signal::Handler,
    simulated::SimulatedDriver,
    state::{Reason, Status},
    track::Mood,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    ///
    /// Built-in defaults are used when the file does not exist.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("echotour.toml"))]
    config_file: String,

    /// State file
    ///
    /// Keeps the signed in user and bookmarks between runs.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("echotour.json"))]
    state_file: String,

    /// How you feel: happy, relaxed, adventurous or romantic
    #[arg(short, long, default_value = "happy")]
    mood: Mood,

    /// Weather at your destination: sunny, rainy, cloudy or snowy
    #[arg(short, long, default_value = "sunny")]
    weather: Weather,

    /// Travel region, for example europe or north-america
    #[arg(short, long, default_value = "europe")]
    region: Region,

    /// Music preferences: bollywood, hollywood, instrumental or mixed
    #[arg(short, long, value_delimiter = ',', default_value = "mixed")]
    preferences: Vec<Preference>,

    /// Shuffle the playlist before playing
    #[arg(long, default_value_t = false)]
    shuffle: bool,

    /// Start over at the end of the playlist instead of stopping
    #[arg(long, default_value_t = false)]
    repeat: bool,

    /// Sign in with this name
    #[arg(short, long, conflicts_with = "sign_out")]
    user: Option<String>,

    /// Email address to sign in with
    #[arg(long, default_value_t = String::from("demo@echotour.com"))]
    email: String,

    /// Sign out before playing
    #[arg(long, default_value_t = false)]
    sign_out: bool,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("echotour", level);
    }

    logger.init();
}

/// Loads the configuration, falling back to defaults when `path` does not
/// exist.
fn load_config(path: &str) -> Result<Config> {
    match Config::from_file(path) {
        Err(e) if e.kind == ErrorKind::NotFound => {
            info!("{path} not found, using default configuration");
            Ok(Config::default())
        }
        result => result,
    }
}

/// Applies sign-in options and greets the listener.
fn update_user(args: &Args) -> Result<()> {
    let mut state = AppState::new(FileStore::open(&args.state_file)?);

    if args.sign_out {
        state.sign_out()?;
    }

    if let Some(name) = &args.user {
        state.sign_in(&User {
            name: name.clone(),
            email: args.email.clone(),
        })?;
    }

    match state.user()? {
        Some(user) => info!("welcome, {}", user.name),
        None => info!("listening as a guest"),
    }

    let bookmarks = state.bookmarks()?;
    if !bookmarks.is_empty() {
        debug!("bookmarked stories: {}", bookmarks.join(", "));
    }

    Ok(())
}

/// Steers the player the way a listener would.
struct Listener {
    handle: Handle,
    playlist: Playlist,
    repeat: bool,
    exhausted: usize,
}

impl Listener {
    /// Reacts to `event`. Returns `false` when playback should stop.
    fn on_event(&mut self, event: Event) -> Result<bool> {
        match event {
            Event::TrackChanged(id) => {
                if let Some(track) = self
                    .playlist
                    .position(id)
                    .and_then(|index| self.playlist.get(index))
                {
                    info!("now playing {track} ({})", track.genre());
                }
            }

            Event::StatusChanged {
                status: Status::Playing,
                ..
            } => self.exhausted = 0,

            Event::StatusChanged {
                status: Status::Error,
                reason: Some(Reason::PlaybackRejected),
            } => {
                info!("enabling playback on behalf of the listener");
                self.handle.enable_playback()?;
            }

            Event::StatusChanged {
                status: Status::Error,
                reason: Some(Reason::AllSourcesExhausted),
            } => {
                self.exhausted += 1;
                if self.exhausted >= self.playlist.len() {
                    warn!("no track in the playlist could be played");
                    return Ok(false);
                }

                warn!("skipping unplayable track");
                self.handle.skip_to_next(self.playlist.clone())?;
            }

            Event::TrackEnded => self.handle.skip_to_next(self.playlist.clone())?,

            Event::PlaylistEnd if !self.repeat => {
                info!("end of playlist");
                return Ok(false);
            }

            Event::Position(position) => trace!("position {:.0}s", position.as_secs_f32()),

            event => debug!("{event:?}"),
        }

        Ok(true)
    }
}

/// Main application loop.
///
/// # Errors
///
/// This function returns an error when the configuration or state file
/// cannot be read, when the playlist request is invalid, or when signal
/// handlers cannot be registered.
async fn run(args: Args) -> std::result::Result<(), Box<dyn Error>> {
    let config = load_config(&args.config_file)?;
    update_user(&args)?;

    let request = PlaylistRequest::new(
        args.mood,
        args.weather,
        args.region,
        args.preferences.clone(),
    )?;
    let mut playlist = catalog::generate_with_delay(&request, config.generation_delay()).await;
    if args.shuffle {
        playlist.shuffle();
    }

    let Some(first) = playlist.get(0).cloned() else {
        return Err("generated an empty playlist".into());
    };

    let (media_tx, media_rx) = mpsc::unbounded_channel();
    let driver = SimulatedDriver::new(&config.simulation, media_tx);
    let mut player = Player::new(&config, driver);
    let mut events = player.subscribe();
    let (handle, task) = player.spawn(media_rx);

    handle.load_track(first)?;
    handle.play()?;

    let mut listener = Listener {
        handle: handle.clone(),
        playlist,
        repeat: args.repeat,
        exhausted: 0,
    };
    let mut signals = Handler::new()?;

    loop {
        tokio::select! {
            // Prioritize shutdown signals.
            biased;

            signal = signals.recv() => {
                if signal.is_shutdown() {
                    info!("received {signal}, shutting down gracefully");
                    break;
                }

                info!("received {signal}, restarting track");
                handle.reset_and_play()?;
            }

            event = events.recv() => match event {
                Some(event) => {
                    if !listener.on_event(event)? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    if let Err(e) = handle.shutdown() {
        debug!("{e}");
    }

    let player = task.await?;
    debug!("player stopped in status {}", player.status());
    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
