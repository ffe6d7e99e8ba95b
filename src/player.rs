//! Playback controller with automatic source fallback.
//!
//! The [`Player`] owns the media driver and at most one playback session.
//! Commands and driver events are fed through [`state::transition`]; the
//! resulting effects are carried out on the driver and changes are reported
//! as [`Event`]s.
//!
//! The player can be stepped directly, which is what the tests do, or run as
//! a task with [`Player::spawn`] and controlled through a [`Handle`].

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use url::Url;

use crate::{
    config::Config,
    driver::{EventReceiver, MediaDriver, MediaEvent, Ticket},
    error::{Error, Result},
    events::Event,
    playlist::Playlist,
    source::SourceList,
    state::{self, Autoplay, Effect, Input, Reason, Session, Status, Transition},
    track::Track,
};

/// Requests accepted by a running player.
#[derive(Clone, Debug)]
pub enum Command {
    Load(Track),
    Play,
    EnablePlayback,
    Pause,
    Seek(f64),
    SetVolume(f32),
    SkipToNext(Playlist),
    SkipToPrevious(Playlist),
    Retry,
    ResetAndPlay,
    Shutdown,
}

pub struct Player<D> {
    driver: D,
    sources: Vec<Url>,
    retry_backoff: Duration,

    session: Option<Session>,
    last_ticket: Ticket,
    retry_at: Option<(Ticket, Instant)>,

    volume: f32,
    autoplay: Autoplay,
    // The host keeps a user gesture for as long as the player lives.
    gesture: bool,

    events: Option<mpsc::UnboundedSender<Event>>,
}

impl<D: MediaDriver> Player<D> {
    #[must_use]
    pub fn new(config: &Config, mut driver: D) -> Self {
        let volume = config.volume.clamp(0.0, 1.0);
        driver.set_volume(volume);

        Self {
            driver,
            sources: config.sources.clone(),
            retry_backoff: config.retry_backoff(),
            session: None,
            last_ticket: Ticket::NONE,
            retry_at: None,
            volume,
            autoplay: Autoplay::Unknown,
            gesture: false,
            events: None,
        }
    }

    /// Returns a receiver for the events of this player.
    ///
    /// Only the most recent subscriber receives events.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Event> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// The media driver this player controls.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The active playback session, if a track was loaded.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// The current track, if any.
    #[must_use]
    pub fn track(&self) -> Option<&Track> {
        self.session.as_ref().map(Session::track)
    }

    /// Playback status, [`Status::Idle`] when no track is loaded.
    #[must_use]
    pub fn status(&self) -> Status {
        self.session.as_ref().map_or(Status::Idle, Session::status)
    }

    /// Why the player is replacing a source or stopped in
    /// [`Status::Error`].
    #[must_use]
    pub fn reason(&self) -> Option<Reason> {
        self.session.as_ref().and_then(Session::reason)
    }

    /// Playback position within the current track.
    #[must_use]
    pub fn position(&self) -> Duration {
        self.session
            .as_ref()
            .map_or(Duration::ZERO, Session::elapsed)
    }

    /// Output volume in `0.0..=1.0`.
    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// What is known about playback starting without a user gesture.
    #[must_use]
    pub fn autoplay(&self) -> Autoplay {
        self.autoplay
    }

    /// When the next candidate source is due to be loaded, if a source
    /// failed and a retry is pending.
    #[must_use]
    pub fn retry_deadline(&self) -> Option<Instant> {
        self.retry_at.map(|(_, at)| at)
    }

    /// Asks the driver whether playback may start without a user gesture.
    pub fn probe_autoplay(&mut self) {
        debug!("probing autoplay capability");
        self.driver.probe_autoplay();
    }

    /// Loads `track`, replacing the current session.
    ///
    /// Loading the track that is already loading is a no-op.
    pub fn load_track(&mut self, track: Track) {
        if let Some(session) = &self.session {
            if session.track().id() == track.id() && session.status() == Status::Loading {
                debug!("track {} is already loading", track.id());
                return;
            }
        }

        info!("loading track {track}");
        let before = self.snapshot();
        let id = track.id();
        let sources = SourceList::for_track(&track, &self.sources);

        // Dropping the old session orphans its ticket, so late events and
        // retry timers of the previous track are ignored from here on.
        self.retry_at = None;
        let Transition { session, effects } =
            Session::start(track, sources, self.last_ticket, self.gesture);
        self.session = Some(session);

        self.notify(Event::TrackChanged(id));
        self.perform(effects);
        self.report(before);
    }

    /// Plays the current source.
    ///
    /// While the source is still loading, playback starts as soon as it is
    /// ready. A no-op while playing or failed.
    pub fn play(&mut self) {
        self.apply(Input::Play);
    }

    /// Plays in response to a user gesture.
    ///
    /// This is the way out of [`Reason::PlaybackRejected`]: the current
    /// source is played again, now with a gesture the host will accept.
    pub fn enable_playback(&mut self) {
        self.apply(Input::EnablePlayback);
    }

    /// Pauses playback. Only has an effect while playing.
    pub fn pause(&mut self) {
        self.apply(Input::Pause);
    }

    /// Seeks to `seconds`, clamped to the nominal duration of the track.
    pub fn seek(&mut self, seconds: f64) {
        self.apply(Input::Seek(seconds));
    }

    /// Sets the volume, clamped to `0.0..=1.0`.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            warn!("ignoring invalid volume {volume}");
            return;
        }

        let volume = volume.clamp(0.0, 1.0);
        debug!("setting volume to {volume:.2}");
        self.volume = volume;
        self.driver.set_volume(volume);
        self.notify(Event::Volume(volume));
    }

    /// Loads and plays the track after the current one in `playlist`.
    ///
    /// Emits [`Event::PlaylistEnd`] before wrapping around to the first
    /// track.
    pub fn skip_to_next(&mut self, playlist: &Playlist) {
        let current = self.track().map(Track::id);
        let Some(index) = playlist.next_index(current) else {
            debug!("cannot skip forward in an empty playlist");
            return;
        };

        if current.is_some_and(|id| playlist.is_last(id)) {
            info!("reached end of playlist");
            self.notify(Event::PlaylistEnd);
        }

        self.skip_to(playlist, index);
    }

    /// Loads and plays the track before the current one in `playlist`,
    /// wrapping around to the last track.
    pub fn skip_to_previous(&mut self, playlist: &Playlist) {
        let current = self.track().map(Track::id);
        let Some(index) = playlist.previous_index(current) else {
            debug!("cannot skip back in an empty playlist");
            return;
        };

        self.skip_to(playlist, index);
    }

    fn skip_to(&mut self, playlist: &Playlist, index: usize) {
        if let Some(track) = playlist.get(index) {
            self.load_track(track.clone());
            self.play();
        }
    }

    /// Starts over from the first candidate source after all sources failed.
    pub fn retry(&mut self) {
        self.apply(Input::Retry);
    }

    /// Starts over from the first candidate source, whatever the status.
    pub fn reset_and_play(&mut self) {
        self.apply(Input::ResetAndPlay);
    }

    /// Handles an event reported by the media driver.
    pub fn handle_media(&mut self, ticket: Ticket, event: MediaEvent) {
        if let MediaEvent::AutoplayProbed(allowed) = event {
            self.set_autoplay(allowed);
            return;
        }

        self.apply(Input::Media(ticket, event));
    }

    fn on_retry_due(&mut self) {
        if let Some((ticket, _)) = self.retry_at.take() {
            self.apply(Input::RetryDue(ticket));
        }
    }

    fn apply(&mut self, input: Input) {
        let Some(session) = self.session.take() else {
            debug!("no track loaded, ignoring {input:?}");
            return;
        };

        let before = Snapshot::of(&session);
        let Transition { session, effects } = state::transition(session, input);
        self.session = Some(session);

        self.perform(effects);
        self.report(before);
    }

    fn perform(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Load(ticket, url) => {
                    self.last_ticket = ticket;
                    if let Some(session) = &self.session {
                        let index = session.source_index();
                        let count = session.sources().len();
                        debug!("loading source {}/{count} ({ticket}): {url}", index + 1);
                        self.notify(Event::SourceChanged { index, count });
                    }
                    self.driver.load(ticket, &url);
                }
                Effect::Play(ticket) => self.driver.play(ticket),
                Effect::Pause => self.driver.pause(),
                Effect::Seek(position) => self.driver.seek(position),
                Effect::UserGesture => {
                    self.gesture = true;
                    self.driver.user_gesture();
                }
                Effect::ScheduleRetry(ticket) => {
                    debug!(
                        "retrying next source in {:.1}s",
                        self.retry_backoff.as_secs_f32()
                    );
                    self.retry_at = Some((ticket, Instant::now() + self.retry_backoff));
                }
                Effect::Autoplay(allowed) => self.set_autoplay(allowed),
                Effect::Ended => {
                    debug!("track ended");
                    self.notify(Event::TrackEnded);
                }
            }
        }
    }

    fn set_autoplay(&mut self, allowed: bool) {
        let autoplay = if allowed {
            Autoplay::Allowed
        } else {
            Autoplay::Blocked
        };

        if self.autoplay != autoplay {
            info!(
                "autoplay {}",
                if allowed { "allowed" } else { "blocked" }
            );
            self.autoplay = autoplay;
            self.notify(Event::Autoplay(allowed));
        }
    }

    fn snapshot(&self) -> Snapshot {
        self.session
            .as_ref()
            .map_or_else(Snapshot::default, Snapshot::of)
    }

    /// Reports what changed since `before`.
    fn report(&mut self, before: Snapshot) {
        let after = self.snapshot();

        if after.elapsed != before.elapsed {
            self.notify(Event::Position(after.elapsed));
        }

        if (after.status, after.reason) != (before.status, before.reason) {
            match (after.status, after.reason) {
                (Status::Error, Some(reason)) => warn!("playback failed: {reason}"),
                (status, Some(reason)) => info!("{status}: {reason}"),
                (status, None) => debug!("{status}"),
            }

            self.notify(Event::StatusChanged {
                status: after.status,
                reason: after.reason,
            });
        }
    }

    fn notify(&self, event: Event) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                trace!("no listener for {event:?}");
            }
        }
    }

    fn execute(&mut self, command: Command) {
        trace!("command: {command:?}");
        match command {
            Command::Load(track) => self.load_track(track),
            Command::Play => self.play(),
            Command::EnablePlayback => self.enable_playback(),
            Command::Pause => self.pause(),
            Command::Seek(seconds) => self.seek(seconds),
            Command::SetVolume(volume) => self.set_volume(volume),
            Command::SkipToNext(playlist) => self.skip_to_next(&playlist),
            Command::SkipToPrevious(playlist) => self.skip_to_previous(&playlist),
            Command::Retry => self.retry(),
            Command::ResetAndPlay => self.reset_and_play(),
            // Handled by the run loop.
            Command::Shutdown => {}
        }
    }

    /// Runs the player until it is shut down or all handles are dropped.
    ///
    /// Probes autoplay capability first, then serves commands, driver events
    /// and retry timers on a single timeline. Returns the player so its final
    /// state can be inspected.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut media: EventReceiver,
    ) -> Self {
        self.probe_autoplay();

        loop {
            let deadline = self.retry_deadline();

            tokio::select! {
                // Prioritize commands, so a track change wins over a stale
                // event that arrives at the same time.
                biased;

                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => {
                        info!("player shutting down");
                        self.driver.pause();
                        break self;
                    }
                    Some(command) => self.execute(command),
                },

                Some((ticket, event)) = media.recv() => self.handle_media(ticket, event),

                () = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_retry_due();
                }
            }
        }
    }
}

impl<D: MediaDriver + 'static> Player<D> {
    /// Runs the player on a new task.
    pub fn spawn(self, media: EventReceiver) -> (Handle, JoinHandle<Self>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx, media));
        (Handle { tx }, task)
    }
}

/// What the player reports on when it changes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Snapshot {
    status: Status,
    reason: Option<Reason>,
    elapsed: Duration,
}

impl Snapshot {
    fn of(session: &Session) -> Self {
        Self {
            status: session.status(),
            reason: session.reason(),
            elapsed: session.elapsed(),
        }
    }
}

/// Cloneable remote control for a running [`Player`].
#[derive(Clone, Debug)]
pub struct Handle {
    tx: mpsc::UnboundedSender<Command>,
}

impl Handle {
    /// Sends `command` to the player.
    ///
    /// # Errors
    ///
    /// Returns `FailedPrecondition` when the player is no longer running.
    pub fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|e| {
            Error::failed_precondition(format!("player is not running, dropped {:?}", e.0))
        })
    }

    /// See [`Player::load_track`].
    pub fn load_track(&self, track: Track) -> Result<()> {
        self.send(Command::Load(track))
    }

    /// See [`Player::play`].
    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    /// See [`Player::enable_playback`].
    pub fn enable_playback(&self) -> Result<()> {
        self.send(Command::EnablePlayback)
    }

    /// See [`Player::pause`].
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    /// See [`Player::seek`].
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send(Command::Seek(seconds))
    }

    /// See [`Player::set_volume`].
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.send(Command::SetVolume(volume))
    }

    /// See [`Player::skip_to_next`].
    pub fn skip_to_next(&self, playlist: Playlist) -> Result<()> {
        self.send(Command::SkipToNext(playlist))
    }

    /// See [`Player::skip_to_previous`].
    pub fn skip_to_previous(&self, playlist: Playlist) -> Result<()> {
        self.send(Command::SkipToPrevious(playlist))
    }

    /// See [`Player::retry`].
    pub fn retry(&self) -> Result<()> {
        self.send(Command::Retry)
    }

    /// See [`Player::reset_and_play`].
    pub fn reset_and_play(&self) -> Result<()> {
        self.send(Command::ResetAndPlay)
    }

    /// Stops the player. It pauses the driver and its task returns the
    /// player.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Simulation,
        simulated::SimulatedDriver,
        state::Failure,
        track::{Genre, Mood, TrackId},
    };

    #[derive(Clone, Debug, PartialEq)]
    enum Call {
        Load(Ticket, Url),
        Play(Ticket),
        Pause,
        Seek(Duration),
        Volume(f32),
        Gesture,
        Probe,
    }

    #[derive(Default)]
    struct FakeDriver {
        calls: Vec<Call>,
    }

    impl FakeDriver {
        fn loads(&self) -> Vec<(Ticket, Url)> {
            self.calls
                .iter()
                .filter_map(|call| match call {
                    Call::Load(ticket, url) => Some((*ticket, url.clone())),
                    _ => None,
                })
                .collect()
        }

        fn last_load(&self) -> Ticket {
            self.loads().last().map(|(ticket, _)| *ticket).unwrap()
        }

        fn plays(&self) -> usize {
            self.calls
                .iter()
                .filter(|call| matches!(call, Call::Play(_)))
                .count()
        }
    }

    impl MediaDriver for FakeDriver {
        fn load(&mut self, ticket: Ticket, url: &Url) {
            self.calls.push(Call::Load(ticket, url.clone()));
        }

        fn play(&mut self, ticket: Ticket) {
            self.calls.push(Call::Play(ticket));
        }

        fn pause(&mut self) {
            self.calls.push(Call::Pause);
        }

        fn seek(&mut self, position: Duration) {
            self.calls.push(Call::Seek(position));
        }

        fn set_volume(&mut self, volume: f32) {
            self.calls.push(Call::Volume(volume));
        }

        fn user_gesture(&mut self) {
            self.calls.push(Call::Gesture);
        }

        fn probe_autoplay(&mut self) {
            self.calls.push(Call::Probe);
        }
    }

    fn config() -> Config {
        Config {
            sources: (0..5)
                .map(|i| Url::parse(&format!("https://cdn{i}.example.com/track.mp3")).unwrap())
                .collect(),
            retry_backoff_ms: 500,
            ..Config::default()
        }
    }

    fn track(id: u32) -> Track {
        Track::new(
            id,
            format!("Track {id}"),
            "Travel Beats",
            Genre::Pop,
            Mood::Happy,
            Duration::from_secs(245),
        )
    }

    fn player() -> Player<FakeDriver> {
        Player::new(&config(), FakeDriver::default())
    }

    /// Fails the current source and fires the retry timer.
    fn fail_current(player: &mut Player<FakeDriver>) {
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Failed(Failure::SourceUnavailable));
        if player.status() != Status::Error {
            assert!(player.retry_deadline().is_some());
            player.on_retry_due();
        }
    }

    fn start_current(player: &mut Player<FakeDriver>) {
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Ready);
        player.handle_media(ticket, MediaEvent::Started);
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn candidate_list_is_rotated_by_track_id() {
        let canonical = config().sources;
        for id in [0, 3, 7, 12] {
            let mut player = player();
            player.load_track(track(id));

            let session = player.session().unwrap();
            let offset = id as usize % canonical.len();
            let expected: Vec<_> = canonical
                .iter()
                .cycle()
                .skip(offset)
                .take(canonical.len())
                .collect();
            assert_eq!(session.sources().iter().collect::<Vec<_>>(), expected);
            assert_eq!(player.driver().loads()[0].1, canonical[offset]);
        }
    }

    #[tokio::test]
    async fn falls_back_until_a_source_plays() {
        const FAILING: usize = 2;

        let mut player = player();
        player.load_track(track(1));
        player.play();
        for _ in 0..FAILING {
            fail_current(&mut player);
        }
        start_current(&mut player);

        assert_eq!(player.status(), Status::Playing);
        assert_eq!(player.reason(), None);

        let loads = player.driver().loads();
        assert_eq!(loads.len(), FAILING + 1);
        let mut urls: Vec<_> = loads.iter().map(|(_, url)| url.as_str()).collect();
        urls.sort_unstable();
        urls.dedup();
        assert_eq!(urls.len(), FAILING + 1, "a source was tried twice");
    }

    #[tokio::test]
    async fn exhausts_after_every_source_failed_once() {
        let mut player = player();
        player.load_track(track(4));
        player.play();
        for _ in 0..5 {
            fail_current(&mut player);
        }

        assert_eq!(player.status(), Status::Error);
        assert_eq!(player.reason(), Some(Reason::AllSourcesExhausted));
        assert_eq!(player.driver().loads().len(), 5);
        assert!(player.retry_deadline().is_none());

        player.retry();
        assert_eq!(player.status(), Status::Loading);
        assert_eq!(player.session().unwrap().attempts(), 1);
        assert_eq!(player.session().unwrap().source_index(), 0);
        assert_eq!(player.driver().loads().len(), 6);
        assert_eq!(
            player.driver().loads()[5].1,
            player.driver().loads()[0].1
        );
    }

    #[tokio::test]
    async fn late_failure_of_previous_track_is_ignored() {
        let mut player = player();
        player.load_track(track(1));
        player.play();
        let stale = player.driver().last_load();

        player.load_track(track(2));
        player.play();
        start_current(&mut player);
        assert_eq!(player.status(), Status::Playing);

        let loads = player.driver().loads().len();
        player.handle_media(stale, MediaEvent::Failed(Failure::SourceUnavailable));

        assert_eq!(player.status(), Status::Playing);
        assert_eq!(player.track().map(Track::id), Some(TrackId(2)));
        assert_eq!(player.driver().loads().len(), loads);
        assert!(player.retry_deadline().is_none());
    }

    #[tokio::test]
    async fn loading_the_same_track_twice_is_a_no_op() {
        let mut player = player();
        player.load_track(track(1));
        player.load_track(track(1));
        assert_eq!(player.driver().loads().len(), 1);
    }

    #[tokio::test]
    async fn pause_is_a_no_op_when_idle_or_failed() {
        let mut player = player();
        player.pause();
        assert_eq!(player.status(), Status::Idle);

        player.load_track(track(0));
        player.play();
        for _ in 0..5 {
            fail_current(&mut player);
        }
        assert_eq!(player.status(), Status::Error);
        player.pause();
        assert_eq!(player.status(), Status::Error);
        assert!(!player.driver().calls.contains(&Call::Pause));
    }

    #[tokio::test]
    async fn play_while_playing_is_a_no_op() {
        let mut player = player();
        player.load_track(track(0));
        player.play();
        start_current(&mut player);
        let plays = player.driver().plays();

        player.play();
        assert_eq!(player.driver().plays(), plays);
        assert_eq!(player.status(), Status::Playing);
    }

    #[tokio::test]
    async fn seek_clamps_to_nominal_duration() {
        let mut player = player();
        player.load_track(track(0));
        player.play();
        start_current(&mut player);

        player.seek(-5.0);
        assert_eq!(player.position(), Duration::ZERO);

        player.seek(245.0 + 100.0);
        assert_eq!(player.position(), Duration::from_secs(245));
        assert_eq!(player.status(), Status::Playing);
        assert_eq!(
            player.driver().calls.last(),
            Some(&Call::Seek(Duration::from_secs(245)))
        );
    }

    #[tokio::test]
    async fn volume_is_clamped_and_applied_immediately() {
        let mut player = player();
        player.set_volume(1.7);
        assert!((player.volume() - 1.0).abs() < f32::EPSILON);
        player.set_volume(-0.2);
        assert!(player.volume().abs() < f32::EPSILON);
        player.set_volume(f32::NAN);
        assert!(player.volume().abs() < f32::EPSILON);
        assert_eq!(player.driver().calls.last(), Some(&Call::Volume(0.0)));
    }

    #[tokio::test]
    async fn skipping_past_the_last_track_reports_playlist_end() {
        let playlist = Playlist::new(vec![track(1), track(2), track(3)]);
        let mut player = player();
        let mut events = player.subscribe();

        player.load_track(track(3));
        drain(&mut events);

        player.skip_to_next(&playlist);
        let events = drain(&mut events);
        assert_eq!(events[0], Event::PlaylistEnd);
        assert_eq!(events[1], Event::TrackChanged(TrackId(1)));

        assert_eq!(player.track().map(Track::id), Some(TrackId(1)));
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Ready);
        assert_eq!(player.driver().calls.last(), Some(&Call::Play(ticket)));
    }

    #[tokio::test]
    async fn skipping_back_from_the_first_track_wraps_silently() {
        let playlist = Playlist::new(vec![track(1), track(2), track(3)]);
        let mut player = player();
        let mut events = player.subscribe();

        player.load_track(track(1));
        player.skip_to_previous(&playlist);

        assert_eq!(player.track().map(Track::id), Some(TrackId(3)));
        assert!(!drain(&mut events).contains(&Event::PlaylistEnd));
    }

    #[tokio::test]
    async fn rejected_playback_waits_for_a_gesture() {
        let mut player = player();
        let mut events = player.subscribe();
        player.load_track(track(0));
        player.play();
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Ready);
        player.handle_media(ticket, MediaEvent::Failed(Failure::PlaybackRejected));

        assert_eq!(player.status(), Status::Error);
        assert_eq!(player.reason(), Some(Reason::PlaybackRejected));
        assert_eq!(player.autoplay(), Autoplay::Blocked);
        assert!(player.retry_deadline().is_none());
        assert!(drain(&mut events).contains(&Event::Autoplay(false)));

        player.enable_playback();
        player.handle_media(ticket, MediaEvent::Started);
        assert_eq!(player.status(), Status::Playing);
        assert_eq!(player.autoplay(), Autoplay::Blocked);
        assert!(player.driver().calls.contains(&Call::Gesture));
        assert_eq!(player.driver().loads().len(), 1);
    }

    #[tokio::test]
    async fn gesture_carries_over_to_later_tracks() {
        let mut player = player();
        player.load_track(track(0));
        player.play();
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Ready);
        player.handle_media(ticket, MediaEvent::Failed(Failure::PlaybackRejected));
        player.enable_playback();
        player.handle_media(ticket, MediaEvent::Started);
        assert_eq!(player.autoplay(), Autoplay::Blocked);

        player.load_track(track(1));
        player.play();
        start_current(&mut player);
        assert_eq!(player.status(), Status::Playing);
        assert_eq!(player.autoplay(), Autoplay::Blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn next_source_waits_for_the_backoff() {
        let mut player = player();
        player.load_track(track(1));
        player.play();

        let failed_at = Instant::now();
        let ticket = player.driver().last_load();
        player.handle_media(ticket, MediaEvent::Failed(Failure::SourceUnavailable));

        assert_eq!(player.driver().loads().len(), 1);
        assert_eq!(
            player.retry_deadline(),
            Some(failed_at + Duration::from_millis(500))
        );

        player.on_retry_due();
        assert_eq!(player.driver().loads().len(), 2);
        assert!(player.retry_deadline().is_none());
    }

    #[tokio::test]
    async fn first_unprompted_start_allows_autoplay() {
        let mut player = player();
        player.load_track(track(0));
        player.play();
        start_current(&mut player);
        assert_eq!(player.autoplay(), Autoplay::Allowed);
    }

    #[tokio::test]
    async fn status_changes_are_reported() {
        let mut player = player();
        let mut events = player.subscribe();
        player.load_track(track(0));
        player.play();
        start_current(&mut player);
        player.pause();

        let statuses: Vec<_> = drain(&mut events)
            .into_iter()
            .filter_map(|event| match event {
                Event::StatusChanged { status, .. } => Some(status),
                _ => None,
            })
            .collect();
        assert_eq!(
            statuses,
            vec![Status::Loading, Status::Playing, Status::Paused]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn running_player_falls_back_on_its_own() {
        let config = Config {
            retry_backoff_ms: 1_000,
            simulation: Simulation {
                unreachable_hosts: vec!["cdn1.example.com".to_owned()],
                load_latency_ms: 200,
                media_length_secs: 3,
                tick_ms: 1_000,
                autoplay: true,
            },
            ..config()
        };

        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let driver = SimulatedDriver::new(&config.simulation, media_tx);
        let mut player = Player::new(&config, driver);
        let mut events = player.subscribe();
        let (handle, task) = player.spawn(media_rx);

        // Track 1 starts at the unreachable second source.
        handle.load_track(track(1)).unwrap();
        handle.play().unwrap();

        let started = Instant::now();
        let mut sources = Vec::new();
        let mut fallback_after = None;
        loop {
            match events.recv().await.unwrap() {
                Event::SourceChanged { index, .. } => {
                    if index == 1 {
                        fallback_after = Some(started.elapsed());
                    }
                    sources.push(index);
                }
                Event::TrackEnded => break,
                _ => {}
            }
        }

        handle.shutdown().unwrap();
        let player = task.await.unwrap();
        assert_eq!(sources, vec![0, 1]);
        // Load latency of the failing source plus the backoff.
        assert!(fallback_after.unwrap() >= Duration::from_millis(1_200));
        assert_eq!(player.status(), Status::Paused);
        assert_eq!(player.autoplay(), Autoplay::Allowed);
    }
}
