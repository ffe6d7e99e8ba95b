//! Playback session state machine.
//!
//! All session state changes go through [`transition`], a pure function from
//! the current [`Session`] and an [`Input`] to the next session plus the
//! [`Effect`]s the player must carry out on its media driver. Nothing in here
//! touches a driver, a timer or a channel, so the whole machine can be driven
//! step by step in tests.
//!
//! # States
//!
//! ```text
//! Idle ──load──▶ Loading ──▶ Ready ──play──▶ Playing ⇄ Paused
//!                   │  ▲                        │
//!                   │  └──────── next source ◀──┤ (source failed)
//!                   ▼                           ▼
//!                 Error ◀──── no sources left / play rejected
//! ```
//!
//! `Error` is recoverable through `retry` or `reset_and_play`, and loading
//! another track replaces the session from any state.

use std::{fmt, time::Duration};

use url::Url;

use crate::{
    driver::{MediaEvent, Ticket},
    source::SourceList,
    track::Track,
};

/// Playback status as reported to callers.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum Status {
    /// No track loaded.
    #[default]
    Idle,
    /// A candidate source is being loaded or started.
    Loading,
    /// A source is loaded and waiting for `play`.
    Ready,
    Playing,
    Paused,
    /// Playback stopped; see the accompanying [`Reason`].
    Error,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => write!(f, "idle"),
            Status::Loading => write!(f, "loading"),
            Status::Ready => write!(f, "ready"),
            Status::Playing => write!(f, "playing"),
            Status::Paused => write!(f, "paused"),
            Status::Error => write!(f, "error"),
        }
    }
}

/// A failure reported by the media driver for a single source.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Failure {
    /// The source could not be fetched or decoded.
    SourceUnavailable,
    /// The host refused to start playback, usually for lack of a user
    /// gesture.
    PlaybackRejected,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::SourceUnavailable => write!(f, "source unavailable"),
            Failure::PlaybackRejected => write!(f, "playback rejected"),
        }
    }
}

/// Why the session is not (yet) playing.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub enum Reason {
    /// The last source failed and the next one is being tried.
    SourceUnavailable,
    /// The host refused playback; needs a user gesture.
    PlaybackRejected,
    /// Every candidate source failed; needs an explicit retry.
    AllSourcesExhausted,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::SourceUnavailable => write!(f, "source unavailable"),
            Reason::PlaybackRejected => write!(f, "playback rejected"),
            Reason::AllSourcesExhausted => write!(f, "all sources exhausted"),
        }
    }
}

/// Whether the host lets playback start without a user gesture.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub enum Autoplay {
    #[default]
    Unknown,
    Allowed,
    Blocked,
}

/// Requests and notifications that drive a session.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Input {
    Play,
    /// Play in response to a user gesture, without changing source.
    EnablePlayback,
    Pause,
    /// Seek to a position in seconds; clamped to the track duration.
    Seek(f64),
    /// Start over from the first candidate. Only valid from `Error`.
    Retry,
    /// Start over from the first candidate, from any state.
    ResetAndPlay,
    /// The backoff before trying the next candidate has elapsed.
    RetryDue(Ticket),
    /// An event reported by the media driver.
    Media(Ticket, MediaEvent),
}

/// Work for the player to carry out after a transition.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Load(Ticket, Url),
    Play(Ticket),
    Pause,
    Seek(Duration),
    /// Tell the driver a user gesture preceded the next request.
    UserGesture,
    /// Wait for the backoff, then feed back [`Input::RetryDue`].
    ScheduleRetry(Ticket),
    /// Autoplay capability was observed.
    Autoplay(bool),
    /// The media played to its end.
    Ended,
}

/// State of the one active playback session.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    track: Track,
    sources: SourceList,
    index: usize,
    attempts: usize,
    ticket: Ticket,
    status: Status,
    reason: Option<Reason>,
    elapsed: Duration,
    play_requested: bool,
    gesture: bool,
    retry_pending: bool,
}

/// Outcome of a [`transition`].
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl Session {
    /// Starts a session for `track` and loads its first candidate.
    ///
    /// `last_ticket` is the most recent ticket handed out by the player, so
    /// that tickets keep increasing across sessions. `gesture` tells whether
    /// the host has already seen a user gesture; it stays granted for later
    /// tracks, so their playback says nothing about autoplay.
    #[must_use]
    pub fn start(
        track: Track,
        sources: SourceList,
        last_ticket: Ticket,
        gesture: bool,
    ) -> Transition {
        let mut session = Self {
            track,
            sources,
            index: 0,
            attempts: 0,
            ticket: last_ticket,
            status: Status::Loading,
            reason: None,
            elapsed: Duration::ZERO,
            play_requested: false,
            gesture,
            retry_pending: false,
        };

        let mut effects = Vec::new();
        if session.sources.is_empty() {
            warn!("track {} has no candidate sources", session.track.id());
            session.fail(Reason::AllSourcesExhausted);
        } else {
            effects.push(session.load_current());
        }

        Transition { session, effects }
    }

    #[must_use]
    pub fn track(&self) -> &Track {
        &self.track
    }

    #[must_use]
    pub fn sources(&self) -> &SourceList {
        &self.sources
    }

    /// Index of the current candidate in [`Session::sources`].
    #[must_use]
    pub fn source_index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn current_source(&self) -> Option<&Url> {
        self.sources.get(self.index)
    }

    /// Number of candidates loaded since the session started or was reset.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    #[must_use]
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn reason(&self) -> Option<Reason> {
        self.reason
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn retry_pending(&self) -> bool {
        self.retry_pending
    }

    fn load_current(&mut self) -> Effect {
        self.ticket = self.ticket.next();
        self.attempts += 1;
        self.status = Status::Loading;
        Effect::Load(self.ticket, self.sources[self.index].clone())
    }

    fn fail(&mut self, reason: Reason) {
        self.status = Status::Error;
        self.reason = Some(reason);
        self.play_requested = false;
        self.retry_pending = false;
    }

    fn restart(&mut self, effects: &mut Vec<Effect>) {
        self.gesture = true;
        effects.push(Effect::UserGesture);

        if self.sources.is_empty() {
            self.fail(Reason::AllSourcesExhausted);
            return;
        }

        self.index = 0;
        self.attempts = 0;
        self.reason = None;
        self.elapsed = Duration::ZERO;
        self.retry_pending = false;
        self.play_requested = true;
        effects.push(self.load_current());
    }

    fn request_play(&mut self, effects: &mut Vec<Effect>) {
        match self.status {
            Status::Playing | Status::Error | Status::Idle => {}
            Status::Loading => self.play_requested = true,
            Status::Ready | Status::Paused => {
                self.play_requested = true;
                effects.push(Effect::Play(self.ticket));
            }
        }
    }

    fn on_media(&mut self, event: MediaEvent, effects: &mut Vec<Effect>) {
        match event {
            MediaEvent::Ready => {
                if self.status != Status::Loading {
                    return;
                }
                if !self.elapsed.is_zero() {
                    effects.push(Effect::Seek(self.elapsed));
                }
                if self.play_requested {
                    effects.push(Effect::Play(self.ticket));
                } else {
                    self.status = Status::Ready;
                }
            }

            MediaEvent::Started => {
                self.status = Status::Playing;
                self.reason = None;
                if !self.gesture {
                    effects.push(Effect::Autoplay(true));
                }
            }

            MediaEvent::Failed(Failure::SourceUnavailable) => {
                let next = self.index + 1;
                if next < self.sources.len() {
                    debug!(
                        "source {}/{} of track {} unavailable, trying next",
                        self.index + 1,
                        self.sources.len(),
                        self.track.id()
                    );
                    self.index = next;
                    self.status = Status::Loading;
                    self.reason = Some(Reason::SourceUnavailable);
                    self.retry_pending = true;
                    effects.push(Effect::ScheduleRetry(self.ticket));
                } else {
                    self.fail(Reason::AllSourcesExhausted);
                }
            }

            MediaEvent::Failed(Failure::PlaybackRejected) => {
                self.fail(Reason::PlaybackRejected);
                if !self.gesture {
                    effects.push(Effect::Autoplay(false));
                }
            }

            MediaEvent::TimeUpdate(position) => {
                if matches!(self.status, Status::Playing | Status::Paused) {
                    self.elapsed = position;
                }
            }

            MediaEvent::Ended => {
                if self.status == Status::Playing {
                    self.status = Status::Paused;
                    self.elapsed = Duration::ZERO;
                    self.play_requested = false;
                    effects.push(Effect::Seek(Duration::ZERO));
                    effects.push(Effect::Ended);
                }
            }

            // Not tied to a session; the player handles it.
            MediaEvent::AutoplayProbed(_) => {}
        }
    }
}

/// Clamps a seek target in seconds to `[0, duration]`.
///
/// Anything that is not a number seeks to the start.
#[must_use]
pub fn clamp_position(seconds: f64, duration: Duration) -> Duration {
    if seconds.is_nan() || seconds <= 0.0 {
        return Duration::ZERO;
    }

    let seconds = seconds.min(duration.as_secs_f64());
    Duration::try_from_secs_f64(seconds).unwrap_or(duration)
}

/// Applies `input` to `session`.
#[must_use]
pub fn transition(mut session: Session, input: Input) -> Transition {
    let mut effects = Vec::new();

    match input {
        Input::Play => session.request_play(&mut effects),

        Input::EnablePlayback => match (session.status, session.reason) {
            (Status::Error, Some(Reason::PlaybackRejected)) => {
                session.gesture = true;
                session.status = Status::Loading;
                session.reason = None;
                session.play_requested = true;
                effects.push(Effect::UserGesture);
                effects.push(Effect::Play(session.ticket));
            }
            (Status::Error, _) => session.restart(&mut effects),
            _ => {
                session.gesture = true;
                effects.push(Effect::UserGesture);
                session.request_play(&mut effects);
            }
        },

        Input::Pause => {
            if session.status == Status::Playing {
                session.status = Status::Paused;
                session.play_requested = false;
                effects.push(Effect::Pause);
            }
        }

        Input::Seek(seconds) => {
            session.elapsed = clamp_position(seconds, session.track.duration());
            if matches!(
                session.status,
                Status::Ready | Status::Playing | Status::Paused
            ) {
                effects.push(Effect::Seek(session.elapsed));
            }
        }

        Input::Retry => {
            if session.status == Status::Error {
                session.restart(&mut effects);
            } else {
                debug!("ignoring retry while {}", session.status);
            }
        }

        Input::ResetAndPlay => session.restart(&mut effects),

        Input::RetryDue(ticket) => {
            if session.retry_pending && ticket == session.ticket {
                session.retry_pending = false;
                effects.push(session.load_current());
            } else {
                trace!("ignoring stale retry timer {ticket}");
            }
        }

        Input::Media(ticket, event) => {
            if ticket != session.ticket {
                trace!(
                    "discarding {event:?} for {ticket}; current is {}",
                    session.ticket
                );
            } else if session.retry_pending || session.status == Status::Error {
                trace!("discarding {event:?} while {}", session.status);
            } else {
                session.on_media(event, &mut effects);
            }
        }
    }

    Transition { session, effects }
}
