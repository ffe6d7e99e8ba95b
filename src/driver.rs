//! Abstraction over the host's media playback facility.
//!
//! The player owns exactly one [`MediaDriver`] and is the only thing allowed
//! to change its source or position. Drivers never block: they start the
//! requested operation and later report its outcome as a [`MediaEvent`]
//! through the channel they were constructed with.
//!
//! Every event is tagged with the [`Ticket`] of the `load` it belongs to.
//! The player discards events whose ticket is no longer current, which is
//! what keeps a slow failure of an old source from clobbering the state of a
//! newer one.

use std::{fmt, time::Duration};

use tokio::sync::mpsc;
use url::Url;

use crate::state::Failure;

/// Identifies one `load` request issued to a driver.
///
/// Tickets strictly increase over the lifetime of a player, across tracks.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    /// Ticket used for events that do not belong to any load, like the
    /// autoplay probe.
    pub const NONE: Ticket = Ticket(0);

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Progress reported by a media driver.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// The loaded source can be played.
    Ready,

    /// A `play` request succeeded and audio is running.
    Started,

    /// Loading or playing the source failed.
    Failed(Failure),

    /// Current playback position.
    TimeUpdate(Duration),

    /// Playback reached the end of the media.
    Ended,

    /// Outcome of [`MediaDriver::probe_autoplay`]: whether playback may
    /// start without a user gesture.
    AutoplayProbed(bool),
}

/// Sending half that drivers report their events on.
pub type EventSender = mpsc::UnboundedSender<(Ticket, MediaEvent)>;

/// Receiving half the player reads driver events from.
pub type EventReceiver = mpsc::UnboundedReceiver<(Ticket, MediaEvent)>;

/// A swappable media playback backend.
pub trait MediaDriver: Send {
    /// Replaces the current source with `url` and starts loading it.
    ///
    /// Reports [`MediaEvent::Ready`] or [`MediaEvent::Failed`] tagged with
    /// `ticket`.
    fn load(&mut self, ticket: Ticket, url: &Url);

    /// Starts playback of the source loaded under `ticket`.
    ///
    /// Reports [`MediaEvent::Started`] or [`MediaEvent::Failed`].
    fn play(&mut self, ticket: Ticket);

    fn pause(&mut self);

    fn seek(&mut self, position: Duration);

    /// Sets the output volume in `0.0..=1.0`.
    fn set_volume(&mut self, volume: f32);

    /// Tells the driver that the next request results from a user gesture,
    /// which hosts with an autoplay policy require before playback.
    fn user_gesture(&mut self) {}

    /// Asks whether playback may start without a user gesture.
    ///
    /// Reports [`MediaEvent::AutoplayProbed`] tagged with [`Ticket::NONE`].
    fn probe_autoplay(&mut self);
}
