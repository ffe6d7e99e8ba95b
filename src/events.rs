//! Notifications emitted by the player.
//!
//! Callers use these to keep their presentation in sync with playback:
//! * Status changes drive play/pause icons, spinners and error banners
//! * Position updates drive the progress bar
//! * Track and playlist events drive "now playing" and auto-advance
//!
//! # Example
//!
//! ```rust
//! use echotour::{events::Event, state::{Reason, Status}};
//!
//! fn handle_event(event: Event) {
//!     match event {
//!         Event::StatusChanged { status: Status::Error, reason: Some(Reason::PlaybackRejected) } => {
//!             println!("click to enable audio playback")
//!         }
//!         Event::StatusChanged { status, .. } => println!("now {status}"),
//!         Event::PlaylistEnd => println!("end of playlist"),
//!         // ... handle other events ...
//!         _ => {}
//!     }
//! }
//! ```

use std::time::Duration;

use crate::{
    state::{Reason, Status},
    track::TrackId,
};

/// Events that can be emitted by the player.
///
/// Events fall into three categories:
///
/// Session events:
/// * [`TrackChanged`](Self::TrackChanged) - A new track was loaded
/// * [`StatusChanged`](Self::StatusChanged) - Playback status changed
/// * [`SourceChanged`](Self::SourceChanged) - Another candidate source is tried
/// * [`Position`](Self::Position) - Playback position moved
/// * [`TrackEnded`](Self::TrackEnded) - Media played to its end
///
/// Player events:
/// * [`Volume`](Self::Volume) - Output volume changed
/// * [`Autoplay`](Self::Autoplay) - Autoplay capability discovered
///
/// Playlist events:
/// * [`PlaylistEnd`](Self::PlaylistEnd) - Skipped forward past the last track
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Event {
    /// A new track was loaded and its first candidate is being fetched.
    TrackChanged(TrackId),

    /// Playback status changed.
    ///
    /// `reason` is set while a source is being replaced and when in
    /// [`Status::Error`].
    StatusChanged {
        status: Status,
        reason: Option<Reason>,
    },

    /// The candidate source at `index` (of `count`) is being loaded.
    SourceChanged { index: usize, count: usize },

    /// Playback position moved, by playback or by seeking.
    Position(Duration),

    /// Output volume changed, in `0.0..=1.0`.
    Volume(f32),

    /// Whether playback may start without a user gesture.
    ///
    /// Emitted when the autoplay probe reports back, and when observed during
    /// playback.
    Autoplay(bool),

    /// The current track played to its end.
    ///
    /// The player rewinds and pauses. Callers decide whether to skip to
    /// the next track.
    TrackEnded,

    /// Skipping forward wrapped past the last track of the playlist.
    ///
    /// Emitted before the first track is loaded, so callers can decide to
    /// stop instead of looping.
    PlaylistEnd,
}
