//! Travel soundtrack player with automatic audio source fallback.
//!
//! Every track can be served by several candidate sources. The [`player`]
//! tries them in an order derived from the track, moves on to the next one
//! when a source fails, and reports when every candidate has been tried.
//! Playlists come from the mood based [`catalog`].
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod app;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod events;
pub mod player;
pub mod playlist;
pub mod signal;
pub mod simulated;
pub mod source;
pub mod state;
pub mod track;
