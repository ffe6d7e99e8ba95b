//! Error handling for echotour.
//!
//! Provides a unified error type for configuration, persistence and
//! command-line failures. Errors are categorized into kinds borrowed from
//! gRPC status codes, with mappings from the I/O and parser errors the crate runs into.
//!
//! Playback failures are *not* reported through this type. The player absorbs
//! them and reports a [`Reason`](crate::state::Reason) alongside its status
//! instead, so callers never have to handle errors from playback commands.
//!
//! # Example
//!
//! ```rust
//! use echotour::error::{Error, ErrorKind, Result};
//!
//! fn read_volume(input: &str) -> Result<f32> {
//!     let volume: f32 = input.parse().map_err(Error::invalid_argument)?;
//!     if !(0.0..=1.0).contains(&volume) {
//!         return Err(Error::out_of_range("volume must be between 0 and 1"));
//!     }
//!     Ok(volume)
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// # Returns
    /// * `Some(&E)` - If the underlying error is of type `E`
    /// * `None` - If the underlying error is not of type `E`
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

/// Standard result type for echotour operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// See [gRPC status codes](https://github.com/googleapis/googleapis/blob/master/google/rpc/code.proto)
/// for the upstream definitions.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    #[error("operation was cancelled")]
    Cancelled = 1,

    #[error("unknown error")]
    Unknown = 2,

    #[error("invalid argument specified")]
    InvalidArgument = 3,

    #[error("operation timed out")]
    DeadlineExceeded = 4,

    #[error("not found")]
    NotFound = 5,

    #[error("attempt to create what already exists")]
    AlreadyExists = 6,

    #[error("permission denied")]
    PermissionDenied = 7,

    #[error("invalid state")]
    FailedPrecondition = 9,

    #[error("operation aborted")]
    Aborted = 10,

    #[error("out of range")]
    OutOfRange = 11,

    #[error("internal error")]
    Internal = 13,

    #[error("service unavailable")]
    Unavailable = 14,

    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    pub fn aborted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Aborted, error)
    }

    pub fn already_exists<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::AlreadyExists, error)
    }

    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Creates an error for data corruption or loss.
    ///
    /// Use when persisted state cannot be read back, for example a state file
    /// that is not valid JSON.
    pub fn data_loss<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DataLoss, error)
    }

    pub fn deadline_exceeded<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DeadlineExceeded, error)
    }

    /// Creates an error for operations that failed due to current state.
    ///
    /// Use when an operation cannot proceed due to the current system state,
    /// like sending a command to a player that has shut down.
    pub fn failed_precondition<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::FailedPrecondition, error)
    }

    /// Creates an error for unexpected internal errors that shouldn't occur
    /// during normal operation.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Creates an error for invalid arguments.
    ///
    /// Use when provided arguments or configuration values don't meet
    /// validation requirements.
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    pub fn not_found<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::NotFound, error)
    }

    /// Creates an error for values outside valid range.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::out_of_range("volume must be between 0 and 1");
    /// assert_eq!(err.kind, ErrorKind::OutOfRange);
    /// ```
    pub fn out_of_range<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::OutOfRange, error)
    }

    pub fn permission_denied<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::PermissionDenied, error)
    }

    pub fn unavailable<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unavailable, error)
    }

    pub fn unknown<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unknown, error)
    }
}

/// Returns the underlying error source.
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Formats the error for display as "{kind}: {details}".
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors into appropriate error kinds.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AlreadyExists => Self::already_exists(err),
            ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts JSON errors: syntax and data errors mean the stored document is
/// corrupt, the rest are I/O failures while reading or writing it.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match err.classify() {
            Category::Syntax | Category::Data | Category::Eof => Self::data_loss(err),
            Category::Io => Self::unavailable(err),
        }
    }
}

/// Converts TOML parse errors to `InvalidArgument`.
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::invalid_argument(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.downcast::<std::io::Error>().is_some());
    }

    #[test]
    fn corrupt_json_maps_to_data_loss() {
        let err = serde_json::from_str::<serde_json::Value>("{not json")
            .map_err(Error::from)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DataLoss);
    }

    #[test]
    fn display_includes_kind_and_details() {
        let err = Error::out_of_range("volume must be between 0 and 1");
        assert_eq!(
            err.to_string(),
            "out of range: volume must be between 0 and 1"
        );
    }
}
