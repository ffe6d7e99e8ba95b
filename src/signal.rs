//! System signals that stop or restart playback.
//!
//! * Unix: Ctrl-C (SIGINT) and SIGTERM stop, SIGHUP restarts the current
//!   track from its first source
//! * Windows: Ctrl-C only
//!
//! # Example
//!
//! ```no_run
//! use echotour::signal::{Handler, ShutdownSignal};
//!
//! async fn example() {
//!     let mut signals = Handler::new().unwrap();
//!
//!     match signals.recv().await {
//!         ShutdownSignal::Interrupt | ShutdownSignal::Terminate => {
//!             println!("stopping playback");
//!         }
//!         ShutdownSignal::Reload => println!("restarting track"),
//!     }
//! }
//! ```

use std::fmt;

use crate::error::Result;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Signal received from the operating system.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[expect(clippy::module_name_repetitions)]
pub enum ShutdownSignal {
    /// Ctrl-C or SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGHUP: start the current track over
    Reload,
}

impl ShutdownSignal {
    /// Whether the application should exit.
    #[must_use]
    pub fn is_shutdown(self) -> bool {
        matches!(self, Self::Interrupt | Self::Terminate)
    }
}

pub struct Handler {
    #[cfg(unix)]
    sigterm: Signal,
    #[cfg(unix)]
    sighup: Signal,
}

impl Handler {
    /// Registers the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the handlers cannot be registered.
    pub fn new() -> Result<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                sigterm: signal(SignalKind::terminate())?,
                sighup: signal(SignalKind::hangup())?,
            })
        }

        #[cfg(not(unix))]
        Ok(Self {})
    }

    /// Waits for the next signal.
    pub async fn recv(&mut self) -> ShutdownSignal {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => ShutdownSignal::Interrupt,
                _ = self.sigterm.recv() => ShutdownSignal::Terminate,
                _ = self.sighup.recv() => ShutdownSignal::Reload,
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
            ShutdownSignal::Interrupt
        }
    }
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => write!(f, "Ctrl+C"),
            ShutdownSignal::Terminate => write!(f, "SIGTERM"),
            ShutdownSignal::Reload => write!(f, "SIGHUP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_reload_keeps_running() {
        assert!(ShutdownSignal::Interrupt.is_shutdown());
        assert!(ShutdownSignal::Terminate.is_shutdown());
        assert!(!ShutdownSignal::Reload.is_shutdown());
        assert_eq!(ShutdownSignal::Reload.to_string(), "SIGHUP");
    }
}
