//! Error types for console-host.

use thiserror::Error;

use crate::session::SessionState;

/// Main error type for console-host operations.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The console process could not be spawned.
    #[error("failed to start console session: {0}")]
    SessionStart(String),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: SessionState,
        to: SessionState,
    },

    /// The session was disposed before or during the operation.
    #[error("session disposed")]
    SessionDisposed,

    /// `start()` was called while another start is still in flight.
    #[error("session is already starting")]
    AlreadyStarting,

    /// Operation requires a running session.
    #[error("session not running: current state is {0:?}")]
    NotRunning(SessionState),

    /// Input was submitted to a console that cannot accept it.
    #[error("Console is not enabled.")]
    ConsoleNotEnabled,

    /// The host shell has not created the console container yet.
    #[error("host container unavailable")]
    ContainerUnavailable,

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for console-host operations.
pub type Result<T> = std::result::Result<T, ConsoleError>;
