//! Error types for evolver-kernel.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for evolver-kernel operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Process/PTY transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

impl Error {
    /// True when the child closed its side of the terminal before the
    /// expected prompt showed up, or there is no child to talk to at all.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            Error::Channel(ChannelError::Closed) | Error::Driver(DriverError::NotConnected)
        )
    }

    /// True when a bounded wait for a prompt ran out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Channel(ChannelError::PatternTimeout(_)))
    }
}

/// Transport layer errors (process spawn, PTY setup).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The executable could not be found or started
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    /// Pseudo-terminal allocation or configuration failed
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, stream state).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// The child exited or the terminal was closed before the pattern matched
    #[error("End of stream")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (handshake, session management).
#[derive(Error, Debug)]
pub enum DriverError {
    /// No live session is available
    #[error("No live Evolver session")]
    NotConnected,

    /// The startup handshake could not bring the child to a usable state
    #[error("Handshake failed: {message}")]
    HandshakeFailed { message: String },
}

/// Result type alias using evolver-kernel's Error.
pub type Result<T> = std::result::Result<T, Error>;
