//! Error taxonomy for the push engine, in the same hand-rolled style as [`imap::Error`].
//!
//! Unlike the wire-codec's error type, the push engine deliberately keeps a small, closed set of
//! variants: everything the loop can observe collapses into one of *Transport*, *Protocol*,
//! *Unsupported*, *Auth*, or *Invariant* (see `SPEC_FULL.md` §7), because the backoff ladder only
//! ever needs to ask "is this auth, is this fatal, or do I retry?".

use std::fmt;
use std::io;

/// A convenience wrapper around `Result` for [`PushError`].
pub type Result<T> = std::result::Result<T, PushError>;

/// Errors that can occur while running the push loop for a single folder.
#[derive(Debug)]
pub enum PushError {
    /// Socket read/write/close failure or timeout. Recoverable via the backoff ladder.
    Transport(io::Error),
    /// Malformed or unexpected server response. Recoverable via the backoff ladder.
    Protocol(String),
    /// The server does not advertise the `IDLE` capability. Fatal for this folder.
    Unsupported,
    /// Authentication was rejected while (re)opening the folder. Fatal for this folder.
    Auth(String),
    /// Misuse of the public API, such as starting a controller twice.
    Invariant(&'static str),
}

impl From<io::Error> for PushError {
    fn from(err: io::Error) -> Self {
        PushError::Transport(err)
    }
}

impl From<imap::Error> for PushError {
    fn from(err: imap::Error) -> Self {
        match err {
            imap::Error::Io(e) => PushError::Transport(e),
            imap::Error::No(msg) | imap::Error::Bad(msg) => PushError::Protocol(msg),
            imap::Error::ConnectionLost => {
                PushError::Transport(io::Error::from(io::ErrorKind::ConnectionAborted))
            }
            other => PushError::Protocol(other.to_string()),
        }
    }
}

impl fmt::Display for PushError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Transport(e) => write!(f, "transport error: {e}"),
            PushError::Protocol(msg) => write!(f, "protocol error: {msg}"),
            PushError::Unsupported => write!(f, "server does not support IDLE"),
            PushError::Auth(msg) => write!(f, "authentication failed: {msg}"),
            PushError::Invariant(msg) => write!(f, "invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for PushError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PushError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl PushError {
    /// True for errors that should be treated like [`PushError::Auth`] in the failure ladder:
    /// fatal, never retried, never counted against the failure cap.
    pub fn is_auth(&self) -> bool {
        matches!(self, PushError::Auth(_))
    }
}
