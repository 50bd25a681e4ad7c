//! Owns one connection for the duration of an IDLE and guarantees `DONE` is sent at most once.
//! See `SPEC_FULL.md` §4.1.

use std::sync::Mutex;
use std::time::Duration;

use crate::push::error::{PushError, Result};
use crate::push::traits::Connection;

struct State {
    connection: Option<Box<dyn Connection>>,
    accepting: bool,
}

/// Thin wrapper around one open folder connection during an IDLE.
///
/// All transitions are serialized under a single mutex, matching the teacher's own single-lock
/// `Handle` design (`imap::extensions::idle::Handle`), just generalized to a host-supplied
/// `Connection` instead of a concrete TLS stream.
pub struct IdleSession {
    state: Mutex<State>,
}

impl IdleSession {
    /// Wrap a freshly-created connection.
    pub fn new(connection: Box<dyn Connection>) -> Self {
        IdleSession {
            state: Mutex::new(State {
                connection: Some(connection),
                accepting: false,
            }),
        }
    }

    /// Does the connection advertise the `IDLE` capability?
    pub fn has_idle_capability(&self) -> Result<bool> {
        let mut guard = self.state.lock().expect("idle session mutex poisoned");
        match guard.connection.as_mut() {
            Some(conn) => conn.has_capability("IDLE"),
            None => Err(PushError::Invariant("has_idle_capability: no connection")),
        }
    }

    /// Adjust the read timeout on the underlying connection.
    pub fn set_read_timeout(&self, dur: Duration) -> Result<()> {
        let mut guard = self.state.lock().expect("idle session mutex poisoned");
        match guard.connection.as_mut() {
            Some(conn) => conn.set_read_timeout(dur),
            None => Err(PushError::Invariant("set_read_timeout: no connection")),
        }
    }

    /// Non-blocking check used by the classifier to decide whether to drain.
    pub fn more_responses_available(&self) -> bool {
        let guard = self.state.lock().expect("idle session mutex poisoned");
        guard
            .connection
            .as_ref()
            .map(|c| c.more_responses_available())
            .unwrap_or(false)
    }

    /// Called after the server returns a `+` continuation indicating it is now idling.
    pub fn start_accepting_done(&self) -> Result<()> {
        let mut guard = self.state.lock().expect("idle session mutex poisoned");
        if guard.connection.is_none() {
            return Err(PushError::Invariant(
                "start_accepting_done: no connection attached",
            ));
        }
        guard.accepting = true;
        Ok(())
    }

    /// Called in the `finally`-equivalent of the IDLE command; detaches the connection from this
    /// session so a subsequent `stop_idle` is a no-op.
    pub fn stop_accepting_done(&self) {
        let mut guard = self.state.lock().expect("idle session mutex poisoned");
        guard.connection = None;
        guard.accepting = false;
    }

    /// If currently accepting, flip the flag and attempt to send `DONE`. Idempotent: a second
    /// call (or a call after [`IdleSession::stop_accepting_done`]) is a no-op.
    ///
    /// The `DONE` write happens while holding the session lock, matching the teacher's own
    /// `Handle::terminate`; see `SPEC_FULL.md` §9 for the open question this preserves rather
    /// than silently resolves.
    pub fn stop_idle(&self) {
        let mut guard = self.state.lock().expect("idle session mutex poisoned");
        if !guard.accepting {
            return;
        }
        guard.accepting = false;
        if let Some(conn) = guard.connection.as_mut() {
            if conn.send_continuation(b"DONE").is_err() {
                // A write failure here will be superseded by whatever error the IDLE command's
                // own return path reports; absorb it and close so we don't leak the connection.
                let _ = conn.close();
                guard.connection = None;
            }
        }
    }
}
