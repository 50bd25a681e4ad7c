//! The narrow interface the push engine consumes from its host.
//!
//! None of these traits parse IMAP wire bytes themselves; a concrete implementation is expected
//! to be backed by the [`imap`] crate's [`imap::Session`] and
//! [`imap::extensions::idle::Handle`] types. The push engine only ever talks to these traits, so
//! it can be exercised in unit tests against an in-memory mock without a socket in sight.

use std::time::Duration;

use crate::push::error::Result;

/// One message's flag set, as reported by a QRESYNC `FETCH` response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagChange {
    /// The message's UID, as a decimal string (the core never needs to do arithmetic on it).
    pub uid: String,
    /// The raw flag names reported by the server, e.g. `\Seen`, `\Answered`.
    pub flags: Vec<String>,
}

/// An event delivered to the IDLE callback. Continuation requests (`+ …`) are not themselves
/// unsolicited responses at the wire-codec level, so they get their own variant here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleEvent {
    /// The server sent a `+` continuation: it is now idling and will push updates.
    ContinuationReceived,
    /// An untagged response arrived while idling.
    Untagged(imap::types::UnsolicitedResponse),
}

/// What the IDLE callback tells the command engine to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleControl {
    /// Keep waiting for more server input.
    Continue,
    /// Stop the IDLE command now (the caller has already arranged for `DONE` to be sent, or the
    /// connection is being torn down).
    Stop,
}

/// One open, authenticated connection to the server, narrowed to what the push engine needs
/// during an IDLE.
pub trait Connection: Send {
    /// Does the server advertise the named capability (e.g. `"IDLE"`, `"QRESYNC"`)?
    fn has_capability(&mut self, name: &str) -> Result<bool>;

    /// Adjust the read timeout for subsequent blocking reads on this connection.
    fn set_read_timeout(&mut self, dur: Duration) -> Result<()>;

    /// Write the given bytes as a continuation line (used to send the literal `DONE`).
    fn send_continuation(&mut self, text: &[u8]) -> Result<()>;

    /// Non-blocking check: is there already buffered input waiting to be read?
    fn more_responses_available(&self) -> bool;

    /// Tear down the connection. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// The currently selected mailbox folder.
pub trait Folder: Send {
    /// Open (SELECT) the folder if it is not already open. Returns `true` if this call performed
    /// the open (as opposed to finding it already open).
    fn open_if_closed(&mut self) -> Result<bool>;

    /// Close the folder, releasing any held connection state.
    fn close(&mut self) -> Result<()>;

    /// Is the folder currently open?
    fn is_open(&self) -> bool;

    /// The server-reported `UIDNEXT`, if known.
    fn uid_next(&mut self) -> Result<Option<u32>>;

    /// The highest UID currently in the mailbox, if known.
    fn highest_uid(&mut self) -> Result<Option<u32>>;

    /// Number of messages currently in the mailbox.
    fn message_count(&mut self) -> Result<u32>;

    /// Does the underlying connection support QRESYNC?
    fn supports_qresync(&self) -> bool;

    /// Create a fresh [`Connection`] handle usable for an IDLE session on this folder.
    fn create_idle_session(&mut self) -> Result<Box<dyn Connection>>;

    /// Issue the `IDLE` command, calling `handler` for every event until it returns
    /// [`IdleControl::Stop`] or the command completes on its own (timeout, server-initiated
    /// completion, or a `DONE` round trip).
    fn execute_idle(
        &mut self,
        handler: &mut dyn FnMut(IdleEvent) -> IdleControl,
    ) -> Result<()>;
}

/// An opaque, host-provided power-management resource. The push engine never constructs one
/// itself; it only acquires/releases through this trait.
pub trait WakeLock: Send + Sync {
    /// Acquire the lock for at most `timeout`, preventing the device from sleeping.
    fn acquire(&self, timeout: Duration);

    /// Release the lock. Safe to call even if not currently held.
    fn release(&self);
}

/// Host-side collaborator that receives sync requests and reports errors upward to the
/// application. See `SPEC_FULL.md` §6.
pub trait PushReceiver: Send + Sync {
    /// Ask the host to fully re-synchronize `folder`.
    fn sync_folder(&self, folder: &str);

    /// A QRESYNC `FETCH` updated a single message's flags without requiring a full sync.
    fn message_flags_changed(&self, folder: &str, change: FlagChange);

    /// The folder's highest MODSEQ advanced.
    fn highest_mod_seq_changed(&self, folder: &str, modseq: u64);

    /// Whether this folder currently has an active push connection.
    fn set_push_active(&self, folder: &str, active: bool);

    /// A recoverable error occurred; `cause` is `None` for engine-generated conditions (such as
    /// "push disabled after N errors") and `Some` for errors bubbled up from the connection.
    fn push_error(&self, folder: &str, description: &str, cause: Option<&crate::push::PushError>);

    /// Authentication was rejected while (re)opening the folder. Terminal for this pusher.
    fn authentication_failed(&self, folder: &str);

    /// Sleep for `dur`, holding `wake_lock` appropriately. The host controls how sleeping
    /// interacts with power management; the engine never calls `std::thread::sleep` directly.
    fn sleep(&self, wake_lock: &dyn WakeLock, dur: Duration);

    /// Load the persisted push state line for `folder` (see [`crate::push::state::PushState`]).
    /// Returns an empty string if none has ever been written.
    fn push_state(&self, folder: &str) -> String;
}

/// Per-folder tunables supplied by the host's account/store configuration.
pub trait StoreConfig: Send + Sync {
    /// How many of the most recent messages the host keeps visible without a full re-sync.
    fn display_count(&self) -> u32;

    /// How often (in minutes) the server expects the client to refresh its IDLE.
    fn idle_refresh_minutes(&self) -> u32;

    /// Whether to force a sync immediately after (re)connecting, even if the cursor looks caught
    /// up.
    fn push_poll_on_connect(&self) -> bool;
}
