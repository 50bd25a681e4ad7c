//! A long-lived IMAP `IDLE` push engine for a single mailbox folder.
//!
//! One [`push::RefreshController`] owns one OS thread for one folder, parking it in `IDLE`
//! against a host-supplied [`push::Connection`]/[`push::Folder`] pair (backed in practice by the
//! [`imap`] crate) and reporting flag changes and sync requests back through a
//! [`push::PushReceiver`]. The engine never parses IMAP wire bytes itself; see the `push` module
//! docs for the narrow trait boundary this crate consumes from its host.

pub mod push;

pub use push::{
    Connection, Folder, FlagChange, IdleControl, IdleEvent, PushError, PushLoop, PushReceiver,
    PushState, RefreshController, Result, StoreConfig, WakeLock,
};
