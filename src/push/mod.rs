//! IMAP push engine: one IDLE-holding worker per folder, driven by a host-supplied
//! [`Connection`]/[`Folder`] pair and reporting back through a [`PushReceiver`]. See
//! `SPEC_FULL.md` for the full module breakdown.

mod buffer;
mod classifier;
mod constants;
mod controller;
mod error;
mod idle_session;
mod push_loop;
mod state;
mod traits;
mod wake_lock;

pub use classifier::{smallest_seq_num, Classification, SyncDecision};
pub use controller::RefreshController;
pub use error::{PushError, Result};
pub use push_loop::PushLoop;
pub use state::PushState;
pub use traits::{Connection, Folder, FlagChange, IdleControl, IdleEvent, PushReceiver, StoreConfig, WakeLock};
pub use wake_lock::WakeLockGuard;
