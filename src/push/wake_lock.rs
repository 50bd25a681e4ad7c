//! RAII helper over the host-provided [`WakeLock`](crate::push::traits::WakeLock).
//!
//! The distilled spec describes wake-lock acquire/release as balanced on every exit path
//! "including exceptions", via a `finally`-equivalent. Rust has no `finally`; the idiomatic
//! substitution is a guard whose `Drop` impl releases. This is a deliberate, spec-preserving
//! translation (see `SPEC_FULL.md` §5), not a behavior change.

use std::sync::Arc;
use std::time::Duration;

use crate::push::traits::WakeLock;

/// Acquires `wake_lock` for `timeout` on construction, releases it on drop.
pub struct WakeLockGuard {
    wake_lock: Arc<dyn WakeLock>,
}

impl WakeLockGuard {
    /// Acquire `wake_lock` for up to `timeout`.
    pub fn acquire(wake_lock: Arc<dyn WakeLock>, timeout: Duration) -> Self {
        wake_lock.acquire(timeout);
        WakeLockGuard { wake_lock }
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.wake_lock.release();
    }
}
