//! Tunables for the push engine. See `SPEC_FULL.md` §6.

use std::time::Duration;

/// Grace period added on top of the server's own IDLE refresh interval before we consider the
/// connection hung and time out the read.
pub const IDLE_READ_TIMEOUT_INCREMENT: Duration = Duration::from_secs(5 * 60);

/// Consecutive non-auth failures after which the pusher gives up on this folder for good.
pub const IDLE_FAILURE_COUNT_LIMIT: u32 = 10;

/// Ceiling for the exponential backoff between failed IDLE attempts.
pub const MAX_DELAY_TIME: Duration = Duration::from_secs(300);

/// Starting point (and post-success reset value) for the backoff delay.
pub const NORMAL_DELAY_TIME: Duration = Duration::from_secs(5);

/// Default bound on how long a wake-lock acquired just to cover setup work may be held before
/// the host is expected to let the device sleep again. Hosts may override this via
/// [`crate::push::PushLoop::with_wake_lock_timeout`].
pub const PUSH_WAKE_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
