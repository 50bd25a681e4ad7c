//! Holding area for untagged responses received while an IDLE is in flight.

use std::sync::Mutex;

use imap::types::UnsolicitedResponse;

/// A mutex-guarded ordered list of untagged responses.
///
/// `append` and `drain` are the only two operations; callers must not hold the lock across any
/// user callback (e.g. while notifying a [`crate::push::PushReceiver`]).
#[derive(Default)]
pub struct UntaggedBuffer {
    responses: Mutex<Vec<UnsolicitedResponse>>,
}

impl UntaggedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a response to the end of the buffer, preserving arrival order.
    pub fn append(&self, response: UnsolicitedResponse) {
        self.responses
            .lock()
            .expect("untagged buffer mutex poisoned")
            .push(response);
    }

    /// Atomically read and clear the buffer, returning everything in arrival order.
    pub fn drain(&self) -> Vec<UnsolicitedResponse> {
        std::mem::take(
            &mut *self
                .responses
                .lock()
                .expect("untagged buffer mutex poisoned"),
        )
    }

    /// Is the buffer currently empty? Mostly useful in tests.
    pub fn is_empty(&self) -> bool {
        self.responses
            .lock()
            .expect("untagged buffer mutex poisoned")
            .is_empty()
    }
}
