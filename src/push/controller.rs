//! Public lifecycle surface for one folder's push worker. See `SPEC_FULL.md` §4.5.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::push::error::{PushError, Result};
use crate::push::push_loop::PushLoop;
use crate::push::traits::{Folder, PushReceiver, StoreConfig, WakeLock};

/// Owns the worker thread for a single folder's push connection.
///
/// Each controller is meant to be started at most once; starting a second time, or calling
/// `refresh`/`stop` before `start`, is a misuse of the API surfaced as [`PushError::Invariant`]
/// rather than silently ignored, mirroring how the teacher's own `Handle` refuses a second
/// `terminate`.
pub struct RefreshController {
    push_loop: Arc<PushLoop>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshController {
    /// Create a controller for `folder_name`. Does not start a worker thread.
    pub fn new(
        folder_name: impl Into<String>,
        config: Arc<dyn StoreConfig>,
        receiver: Arc<dyn PushReceiver>,
        wake_lock: Arc<dyn WakeLock>,
    ) -> Self {
        RefreshController {
            push_loop: Arc::new(PushLoop::new(folder_name, config, receiver, wake_lock)),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the worker thread, handing it ownership of `folder`. Fails with
    /// [`PushError::Invariant`] if already started.
    pub fn start(&self, folder: Box<dyn Folder>) -> Result<()> {
        let mut handle = self.handle.lock().expect("poisoned");
        if handle.is_some() {
            return Err(PushError::Invariant("controller already started"));
        }

        let push_loop = self.push_loop.clone();
        let folder_name = push_loop.folder_name().to_string();
        *handle = Some(
            thread::Builder::new()
                .name(format!("push-{folder_name}"))
                .spawn(move || push_loop.run(folder))
                .expect("failed to spawn push worker thread"),
        );
        Ok(())
    }

    /// End the current IDLE, if any, so the worker polls immediately instead of waiting out its
    /// read timeout. A no-op if the worker isn't currently idling.
    pub fn refresh(&self) {
        self.push_loop.signal_refresh();
    }

    /// Is the worker currently parked in `IDLE`?
    pub fn is_idling(&self) -> bool {
        self.push_loop.is_idling()
    }

    /// Request the worker stop, and block until its thread has exited. Fails with
    /// [`PushError::Invariant`] if never started, or if already stopped.
    pub fn stop(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .expect("poisoned")
            .take()
            .ok_or(PushError::Invariant("controller was never started"))?;

        self.push_loop.signal_stop();
        handle
            .join()
            .map_err(|_| PushError::Invariant("push worker thread panicked"))
    }
}
