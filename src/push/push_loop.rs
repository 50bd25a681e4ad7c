//! The main push worker. See `SPEC_FULL.md` §4.4.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use imap::types::UnsolicitedResponse;
use log::{debug, info, warn};

use crate::push::buffer::UntaggedBuffer;
use crate::push::classifier::{classify, decide_sync, Classification, SyncDecision};
use crate::push::constants::{
    IDLE_FAILURE_COUNT_LIMIT, IDLE_READ_TIMEOUT_INCREMENT, MAX_DELAY_TIME, NORMAL_DELAY_TIME,
    PUSH_WAKE_LOCK_TIMEOUT,
};
use crate::push::error::{PushError, Result};
use crate::push::idle_session::IdleSession;
use crate::push::state::PushState;
use crate::push::traits::{Folder, IdleControl, IdleEvent, PushReceiver, StoreConfig, WakeLock};
use crate::push::wake_lock::WakeLockGuard;

/// `start_uid = max(1, max(old_uid_next, new_uid_next - display_count))`.
fn compute_start_uid(old_uid_next: i64, new_uid_next: i64, display_count: u32) -> i64 {
    old_uid_next
        .max(new_uid_next - i64::from(display_count))
        .max(1)
}

/// The worker for a single folder. Created once, started once, stopped once; see
/// [`crate::push::RefreshController`] for the public lifecycle surface that owns one of these.
pub struct PushLoop {
    folder_name: String,
    config: Arc<dyn StoreConfig>,
    receiver: Arc<dyn PushReceiver>,
    wake_lock: Arc<dyn WakeLock>,
    wake_lock_timeout: Duration,
    stop: AtomicBool,
    idling: AtomicBool,
    needs_poll: AtomicBool,
    active_session: Mutex<Option<Arc<IdleSession>>>,
}

impl PushLoop {
    /// Create a new worker for `folder_name`. Does not start a thread; call
    /// [`PushLoop::run`] from whatever thread should own it (normally done for you by
    /// [`crate::push::RefreshController::start`]).
    pub fn new(
        folder_name: impl Into<String>,
        config: Arc<dyn StoreConfig>,
        receiver: Arc<dyn PushReceiver>,
        wake_lock: Arc<dyn WakeLock>,
    ) -> Self {
        PushLoop {
            folder_name: folder_name.into(),
            config,
            receiver,
            wake_lock,
            wake_lock_timeout: PUSH_WAKE_LOCK_TIMEOUT,
            stop: AtomicBool::new(false),
            idling: AtomicBool::new(false),
            needs_poll: AtomicBool::new(false),
            active_session: Mutex::new(None),
        }
    }

    /// Override the bounded window used for the per-iteration setup wake-lock. Mostly useful in
    /// tests that want to assert on exact `acquire` calls.
    pub fn with_wake_lock_timeout(mut self, timeout: Duration) -> Self {
        self.wake_lock_timeout = timeout;
        self
    }

    pub fn folder_name(&self) -> &str {
        &self.folder_name
    }

    /// Is the worker currently parked in an `IDLE` command?
    pub fn is_idling(&self) -> bool {
        self.idling.load(Ordering::Acquire)
    }

    /// Cooperatively request that the worker stop. If currently idling, also ends the IDLE via
    /// `DONE` so the worker notices the flag promptly instead of waiting for the read timeout.
    pub fn signal_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(session) = self.active_session.lock().expect("poisoned").clone() {
            session.stop_idle();
        }
    }

    /// End the current IDLE (if any) via `DONE`, causing the worker to poll immediately on its
    /// next iteration. A no-op if the worker is not currently idling.
    pub fn signal_refresh(&self) {
        if !self.is_idling() {
            return;
        }
        self.needs_poll.store(true, Ordering::SeqCst);
        let _guard = WakeLockGuard::acquire(self.wake_lock.clone(), self.wake_lock_timeout);
        if let Some(session) = self.active_session.lock().expect("poisoned").clone() {
            session.stop_idle();
        }
    }

    /// Run the worker loop until [`PushLoop::signal_stop`] is called. Takes ownership of the
    /// folder for the duration of the loop.
    pub fn run(&self, mut folder: Box<dyn Folder>) {
        let mut delay_time = NORMAL_DELAY_TIME;
        let mut idle_failure_count: u32 = 0;
        let mut last_uid_next: i64 = -1;

        while !self.stop.load(Ordering::SeqCst) {
            let _setup_guard =
                WakeLockGuard::acquire(self.wake_lock.clone(), self.wake_lock_timeout);

            match self.run_iteration(folder.as_mut(), &mut last_uid_next) {
                Ok(()) => {
                    delay_time = NORMAL_DELAY_TIME;
                    idle_failure_count = 0;
                }
                Err(err) if self.stop.load(Ordering::SeqCst) => {
                    info!(
                        "push[{}]: error observed after stop was requested, dropping: {err}",
                        self.folder_name
                    );
                }
                Err(err) if err.is_auth() => {
                    self.receiver.set_push_active(&self.folder_name, false);
                    let _ = folder.close();
                    self.receiver.authentication_failed(&self.folder_name);
                    self.stop.store(true, Ordering::SeqCst);
                }
                Err(PushError::Unsupported) => {
                    self.receiver.set_push_active(&self.folder_name, false);
                    let _ = folder.close();
                    self.receiver.push_error(
                        &self.folder_name,
                        &PushError::Unsupported.to_string(),
                        None,
                    );
                    self.stop.store(true, Ordering::SeqCst);
                }
                Err(err) => {
                    warn!("push[{}]: {err}", self.folder_name);
                    self.receiver.set_push_active(&self.folder_name, false);
                    let _ = folder.close();
                    self.receiver
                        .push_error(&self.folder_name, &err.to_string(), Some(&err));

                    self.receiver.sleep(&*self.wake_lock, delay_time);
                    delay_time = (delay_time * 2).min(MAX_DELAY_TIME);

                    idle_failure_count += 1;
                    if idle_failure_count > IDLE_FAILURE_COUNT_LIMIT {
                        self.receiver.push_error(
                            &self.folder_name,
                            &format!(
                                "Push disabled for {} after {idle_failure_count} consecutive errors",
                                self.folder_name
                            ),
                            None,
                        );
                        self.stop.store(true, Ordering::SeqCst);
                    }
                }
            }
        }

        self.receiver.set_push_active(&self.folder_name, false);
        let _ = folder.close();
        self.wake_lock.release();
    }

    fn run_iteration(&self, folder: &mut dyn Folder, last_uid_next: &mut i64) -> Result<()> {
        let persisted = PushState::parse(&self.receiver.push_state(&self.folder_name)).uid_next;
        let old_uid_next = persisted.max(*last_uid_next);

        let opened_new = folder.open_if_closed()?;
        let connection = folder.create_idle_session()?;
        let session = Arc::new(IdleSession::new(connection));
        if !session.has_idle_capability()? {
            self.receiver.set_push_active(&self.folder_name, false);
            let _ = folder.close();
            return Err(PushError::Unsupported);
        }

        let needs_poll = self.needs_poll.swap(false, Ordering::SeqCst);
        if self.config.push_poll_on_connect() && (opened_new || needs_poll) {
            self.receiver.sync_folder(&self.folder_name);
        }

        let new_uid_next = match folder.uid_next()? {
            Some(n) => i64::from(n),
            None => match folder.highest_uid()? {
                Some(h) => i64::from(h) + 1,
                None => -1,
            },
        };
        *last_uid_next = (*last_uid_next).max(new_uid_next);

        let start_uid = compute_start_uid(old_uid_next, new_uid_next, self.config.display_count());
        if new_uid_next > start_uid {
            debug!(
                "push[{}]: uidNext {new_uid_next} > startUid {start_uid}, syncing before idle",
                self.folder_name
            );
            self.receiver.sync_folder(&self.folder_name);
            return Ok(());
        }

        self.enter_idle(folder, session)
    }

    fn enter_idle(&self, folder: &mut dyn Folder, session: Arc<IdleSession>) -> Result<()> {
        self.receiver.set_push_active(&self.folder_name, true);
        self.idling.store(true, Ordering::SeqCst);
        *self.active_session.lock().expect("poisoned") = Some(session.clone());

        let timeout = Duration::from_secs(u64::from(self.config.idle_refresh_minutes()) * 60)
            + IDLE_READ_TIMEOUT_INCREMENT;
        let setup_result = session.set_read_timeout(timeout);

        let message_count = setup_result.and_then(|_| folder.message_count());
        let display_count = self.config.display_count();
        let qresync = folder.supports_qresync();
        let buffer = UntaggedBuffer::new();

        let idle_result = message_count.and_then(|message_count| {
            folder.execute_idle(&mut |event| {
                self.handle_idle_event(&session, &buffer, message_count, display_count, qresync, event)
            })
        });

        self.idling.store(false, Ordering::SeqCst);
        *self.active_session.lock().expect("poisoned") = None;
        session.stop_accepting_done();

        idle_result
    }

    /// The untagged callback invoked by [`Folder::execute_idle`] for every event. See
    /// `SPEC_FULL.md` §4.4 and §9 (the drain-after-stop open question is preserved deliberately:
    /// buffered flag-change side effects still get flushed even once `stop` has been observed).
    #[allow(clippy::too_many_arguments)]
    fn handle_idle_event(
        &self,
        session: &Arc<IdleSession>,
        buffer: &UntaggedBuffer,
        message_count: u32,
        display_count: u32,
        qresync: bool,
        event: IdleEvent,
    ) -> IdleControl {
        let stop_requested = self.stop.load(Ordering::SeqCst);
        if stop_requested {
            session.stop_idle();
        }

        match classify(&event) {
            Classification::Buffer => {
                if let IdleEvent::Untagged(response) = event {
                    buffer.append(response);
                }
                self.wake_lock.acquire(self.wake_lock_timeout);
            }
            Classification::IdleAccepted => {
                let _ = session.start_accepting_done();
                self.wake_lock.release();
            }
            Classification::Ignore => {}
        }

        if stop_requested {
            // Still drain below to flush any flag-change side effects, then stop unconditionally.
        } else if session.more_responses_available() {
            return IdleControl::Continue;
        }

        for response in buffer.drain() {
            if let UnsolicitedResponse::Vanished { earlier, uids } = &response {
                debug!(
                    "push[{}]: VANISHED uids={uids:?} earlier={earlier}",
                    self.folder_name
                );
            }
            match decide_sync(&response, message_count, display_count, qresync) {
                SyncDecision::TriggerSync => {
                    self.receiver.sync_folder(&self.folder_name);
                    return IdleControl::Stop;
                }
                SyncDecision::FlagUpdate { change, modseq } => {
                    self.receiver.message_flags_changed(&self.folder_name, change);
                    if let Some(modseq) = modseq {
                        self.receiver
                            .highest_mod_seq_changed(&self.folder_name, modseq);
                    }
                }
                SyncDecision::NoAction => {}
            }
        }

        if stop_requested {
            IdleControl::Stop
        } else {
            IdleControl::Continue
        }
    }
}
