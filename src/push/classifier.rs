//! Pure functions mapping untagged responses to worker actions. See `SPEC_FULL.md` §4.3.

use imap::types::{AttributeValue, UnsolicitedResponse};

use crate::push::traits::{FlagChange, IdleEvent};

/// What the loop should do with a single event observed while idling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not interesting; neither buffered nor acted on.
    Ignore,
    /// Buffer for later interpretation by [`decide_sync`].
    Buffer,
    /// The server has accepted our `IDLE` and is now parked waiting to push updates.
    IdleAccepted,
}

/// Classify a single event delivered to the IDLE callback.
pub fn classify(event: &IdleEvent) -> Classification {
    match event {
        IdleEvent::ContinuationReceived => Classification::IdleAccepted,
        IdleEvent::Untagged(response) => match response {
            UnsolicitedResponse::Exists(_)
            | UnsolicitedResponse::Expunge(_)
            | UnsolicitedResponse::Fetch { .. }
            | UnsolicitedResponse::Vanished { .. } => Classification::Buffer,
            _ => Classification::Ignore,
        },
    }
}

/// The smallest message sequence number the host still cares about, given how many of the most
/// recent messages it keeps visible.
pub fn smallest_seq_num(message_count: u32, display_count: u32) -> u32 {
    message_count.saturating_sub(display_count).saturating_add(1).max(1)
}

/// The outcome of interpreting one buffered response during a drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDecision {
    /// Nothing actionable.
    NoAction,
    /// A QRESYNC `FETCH` updated a message's flags; no full sync is needed.
    FlagUpdate {
        change: FlagChange,
        modseq: Option<u64>,
    },
    /// A full re-sync of the folder should be requested.
    TriggerSync,
}

/// Interpret one buffered response. `message_count` and `display_count` determine the
/// "interesting" window for sequence-number-addressed responses; `qresync` is whether the
/// connection this response arrived on supports QRESYNC.
pub fn decide_sync(
    response: &UnsolicitedResponse,
    message_count: u32,
    display_count: u32,
    qresync: bool,
) -> SyncDecision {
    let smallest = smallest_seq_num(message_count, display_count);
    match response {
        UnsolicitedResponse::Exists(_) => SyncDecision::TriggerSync,
        UnsolicitedResponse::Vanished { .. } => SyncDecision::TriggerSync,
        UnsolicitedResponse::Expunge(seq) => {
            if *seq >= smallest {
                SyncDecision::TriggerSync
            } else {
                SyncDecision::NoAction
            }
        }
        UnsolicitedResponse::Fetch { id, attributes } => {
            if *id < smallest {
                return SyncDecision::NoAction;
            }
            if !qresync {
                return SyncDecision::TriggerSync;
            }
            fetch_flag_update(attributes).unwrap_or(SyncDecision::TriggerSync)
        }
        _ => SyncDecision::NoAction,
    }
}

/// Pull a UID, flag set, and MODSEQ out of a `FETCH` attribute list, if all three are present.
/// Falls back to requesting a full sync (by returning `None`) when the server didn't include a
/// UID, since without it we can't address the message for a flag-only update.
fn fetch_flag_update(attributes: &[AttributeValue<'_>]) -> Option<SyncDecision> {
    let mut uid = None;
    let mut flags: Option<Vec<String>> = None;
    let mut modseq = None;

    for attr in attributes {
        match attr {
            AttributeValue::Uid(value) => uid = Some(*value),
            AttributeValue::Flags(value) => {
                flags = Some(value.iter().map(|f| f.to_string()).collect())
            }
            AttributeValue::ModSeq(value) => modseq = Some(*value),
            _ => {}
        }
    }

    let uid = uid?;
    let flags = flags.unwrap_or_default();
    Some(SyncDecision::FlagUpdate {
        change: FlagChange {
            uid: uid.to_string(),
            flags,
        },
        modseq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_is_idle_accepted() {
        assert_eq!(
            classify(&IdleEvent::ContinuationReceived),
            Classification::IdleAccepted
        );
    }

    #[test]
    fn exists_and_expunge_and_fetch_and_vanished_are_buffered() {
        for resp in [
            UnsolicitedResponse::Exists(1),
            UnsolicitedResponse::Expunge(1),
            UnsolicitedResponse::Fetch {
                id: 1,
                attributes: vec![],
            },
            UnsolicitedResponse::Vanished {
                earlier: false,
                uids: vec![1..=1],
            },
        ] {
            assert_eq!(
                classify(&IdleEvent::Untagged(resp)),
                Classification::Buffer
            );
        }
    }

    #[test]
    fn recent_is_ignored() {
        assert_eq!(
            classify(&IdleEvent::Untagged(UnsolicitedResponse::Recent(3))),
            Classification::Ignore
        );
    }

    #[test]
    fn expunge_in_window_triggers_sync() {
        // messageCount=100, displayCount=75 => smallestSeqNum=26
        let decision = decide_sync(&UnsolicitedResponse::Expunge(27), 100, 75, false);
        assert_eq!(decision, SyncDecision::TriggerSync);
    }

    #[test]
    fn expunge_out_of_window_is_dropped() {
        let decision = decide_sync(&UnsolicitedResponse::Expunge(25), 100, 75, false);
        assert_eq!(decision, SyncDecision::NoAction);
    }

    #[test]
    fn qresync_fetch_updates_flags_without_sync() {
        let fetch = UnsolicitedResponse::Fetch {
            id: 27,
            attributes: vec![
                AttributeValue::Uid(99),
                AttributeValue::Flags(vec![std::borrow::Cow::Borrowed("\\Seen")]),
                AttributeValue::ModSeq(190),
            ],
        };
        let decision = decide_sync(&fetch, 100, 75, true);
        assert_eq!(
            decision,
            SyncDecision::FlagUpdate {
                change: FlagChange {
                    uid: "99".to_string(),
                    flags: vec!["\\Seen".to_string()],
                },
                modseq: Some(190),
            }
        );
    }

    #[test]
    fn non_qresync_fetch_triggers_full_sync() {
        let fetch = UnsolicitedResponse::Fetch {
            id: 27,
            attributes: vec![AttributeValue::Uid(99)],
        };
        assert_eq!(
            decide_sync(&fetch, 100, 75, false),
            SyncDecision::TriggerSync
        );
    }

    #[test]
    fn exists_always_triggers_sync() {
        assert_eq!(
            decide_sync(&UnsolicitedResponse::Exists(101), 100, 75, true),
            SyncDecision::TriggerSync
        );
    }

    #[test]
    fn vanished_always_triggers_sync() {
        let vanished = UnsolicitedResponse::Vanished {
            earlier: false,
            uids: vec![10..=12],
        };
        assert_eq!(decide_sync(&vanished, 100, 75, true), SyncDecision::TriggerSync);
    }
}
