//! Serialization of the single monotonic mailbox cursor persisted across process restarts.
//! See `SPEC_FULL.md` §4.6.

use thiserror::Error;

/// A persisted push cursor for one folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushState {
    /// The last `UIDNEXT` this pusher observed, or `-1` if unknown.
    pub uid_next: i64,
}

impl PushState {
    /// The value used whenever nothing has been persisted yet, or the persisted value could not
    /// be parsed.
    pub const UNKNOWN: PushState = PushState { uid_next: -1 };

    /// Parse a persisted state line. Never fails: a missing or garbled line is equivalent to
    /// [`PushState::UNKNOWN`].
    pub fn parse(line: &str) -> PushState {
        parse_strict(line).unwrap_or(PushState::UNKNOWN)
    }

    /// Serialize back to the single-line format `uidNext=<N>`.
    pub fn serialize(&self) -> String {
        format!("uidNext={}", self.uid_next)
    }
}

/// Internal, fallible parse used by [`PushState::parse`] and covered directly by unit tests; the
/// public API stays infallible per `SPEC_FULL.md` §4.6.
#[derive(Debug, Error, PartialEq, Eq)]
enum PushStateError {
    #[error("missing 'uidNext=' key")]
    MissingKey,
    #[error("value {0:?} is not a valid integer")]
    NotAnInteger(String),
}

fn parse_strict(line: &str) -> Result<PushState, PushStateError> {
    let (key, value) = line.split_once('=').ok_or(PushStateError::MissingKey)?;
    if key.trim() != "uidNext" {
        return Err(PushStateError::MissingKey);
    }
    let uid_next = value
        .trim()
        .parse::<i64>()
        .map_err(|_| PushStateError::NotAnInteger(value.to_string()))?;
    Ok(PushState { uid_next })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_known_value() {
        let state = PushState { uid_next: 1234 };
        assert_eq!(PushState::parse(&state.serialize()), state);
    }

    #[test]
    fn missing_state_is_unknown() {
        assert_eq!(PushState::parse(""), PushState::UNKNOWN);
    }

    #[test]
    fn garbled_state_is_unknown() {
        assert_eq!(PushState::parse("not even close"), PushState::UNKNOWN);
        assert_eq!(PushState::parse("uidNext=banana"), PushState::UNKNOWN);
        assert_eq!(PushState::parse("otherKey=5"), PushState::UNKNOWN);
    }

    #[test]
    fn internal_parser_reports_typed_errors() {
        assert_eq!(parse_strict(""), Err(PushStateError::MissingKey));
        assert_eq!(
            parse_strict("uidNext=nope"),
            Err(PushStateError::NotAnInteger("nope".to_string()))
        );
        assert_eq!(parse_strict("uidNext=42"), Ok(PushState { uid_next: 42 }));
    }
}
