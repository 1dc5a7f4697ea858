//! Stable routing key for a session: `(BeginString, SenderCompID, TargetCompID)`.
//!
//! Canonical string grammar is `BeginString:SenderCompID->TargetCompID`,
//! parseable back into its parts without ambiguity.

use core::fmt;
use std::str::FromStr;

use fix_core::FixString;
#[cfg(any(feature = "serde-serialize", feature = "serde-deserialize"))]
use serde::{Deserialize, Serialize};

/// Stable triple identifying one end of a FIX session.
///
/// Equality is structural; the type is immutable once constructed so it can
/// be used as a `HashMap` key and freely cloned across tasks.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize))]
#[cfg_attr(feature = "serde-deserialize", derive(Deserialize))]
pub struct SessionId {
    begin_string: FixString,
    sender_comp_id: FixString,
    target_comp_id: FixString,
}

/// Error returned by [`SessionId::from_str`] when the input does not match
/// the `BeginString:SenderCompID->TargetCompID` grammar.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid session id: {0:?}")]
pub struct ParseSessionIdError(String);

impl SessionId {
    pub fn new(
        begin_string: impl Into<FixString>,
        sender_comp_id: impl Into<FixString>,
        target_comp_id: impl Into<FixString>,
    ) -> SessionId {
        SessionId {
            begin_string: begin_string.into(),
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
        }
    }

    pub fn begin_string(&self) -> &str {
        self.begin_string.as_utf8()
    }

    pub fn sender_comp_id(&self) -> &str {
        self.sender_comp_id.as_utf8()
    }

    pub fn target_comp_id(&self) -> &str {
        self.target_comp_id.as_utf8()
    }

    /// The session id as seen from the other side of the wire: sender and
    /// target swapped. `reversed().reversed() == self`.
    pub fn reversed(&self) -> SessionId {
        SessionId {
            begin_string: self.begin_string.clone(),
            sender_comp_id: self.target_comp_id.clone(),
            target_comp_id: self.sender_comp_id.clone(),
        }
    }

    /// Canonical id, e.g. `FIX.4.4:CLIENT->BROKER`.
    pub fn id(&self) -> String {
        self.to_string()
    }

    /// Canonical id of the reversed session, e.g. `FIX.4.4:BROKER->CLIENT`.
    pub fn rid(&self) -> String {
        self.reversed().to_string()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}->{}",
            self.begin_string, self.sender_comp_id, self.target_comp_id
        )
    }
}

impl FromStr for SessionId {
    type Err = ParseSessionIdError;

    fn from_str(s: &str) -> Result<SessionId, ParseSessionIdError> {
        let (begin_string, rest) = s
            .split_once(':')
            .ok_or_else(|| ParseSessionIdError(s.to_owned()))?;
        let (sender_comp_id, target_comp_id) = rest
            .split_once("->")
            .ok_or_else(|| ParseSessionIdError(s.to_owned()))?;
        if begin_string.is_empty() || sender_comp_id.is_empty() || target_comp_id.is_empty() {
            return Err(ParseSessionIdError(s.to_owned()));
        }
        Ok(SessionId::new(begin_string, sender_comp_id, target_comp_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid() -> SessionId {
        SessionId::new("FIX.4.4", "CLIENT", "BROKER")
    }

    #[test]
    fn round_trip_through_canonical_string() {
        let id = sid();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn double_reversal_is_identity() {
        let id = sid();
        assert_eq!(id.reversed().reversed(), id);
    }

    #[test]
    fn reversed_swaps_sender_and_target() {
        let id = sid();
        let rev = id.reversed();
        assert_eq!(rev.sender_comp_id(), "BROKER");
        assert_eq!(rev.target_comp_id(), "CLIENT");
        assert_eq!(rev.begin_string(), "FIX.4.4");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("garbage".parse::<SessionId>().is_err());
        assert!("FIX.4.4:CLIENT-BROKER".parse::<SessionId>().is_err());
        assert!(":CLIENT->BROKER".parse::<SessionId>().is_err());
    }
}
