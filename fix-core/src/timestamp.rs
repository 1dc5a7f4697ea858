use std::fmt;

use chrono::{DateTime, Utc};

/// `SendingTime<52>` / `OrigSendingTime<122>` value.
///
/// A plain `chrono::DateTime<Utc>` wrapper: nothing here is shared across
/// threads without a lock, so no pointer indirection is needed to update it
/// atomically.
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct UtcTimestamp(DateTime<Utc>);

impl UtcTimestamp {
    pub const MIN_UTC: UtcTimestamp = UtcTimestamp(DateTime::<Utc>::MIN_UTC);

    pub fn now() -> UtcTimestamp {
        UtcTimestamp(Utc::now())
    }

    /// `now()` truncated to whole seconds, matching the default FIX
    /// `SendingTime` precision (no milliseconds).
    pub fn now_with_secs() -> UtcTimestamp {
        let now = Utc::now();
        let truncated = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        UtcTimestamp(truncated)
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> UtcTimestamp {
        UtcTimestamp(dt)
    }
}

impl fmt::Display for UtcTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y%m%d-%H:%M:%S%.3f"))
    }
}

impl std::ops::Sub for UtcTimestamp {
    type Output = chrono::Duration;

    fn sub(self, rhs: UtcTimestamp) -> chrono::Duration {
        self.0 - rhs.0
    }
}
