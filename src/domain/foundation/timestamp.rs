//! Timestamp value object for immutable points in time.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a timestamp for the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a timestamp from epoch seconds.
    ///
    /// Returns `None` for values chrono cannot represent.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    /// Epoch seconds, the representation used on the wire.
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unix_seconds_roundtrip() {
        let ts = Timestamp::from_unix_seconds(1_700_000_000).unwrap();
        assert_eq!(ts.unix_seconds(), 1_700_000_000);
    }

    #[test]
    fn now_is_after_epoch() {
        assert!(Timestamp::now().unix_seconds() > 0);
    }
}
