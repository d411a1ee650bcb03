//! Wall clock used to stamp envelopes and records.
//!
//! Everything below the [`Session`](crate::Session) takes time as an explicit
//! argument; the clock only exists at the edge so tests can pin it.

use crate::Timestamp;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::sync::Mutex;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// The operating system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Create a clock frozen at a millisecond timestamp.
    pub fn at_millis(millis: Timestamp) -> Self {
        let start = DateTime::from_timestamp_millis(millis as i64).unwrap_or_default();
        Self::new(start)
    }

    /// Move the clock forward.
    pub fn advance_millis(&self, millis: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += Duration::milliseconds(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g.
/// `2026-01-10T12:00:00.000Z`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Milliseconds since the Unix epoch, clamped at zero.
pub fn to_millis(at: DateTime<Utc>) -> Timestamp {
    at.timestamp_millis().max(0) as Timestamp
}
