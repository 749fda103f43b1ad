//! Scope timestamp resolution and clocks.
//!
//! Each scope owns one integer-millisecond counter. Backends hold the
//! counter under a per-scope lock and call [`next_timestamp`] inside that
//! critical section, so reading, advancing and committing happen as one unit.

use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

/// Source of wall-clock milliseconds.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        let nanos = OffsetDateTime::now_utc().unix_timestamp_nanos();
        i64::try_from(nanos / 1_000_000).unwrap_or(i64::MAX)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Resolves the timestamp of the next write to a scope.
///
/// * `current`: the scope timestamp, `None` when the scope has no state yet.
/// * `requested`: a caller-supplied `last_modified`, if any.
///
/// A requested value strictly above the current one (or any value for a
/// scope without state) is taken verbatim. Otherwise the result is
/// `max(now, current + 1)`.
pub fn next_timestamp(current: Option<i64>, requested: Option<i64>, now: i64) -> i64 {
    match (current, requested) {
        (None, Some(requested)) => requested,
        (Some(current), Some(requested)) if requested > current => requested,
        (Some(current), _) => now.max(current.saturating_add(1)),
        (None, None) => now,
    }
}

/// Baseline for a scope read before it has any timestamp state.
///
/// Never below the newest object already present, so the first write
/// after it still moves strictly forward.
pub fn baseline_timestamp(now: i64, newest: Option<i64>) -> i64 {
    newest.map_or(now, |newest| now.max(newest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_timestamp_is_after_current() {
        assert_eq!(next_timestamp(Some(100), None, 50), 101);
        assert_eq!(next_timestamp(Some(100), None, 500), 500);
        assert_eq!(next_timestamp(None, None, 42), 42);
    }

    #[test]
    fn test_requested_timestamp_in_future_is_kept() {
        assert_eq!(next_timestamp(Some(100), Some(1_000), 50), 1_000);
    }

    #[test]
    fn test_requested_timestamp_not_after_current_is_ignored() {
        assert_eq!(next_timestamp(Some(100), Some(100), 50), 101);
        assert_eq!(next_timestamp(Some(100), Some(10), 50), 101);
        assert_eq!(next_timestamp(Some(100), Some(99), 300), 300);
    }

    #[test]
    fn test_empty_scope_accepts_any_requested_timestamp() {
        assert_eq!(next_timestamp(None, Some(7), 1_000), 7);
    }

    #[test]
    fn test_baseline() {
        assert_eq!(baseline_timestamp(10, None), 10);
        assert_eq!(baseline_timestamp(10, Some(50)), 50);
        assert_eq!(baseline_timestamp(100, Some(50)), 100);
    }

    #[test]
    fn test_clocks() {
        let clock = ManualClock::new(1_000);
        clock.advance(5);
        assert_eq!(clock.now_millis(), 1_005);
        clock.set(3);
        assert_eq!(clock.now_millis(), 3);

        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now_millis() > 1_577_836_800_000);
    }
}
