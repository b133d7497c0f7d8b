//! General time utility functions
//!
//! Also provides [`Rate`], the monotonic pacing primitive used by cyclic
//! background loops.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Paces a loop at a fixed period.
///
/// Each call to `delay_until` sleeps until one period after the previous
/// wake time rather than for one period from now, so time spent doing work
/// inside the loop doesn't accumulate as drift. If the loop falls more than a
/// whole period behind the wake time is resynchronised to now instead of
/// trying to catch up with a burst of zero length delays.
#[derive(Debug, Default)]
pub struct Rate {
    last_wake: Option<Instant>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Rate {
    pub fn new() -> Self {
        Self { last_wake: None }
    }

    /// Sleep until `period` after the last wake time.
    ///
    /// The first call measures from the moment it is made.
    pub fn delay_until(&mut self, period: Duration) {
        let now = Instant::now();
        let last = self.last_wake.unwrap_or(now);
        let target = last + period;

        if target > now {
            thread::sleep(target - now);
            self.last_wake = Some(target);
        } else if now - target > period {
            self.last_wake = Some(now);
        } else {
            self.last_wake = Some(target);
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Convert a period in seconds into a `std` duration.
///
/// Negative or non-finite periods become a zero duration.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::from_secs(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        let d = chrono::Duration::milliseconds(1500);
        assert_eq!(duration_to_seconds(d), Some(1.5));
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(0.01), Duration::from_millis(10));
        assert_eq!(secs_to_duration(-1.0), Duration::from_secs(0));
        assert_eq!(secs_to_duration(f64::NAN), Duration::from_secs(0));
    }

    #[test]
    fn test_rate_paces_loop() {
        let mut rate = Rate::new();
        let period = Duration::from_millis(10);
        let start = Instant::now();

        for _ in 0..5 {
            rate.delay_until(period);
        }

        // Five periods must have passed, allow generous slack for slow CI
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_rate_does_not_accumulate_work_time() {
        let mut rate = Rate::new();
        let period = Duration::from_millis(20);

        rate.delay_until(period);
        let start = Instant::now();

        // Work for half a period, the next delay should only make up the
        // remainder
        thread::sleep(Duration::from_millis(10));
        rate.delay_until(period);

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(19));
        assert!(elapsed < Duration::from_millis(60));
    }

    #[test]
    fn test_rate_resyncs_after_overrun() {
        let mut rate = Rate::new();
        let period = Duration::from_millis(5);

        rate.delay_until(period);

        // Overrun by several periods
        thread::sleep(Duration::from_millis(30));
        rate.delay_until(period);

        // After the resync the next delay is a full period from now
        let start = Instant::now();
        rate.delay_until(period);
        assert!(start.elapsed() >= Duration::from_millis(4));
    }
}
