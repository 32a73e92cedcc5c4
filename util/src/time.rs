//! General time utility functions

use chrono;
use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Build a `Duration` from a number of seconds, treating negative or
/// non-finite values as zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    }
    else {
        Duration::from_secs(0)
    }
}

/// Fixed rate limiter for control loops.
///
/// Each call to `wait` sleeps until one period has passed since the previous
/// call returned. If the loop body overran the period no sleep occurs.
#[derive(Debug)]
pub struct Rate {
    period: Duration,
    last: Instant
}

impl Rate {
    /// Create a new rate limiter running at `hz` cycles per second.
    pub fn new(hz: f64) -> Self {
        let period = if hz > 0.0 {
            secs_to_duration(1.0 / hz)
        }
        else {
            Duration::from_secs(0)
        };

        Self {
            period,
            last: Instant::now()
        }
    }

    /// The period of one cycle
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Block until the end of the current cycle.
    pub fn wait(&mut self) {
        let elapsed = self.last.elapsed();
        if elapsed < self.period {
            std::thread::sleep(self.period - elapsed);
        }
        self.last = Instant::now();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(-1.0), Duration::from_secs(0));
        assert_eq!(secs_to_duration(std::f64::NAN), Duration::from_secs(0));
        assert_eq!(secs_to_duration(0.5), Duration::from_millis(500));
    }

    #[test]
    fn test_rate() {
        let mut rate = Rate::new(100.0);
        assert!(rate.period() > Duration::from_millis(9));

        let start = Instant::now();
        rate.wait();
        rate.wait();
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
