//! Day arithmetic and the time source used by the engine.
//!
//! An operation's day advances at its reset hour (UTC), counted from the last
//! reset boundary on or before the moment it started. Day numbers are always
//! derived from the clock; nothing about the current day is stored.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// The reset boundary at `reset_hour` on the calendar day of `at`.
fn boundary_on_day(at: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(reset_hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&at.date_naive().and_time(time))
}

/// The latest reset boundary at or before `at`.
pub fn last_reset_boundary(at: DateTime<Utc>, reset_hour: u32) -> DateTime<Utc> {
    let boundary = boundary_on_day(at, reset_hour);
    if boundary > at {
        boundary - Duration::days(1)
    } else {
        boundary
    }
}

/// 1-based day number of an operation at `now`.
///
/// Never below 1, even when `now` is earlier than `started_at`.
pub fn current_day(started_at: DateTime<Utc>, reset_hour: u32, now: DateTime<Utc>) -> u32 {
    let anchor = last_reset_boundary(started_at, reset_hour);
    let elapsed = (now - anchor).num_seconds();
    let day = elapsed.div_euclid(SECONDS_PER_DAY) + 1;
    day.clamp(1, u32::MAX as i64) as u32
}

/// Time left until the next reset boundary after `now`.
pub fn time_until_reset(reset_hour: u32, now: DateTime<Utc>) -> Duration {
    let mut next = boundary_on_day(now, reset_hour);
    if next <= now {
        next += Duration::days(1);
    }
    next - now
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = now;
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.lock() {
            *guard += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_day_one_until_first_reset() {
        // Started at 10:30 with a 06:00 reset: anchor is 06:00 the same day.
        let started = at(2025, 3, 10, 10, 30);
        assert_eq!(current_day(started, 6, started), 1);
        assert_eq!(current_day(started, 6, at(2025, 3, 11, 5, 59)), 1);
        assert_eq!(current_day(started, 6, at(2025, 3, 11, 6, 0)), 2);
        assert_eq!(current_day(started, 6, at(2025, 3, 17, 6, 0)), 8);
    }

    #[test]
    fn test_start_before_reset_hour_anchors_previous_day() {
        // Started at 02:00 with a 06:00 reset: anchor is 06:00 the day before,
        // so day 2 begins four hours after the start.
        let started = at(2025, 3, 10, 2, 0);
        assert_eq!(last_reset_boundary(started, 6), at(2025, 3, 9, 6, 0));
        assert_eq!(current_day(started, 6, at(2025, 3, 10, 5, 59)), 1);
        assert_eq!(current_day(started, 6, at(2025, 3, 10, 6, 0)), 2);
    }

    #[test]
    fn test_start_exactly_on_boundary() {
        let started = at(2025, 3, 10, 6, 0);
        assert_eq!(last_reset_boundary(started, 6), started);
        assert_eq!(current_day(started, 6, at(2025, 3, 11, 5, 59)), 1);
        assert_eq!(current_day(started, 6, at(2025, 3, 11, 6, 0)), 2);
    }

    #[test]
    fn test_never_below_one() {
        let started = at(2025, 3, 10, 12, 0);
        assert_eq!(current_day(started, 0, at(2025, 3, 1, 0, 0)), 1);
    }

    #[test]
    fn test_day_is_monotonic_and_steps_at_boundaries() {
        let started = at(2025, 1, 30, 17, 45);
        for reset_hour in [0, 5, 17, 18, 23] {
            let mut previous = current_day(started, reset_hour, started);
            let mut now = started;
            for _ in 0..(24 * 4 * 20) {
                now += Duration::minutes(15);
                let day = current_day(started, reset_hour, now);
                let crossed = now == boundary_on_day(now, reset_hour);
                if crossed {
                    assert_eq!(day, previous + 1, "hour {} at {}", reset_hour, now);
                } else {
                    assert_eq!(day, previous, "hour {} at {}", reset_hour, now);
                }
                previous = day;
            }
        }
    }

    #[test]
    fn test_time_until_reset() {
        let now = at(2025, 3, 10, 22, 15);
        assert_eq!(time_until_reset(23, now), Duration::minutes(45));
        assert_eq!(time_until_reset(22, now), Duration::hours(24) - Duration::minutes(15));
        assert_eq!(time_until_reset(22, at(2025, 3, 10, 22, 0)), Duration::hours(24));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(at(2025, 3, 10, 0, 0));
        let shared = clock.clone();
        clock.advance(Duration::hours(3));
        assert_eq!(shared.now(), at(2025, 3, 10, 3, 0));
        shared.set(at(2030, 1, 1, 0, 0));
        assert_eq!(clock.now(), at(2030, 1, 1, 0, 0));
    }
}
