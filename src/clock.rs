//! Simulated time.
//!
//! The clock counts integer ticks from an anchor instant; each tick lasts a fixed number of
//! minutes. Every calendar query is a pure function of the tick count, so two clocks with the
//! same anchor, ratio and tick always agree.

use chrono::{Datelike, Duration, NaiveDateTime, Timelike};

const MINUTES_PER_DAY: u64 = 24 * 60;

/// Weekday indices (Monday = 0) treated as the weekend.
pub const WEEKEND_DAYS: [u32; 2] = [0, 6];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clock {
    tick: u64,
    start: NaiveDateTime,
    minutes_per_tick: u32,
}

impl Clock {
    /// Creates a clock at tick 0.
    ///
    /// # Panics
    ///
    /// Panics if `minutes_per_tick` is zero.
    #[must_use]
    pub fn new(start: NaiveDateTime, minutes_per_tick: u32) -> Clock {
        assert!(minutes_per_tick > 0, "a tick must last at least one minute");
        Clock {
            tick: 0,
            start,
            minutes_per_tick,
        }
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    #[must_use]
    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    #[must_use]
    pub fn minutes_per_tick(&self) -> u32 {
        self.minutes_per_tick
    }

    /// Moves the clock forward to `tick`.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is earlier than the current tick.
    pub fn advance_to(&mut self, tick: u64) {
        assert!(
            tick >= self.tick,
            "Invalid time value: tick {tick} is before the current tick {}",
            self.tick
        );
        self.tick = tick;
    }

    /// The calendar instant of the current tick.
    #[must_use]
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp_at(self.tick)
    }

    /// The calendar instant of an arbitrary tick.
    #[must_use]
    pub fn timestamp_at(&self, tick: u64) -> NaiveDateTime {
        let minutes = tick.saturating_mul(u64::from(self.minutes_per_tick));
        self.start + Duration::minutes(i64::try_from(minutes).unwrap_or(i64::MAX / 60_000))
    }

    /// Minute of the hour, 0 to 59.
    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.timestamp().minute()
    }

    /// Hour of the day, 0 to 23.
    #[must_use]
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp().hour()
    }

    /// Day of the week with Monday = 0 and Sunday = 6.
    #[must_use]
    pub fn day_of_week(&self) -> u32 {
        self.timestamp().weekday().num_days_from_monday()
    }

    /// True on the days listed in [`WEEKEND_DAYS`].
    #[must_use]
    pub fn is_weekend(&self) -> bool {
        WEEKEND_DAYS.contains(&self.day_of_week())
    }

    /// The current instant formatted as ISO-8601 (`YYYY-MM-DDTHH:MM:SS`).
    #[must_use]
    pub fn time_of_day(&self) -> String {
        self.timestamp().format("%Y-%m-%dT%H:%M:%S").to_string()
    }

    /// Number of whole ticks spanning `days` days (rounded up).
    #[must_use]
    pub fn ticks_for_days(&self, days: u32) -> u64 {
        (u64::from(days) * MINUTES_PER_DAY).div_ceil(u64::from(self.minutes_per_tick))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // 2020-02-28 was a Friday.
    fn friday_midnight() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 2, 28)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn starts_at_anchor() {
        let clock = Clock::new(friday_midnight(), 2);
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.timestamp(), friday_midnight());
        assert_eq!(clock.time_of_day(), "2020-02-28T00:00:00");
    }

    #[test]
    fn calendar_queries_follow_ticks() {
        let mut clock = Clock::new(friday_midnight(), 2);
        // 95 ticks * 2 minutes = 3h10m
        clock.advance_to(95);
        assert_eq!(clock.hour_of_day(), 3);
        assert_eq!(clock.minutes(), 10);
        assert_eq!(clock.day_of_week(), 4);
        assert_eq!(clock.time_of_day(), "2020-02-28T03:10:00");
    }

    #[test]
    fn weekend_is_monday_and_sunday() {
        let mut clock = Clock::new(friday_midnight(), 60);
        let per_day = clock.ticks_for_days(1);
        let mut weekend = vec![];
        for day in 0..7 {
            clock.advance_to(day * per_day);
            weekend.push(clock.is_weekend());
        }
        // Fri, Sat, Sun, Mon, Tue, Wed, Thu
        assert_eq!(weekend, vec![false, false, true, true, false, false, false]);
    }

    #[test]
    fn ticks_for_days_rounds_up() {
        let clock = Clock::new(friday_midnight(), 7);
        assert_eq!(clock.ticks_for_days(1), 206);
        assert_eq!(clock.ticks_for_days(0), 0);
    }

    #[test]
    #[should_panic(expected = "Invalid time value")]
    fn cannot_go_backwards() {
        let mut clock = Clock::new(friday_midnight(), 2);
        clock.advance_to(10);
        clock.advance_to(9);
    }
}
