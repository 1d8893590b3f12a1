//! Calendar-aware period boundary calculation.
//!
//! A period ("bucket") boundary depends on more than the timeframe length:
//! the trading day may start at an offset from midnight and the trading week
//! at an offset from Sunday, both configured per server. All arithmetic runs
//! on whole Unix seconds derived from timestamps rounded to the nearest
//! millisecond (ties round up), so repeated boundary calls cannot drift on
//! sub-millisecond timestamp noise.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::{Timeframe, TimeframeUnit};

const SECONDS_IN_DAY: i64 = 86_400;
const SECONDS_IN_HOUR: i64 = 3_600;

/// Computes period start instants for timestamps under configured
/// trading-day and trading-week offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundaryCalculator {
    day_offset_hours: i32,
    week_offset_days: i32,
}

impl BoundaryCalculator {
    /// Creates a calculator.
    ///
    /// `day_offset_hours` shifts the start of the trading day relative to
    /// midnight; `week_offset_days` shifts the start of the trading week
    /// relative to Sunday. Both may be negative.
    #[must_use]
    pub const fn new(day_offset_hours: i32, week_offset_days: i32) -> Self {
        Self {
            day_offset_hours,
            week_offset_days,
        }
    }

    /// Returns the trading-day offset in hours.
    #[must_use]
    pub const fn day_offset_hours(&self) -> i32 {
        self.day_offset_hours
    }

    /// Returns the trading-week offset in days.
    #[must_use]
    pub const fn week_offset_days(&self) -> i32 {
        self.week_offset_days
    }

    /// Returns the start instant of the bucket containing `t`.
    ///
    /// Idempotent: applying `period_start` to its own result returns the
    /// same instant.
    #[must_use]
    pub fn period_start(&self, timeframe: Timeframe, t: DateTime<Utc>) -> DateTime<Utc> {
        let length = i64::from(timeframe.length());
        match timeframe.unit() {
            TimeframeUnit::Minute if timeframe.length() == 1 => minute_start(t),
            TimeframeUnit::Minute => self.interval_start(t, length * 60),
            TimeframeUnit::Hour => self.interval_start(t, length * SECONDS_IN_HOUR),
            TimeframeUnit::Day if timeframe.length() == 1 => {
                from_seconds(self.trading_day(to_seconds(t)))
            }
            TimeframeUnit::Day => self.day_interval_start(t, length * SECONDS_IN_DAY),
            TimeframeUnit::Week => self.week_start(t),
            TimeframeUnit::Month => self.month_start(t, timeframe.length()),
            TimeframeUnit::Year => self.year_start(t),
        }
    }

    /// Serial second of the start of the trading day containing `secs`.
    fn trading_day(&self, secs: i64) -> i64 {
        let offset = i64::from(self.day_offset_hours) * SECONDS_IN_HOUR;
        let shifted = secs - offset;
        shifted - shifted.rem_euclid(SECONDS_IN_DAY) + offset
    }

    /// Fixed-length buckets anchored at the trading-day start.
    fn interval_start(&self, t: DateTime<Utc>, length_seconds: i64) -> DateTime<Utc> {
        let start = to_seconds(t);
        let mut day = self.trading_day(start);
        if day > start {
            day -= SECONDS_IN_DAY;
        }
        let n = (start - day).div_euclid(length_seconds);
        from_seconds(day + n * length_seconds)
    }

    /// Multi-day buckets anchored at the offset-adjusted first of the month.
    fn day_interval_start(&self, t: DateTime<Utc>, length_seconds: i64) -> DateTime<Utc> {
        let offset = i64::from(self.day_offset_hours) * SECONDS_IN_HOUR;
        let shifted = from_seconds(to_seconds(t) - offset);
        let month_first = Utc
            .with_ymd_and_hms(shifted.year(), shifted.month(), 1, 0, 0, 0)
            .unwrap();
        let start = month_first.timestamp() + offset;
        let n = (to_seconds(t) - start).div_euclid(length_seconds);
        from_seconds(start + n * length_seconds)
    }

    /// Buckets of N months counted from month 1, at the offset-adjusted
    /// first day.
    fn month_start(&self, t: DateTime<Utc>, length: u32) -> DateTime<Utc> {
        let offset = i64::from(self.day_offset_hours) * SECONDS_IN_HOUR;
        let shifted = from_seconds(to_seconds(t) - offset);
        let month = (shifted.month() - 1) / length * length + 1;
        let start = Utc.with_ymd_and_hms(shifted.year(), month, 1, 0, 0, 0).unwrap();
        from_seconds(start.timestamp() + offset)
    }

    /// January 1st of the timestamp's year, offset-adjusted.
    fn year_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let offset = i64::from(self.day_offset_hours) * SECONDS_IN_HOUR;
        let shifted = from_seconds(to_seconds(t) - offset);
        let start = Utc.with_ymd_and_hms(shifted.year(), 1, 1, 0, 0, 0).unwrap();
        from_seconds(start.timestamp() + offset)
    }

    /// Weeks beginning on the configured day-of-week, shifted by the day and
    /// week offsets.
    fn week_start(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let day_offset = i64::from(self.day_offset_hours) * SECONDS_IN_HOUR;
        let week_offset = i64::from(self.week_offset_days);

        let mut s = to_seconds(t);
        s -= day_offset;
        s -= s.rem_euclid(SECONDS_IN_DAY);
        s -= (week_offset + 1) * SECONDS_IN_DAY;
        let sunday_relative = i64::from(from_seconds(s).weekday().num_days_from_sunday());
        s -= sunday_relative * SECONDS_IN_DAY;
        s += day_offset;
        s += (week_offset + 1) * SECONDS_IN_DAY;
        from_seconds(s)
    }
}

/// Start of the calendar minute containing `t`, after millisecond rounding.
///
/// This is the 1-minute boundary rule also used to derive a tick's minute
/// for volume reconciliation.
#[must_use]
pub fn minute_start(t: DateTime<Utc>) -> DateTime<Utc> {
    let s = to_seconds(t);
    from_seconds(s - s.rem_euclid(60))
}

/// Default trading-day offset (hours) for a server time zone name.
#[must_use]
pub fn day_offset_for_zone(zone: &str) -> i32 {
    if zone.eq_ignore_ascii_case("UTC") { -2 } else { -7 }
}

/// Whole seconds of `t`, rounded to the nearest millisecond first
/// (ties round up), then floored to the second.
fn to_seconds(t: DateTime<Utc>) -> i64 {
    let micros = t.timestamp_micros();
    let mut millis = micros.div_euclid(1_000);
    if micros.rem_euclid(1_000) >= 500 {
        millis += 1;
    }
    millis.div_euclid(1_000)
}

fn from_seconds(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).unwrap()
}
