//! Tick data representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::boundary::minute_start;

/// A single price update for one instrument.
///
/// `minute_volume` is the *cumulative* tick volume of the tick's calendar
/// minute as accounted upstream, not a per-tick delta. The aggregation
/// engine turns consecutive cumulative figures into volume deltas; see
/// `CandleSeries` in `candela-aggregate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Name of the instrument (e.g. "EUR/USD").
    pub instrument: String,
    /// Timestamp of the tick (UTC, server time zone).
    pub timestamp: DateTime<Utc>,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
    /// Cumulative tick volume of the tick's minute.
    pub minute_volume: f64,
}

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        bid: f64,
        ask: f64,
        minute_volume: f64,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            bid,
            ask,
            minute_volume,
        }
    }

    /// Start of the calendar minute this tick belongs to, computed with the
    /// 1-minute boundary rule.
    #[must_use]
    pub fn minute(&self) -> DateTime<Utc> {
        minute_start(self.timestamp)
    }

    /// Returns the mid price (average of ask and bid).
    #[must_use]
    pub fn mid(&self) -> f64 {
        (self.ask + self.bid) / 2.0
    }

    /// Returns the spread (ask - bid).
    #[must_use]
    pub fn spread(&self) -> f64 {
        self.ask - self.bid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_tick_minute() {
        let t = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 42).unwrap()
            + TimeDelta::milliseconds(371);
        let tick = Tick::new("EUR/USD", t, 1.1000, 1.1001, 5.0);
        assert_eq!(
            tick.minute(),
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_mid_and_spread() {
        let tick = Tick::new("EUR/USD", Utc::now(), 1.1000, 1.1001, 5.0);
        assert!((tick.mid() - 1.10005).abs() < 1e-10);
        assert!((tick.spread() - 0.0001).abs() < 1e-10);
    }
}
