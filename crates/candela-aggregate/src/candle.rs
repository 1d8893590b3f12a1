//! Candle (OHLC bar) data structures.

use candela_types::TimeframeUnit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One price side (bid or ask) of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

impl Ohlc {
    /// Creates a side from explicit prices.
    #[must_use]
    pub const fn new(open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            open,
            high,
            low,
            close,
        }
    }

    /// Seeds all four prices from the first observed price.
    #[must_use]
    pub const fn seed(price: f64) -> Self {
        Self::new(price, price, price, price)
    }

    /// Opens a side at the previous candle's close, already extended by the
    /// first tick price of the new period.
    #[must_use]
    pub fn carry(previous_close: f64, price: f64) -> Self {
        Self::new(
            previous_close,
            previous_close.max(price),
            previous_close.min(price),
            price,
        )
    }

    /// Returns the price range (high - low).
    #[must_use]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    fn update(&mut self, price: f64) {
        self.close = price;
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
    }
}

/// OHLC aggregate for one time bucket, with separate bid and ask sides and
/// an additive tick volume.
///
/// Volume is never overwritten after construction; the owning series only
/// adds reconciled deltas, so the candle's volume always equals the sum of
/// all deltas ever applied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    period_start: DateTime<Utc>,
    unit: TimeframeUnit,
    bid: Ohlc,
    ask: Ohlc,
    volume: f64,
    completed: bool,
    precision: u8,
}

impl Candle {
    /// Creates a candle from explicit fields, as delivered by a historical
    /// bar row.
    #[must_use]
    pub const fn new(
        period_start: DateTime<Utc>,
        bid: Ohlc,
        ask: Ohlc,
        volume: f64,
        completed: bool,
        unit: TimeframeUnit,
        precision: u8,
    ) -> Self {
        Self {
            period_start,
            unit,
            bid,
            ask,
            volume,
            completed,
            precision,
        }
    }

    /// Opens a candle from the first tick of its period.
    #[must_use]
    pub const fn open_at(
        period_start: DateTime<Utc>,
        bid: f64,
        ask: f64,
        volume: f64,
        unit: TimeframeUnit,
        precision: u8,
    ) -> Self {
        Self::new(
            period_start,
            Ohlc::seed(bid),
            Ohlc::seed(ask),
            volume,
            false,
            unit,
            precision,
        )
    }

    /// Date and time when the candle period begins (server time zone).
    #[must_use]
    pub const fn period_start(&self) -> DateTime<Utc> {
        self.period_start
    }

    /// Time unit of the owning timeframe, carried for output formatting.
    #[must_use]
    pub const fn unit(&self) -> TimeframeUnit {
        self.unit
    }

    /// Bid side of the candle.
    #[must_use]
    pub const fn bid(&self) -> Ohlc {
        self.bid
    }

    /// Ask side of the candle.
    #[must_use]
    pub const fn ask(&self) -> Ohlc {
        self.ask
    }

    /// Accumulated tick volume.
    #[must_use]
    pub const fn volume(&self) -> f64 {
        self.volume
    }

    /// True once the candle's period has been closed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        self.completed
    }

    /// Decimal precision (digits) of the instrument's quotes, fixed at
    /// creation.
    #[must_use]
    pub const fn precision(&self) -> u8 {
        self.precision
    }

    /// An identical candle with the completed flag cleared, used when the
    /// newest historical candle must keep accepting live ticks.
    #[must_use]
    pub fn reopened(&self) -> Self {
        Self {
            completed: false,
            ..self.clone()
        }
    }

    pub(crate) fn update(&mut self, bid: f64, ask: f64, volume_delta: f64) {
        self.bid.update(bid);
        self.ask.update(ask);
        self.volume += volume_delta;
    }

    pub(crate) const fn close(&mut self) {
        self.completed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn period() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_open_at_seeds_both_sides() {
        let candle = Candle::open_at(period(), 1.1000, 1.1001, 5.0, TimeframeUnit::Minute, 5);
        assert_eq!(candle.bid(), Ohlc::seed(1.1000));
        assert_eq!(candle.ask(), Ohlc::seed(1.1001));
        assert_relative_eq!(candle.volume(), 5.0);
        assert!(!candle.is_completed());
        assert_eq!(candle.precision(), 5);
    }

    #[test]
    fn test_update_extends_extremes() {
        let mut candle = Candle::open_at(period(), 1.1000, 1.1001, 5.0, TimeframeUnit::Minute, 5);
        candle.update(1.1010, 1.1011, 3.0);
        candle.update(1.0990, 1.0991, 0.0);

        assert_eq!(candle.bid().open, 1.1000);
        assert_eq!(candle.bid().high, 1.1010);
        assert_eq!(candle.bid().low, 1.0990);
        assert_eq!(candle.bid().close, 1.0990);
        assert_eq!(candle.ask().high, 1.1011);
        assert_relative_eq!(candle.volume(), 8.0);
    }

    #[test]
    fn test_volume_is_additive() {
        let mut candle = Candle::open_at(period(), 1.1, 1.1, 2.0, TimeframeUnit::Minute, 5);
        let deltas = [3.0, 0.0, 1.5, 4.5];
        for delta in deltas {
            candle.update(1.1, 1.1, delta);
        }
        assert_relative_eq!(candle.volume(), 2.0 + deltas.iter().sum::<f64>());
    }

    #[test]
    fn test_side_invariant_holds() {
        let mut candle = Candle::open_at(period(), 1.1000, 1.1001, 0.0, TimeframeUnit::Hour, 5);
        for price in [1.1005, 1.0987, 1.1021, 1.0999] {
            candle.update(price, price + 0.0001, 1.0);
        }
        for side in [candle.bid(), candle.ask()] {
            assert!(side.high >= side.open.max(side.close));
            assert!(side.low <= side.open.min(side.close));
        }
    }

    #[test]
    fn test_close_and_reopen() {
        let mut candle = Candle::open_at(period(), 1.1, 1.1, 2.0, TimeframeUnit::Day, 5);
        candle.close();
        assert!(candle.is_completed());

        let reopened = candle.reopened();
        assert!(!reopened.is_completed());
        assert_eq!(reopened.bid(), candle.bid());
        assert_eq!(reopened.period_start(), candle.period_start());
        assert_relative_eq!(reopened.volume(), candle.volume());
    }

    #[test]
    fn test_ohlc_carry() {
        let side = Ohlc::carry(1.1005, 1.1010);
        assert_eq!(side, Ohlc::new(1.1005, 1.1010, 1.1005, 1.1010));

        let side = Ohlc::carry(1.1005, 1.0990);
        assert_eq!(side, Ohlc::new(1.1005, 1.1005, 1.0990, 1.0990));
    }

    #[test]
    fn test_serde_round_trip() {
        let candle = Candle::new(
            period(),
            Ohlc::new(1.1000, 1.1010, 1.0990, 1.1005),
            Ohlc::new(1.1001, 1.1011, 1.0991, 1.1006),
            42.0,
            true,
            TimeframeUnit::Hour,
            5,
        );
        let json = serde_json::to_string(&candle).unwrap();
        assert_eq!(serde_json::from_str::<Candle>(&json).unwrap(), candle);
    }
}
