//! Ordered candle sequences with live tick reconciliation.

use std::sync::Arc;

use candela_types::{BoundaryCalculator, Tick, Timeframe};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Candle, Ohlc};

/// Unique identifier of a candle series.
pub type SeriesId = Uuid;

/// Notification emitted by a [`CandleSeries`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SeriesEvent {
    /// Backfill completed and buffered ticks were flushed; fired exactly
    /// once per series, with the full candle snapshot.
    Loaded {
        /// The emitting series.
        series: SeriesId,
        /// All candles, oldest first.
        candles: Vec<Candle>,
    },
    /// A tick-driven change to one candle, including the close of a candle
    /// when a new period opens. Only fired after the series has loaded.
    Updated {
        /// The emitting series.
        series: SeriesId,
        /// The changed candle.
        candle: Candle,
    },
    /// The history load failed; fired at most once, no further events
    /// follow.
    Failed {
        /// The emitting series.
        series: SeriesId,
        /// Upstream error message.
        error: String,
    },
}

/// Receives series notifications in emission order.
///
/// Implemented for `tokio::sync::mpsc::UnboundedSender<SeriesEvent>`, so a
/// consumer task can simply drain a channel.
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    fn emit(&self, event: SeriesEvent);
}

impl EventSink for tokio::sync::mpsc::UnboundedSender<SeriesEvent> {
    fn emit(&self, event: SeriesEvent) {
        // The receiver may already be gone during shutdown.
        let _ = self.send(event);
    }
}

/// An ordered, gap-free candle sequence for one (instrument, timeframe)
/// pair.
///
/// The series owns tick aggregation and the cumulative-minute volume
/// reconciliation: each tick carries the accumulated tick volume of its
/// minute, and the series keeps the last processed minute and its volume as
/// the baseline for the next delta. Candles are strictly ascending by
/// period start and only the newest one may be incomplete.
pub struct CandleSeries {
    id: SeriesId,
    instrument: String,
    timeframe: Timeframe,
    calculator: BoundaryCalculator,
    precision: u8,
    candles: Vec<Candle>,
    last_minute: Option<DateTime<Utc>>,
    last_minute_volume: f64,
    loaded: bool,
    failed: bool,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for CandleSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleSeries")
            .field("id", &self.id)
            .field("instrument", &self.instrument)
            .field("timeframe", &self.timeframe)
            .field("candles", &self.candles.len())
            .field("loaded", &self.loaded)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}

impl CandleSeries {
    /// Creates an empty series.
    #[must_use]
    pub fn new(
        instrument: impl Into<String>,
        timeframe: Timeframe,
        calculator: BoundaryCalculator,
        precision: u8,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument: instrument.into(),
            timeframe,
            calculator,
            precision,
            candles: Vec::new(),
            last_minute: None,
            last_minute_volume: 0.0,
            loaded: false,
            failed: false,
            sink,
        }
    }

    /// Unique series identifier, carried by every emitted event.
    #[must_use]
    pub const fn id(&self) -> SeriesId {
        self.id
    }

    /// Instrument name.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Series timeframe.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Decimal precision (digits) applied to new candles.
    #[must_use]
    pub const fn precision(&self) -> u8 {
        self.precision
    }

    /// True once the backfill finished and `Loaded` was emitted.
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// True once `Failed` was emitted.
    #[must_use]
    pub const fn has_failed(&self) -> bool {
        self.failed
    }

    /// Number of candles.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.candles.len()
    }

    /// True if the series holds no candles.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Candle by index; the oldest candle has index 0.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Candle> {
        self.candles.get(index)
    }

    /// All candles, oldest first.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Period start of the oldest candle, if any.
    #[must_use]
    pub fn oldest_start(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(Candle::period_start)
    }

    /// Applies one live tick.
    ///
    /// Ticks for a different instrument are ignored. A tick belonging to a
    /// newer bucket than the open candle closes that candle (emitting
    /// `Updated` for it when loaded) and opens the next one with the open
    /// price carried forward from the previous close. A tick belonging to
    /// the open bucket updates it with a volume delta derived from the
    /// reconciliation baseline:
    ///
    /// - same minute as the baseline: delta = cumulative - baseline volume
    /// - newer minute: delta = the tick's full cumulative volume
    /// - older minute: the tick is stale and ignored entirely
    pub fn add_tick(&mut self, tick: &Tick) {
        if tick.instrument != self.instrument {
            return;
        }
        let bucket = self.calculator.period_start(self.timeframe, tick.timestamp);

        let last = match self.candles.last_mut() {
            Some(last) => last,
            None => {
                // Normally the backfill seeds the series; getting here means
                // the history request returned nothing.
                self.candles.push(Candle::open_at(
                    bucket,
                    tick.bid,
                    tick.ask,
                    tick.minute_volume,
                    self.timeframe.unit(),
                    self.precision,
                ));
                self.last_minute = Some(tick.minute());
                self.last_minute_volume = tick.minute_volume;
                return;
            }
        };

        if last.period_start() < bucket {
            last.close();
            let closed = last.clone();
            self.candles.push(Candle::new(
                bucket,
                Ohlc::carry(closed.bid().close, tick.bid),
                Ohlc::carry(closed.ask().close, tick.ask),
                tick.minute_volume,
                false,
                self.timeframe.unit(),
                self.precision,
            ));
            self.last_minute = Some(tick.minute());
            self.last_minute_volume = tick.minute_volume;
            if self.loaded {
                self.sink.emit(SeriesEvent::Updated {
                    series: self.id,
                    candle: closed,
                });
            }
        } else if last.period_start() == bucket {
            let minute = tick.minute();
            let delta = match self.last_minute {
                Some(baseline) if minute == baseline => {
                    let delta = tick.minute_volume - self.last_minute_volume;
                    self.last_minute_volume = tick.minute_volume;
                    delta
                }
                Some(baseline) if minute > baseline => {
                    // First tick of a new minute: the whole accumulated
                    // volume belongs to the candle.
                    self.last_minute = Some(minute);
                    self.last_minute_volume = tick.minute_volume;
                    tick.minute_volume
                }
                Some(_) => {
                    // Stale: older than the minute already accounted for.
                    return;
                }
                None => {
                    self.last_minute = Some(minute);
                    self.last_minute_volume = tick.minute_volume;
                    tick.minute_volume
                }
            };
            last.update(tick.bid, tick.ask, delta);
            let updated = last.clone();
            if self.loaded {
                self.sink.emit(SeriesEvent::Updated {
                    series: self.id,
                    candle: updated,
                });
            }
        }
        // A tick older than the open bucket cannot occur on a monotonic
        // feed; fall through without touching anything.
    }

    /// Inserts a historical candle at `position` (insert/replace).
    ///
    /// If `position` is already occupied by a candle whose period start is
    /// not newer than the incoming one, the occupant is removed first. This
    /// makes overlapping and re-delivered backfill pages idempotent.
    /// Positions past the end append.
    pub fn add_candle(&mut self, candle: Candle, position: usize) {
        if let Some(existing) = self.candles.get(position) {
            if existing.period_start() <= candle.period_start() {
                self.candles.remove(position);
            }
        }
        let position = position.min(self.candles.len());
        self.candles.insert(position, candle);
    }

    /// Seeds the volume reconciliation baseline from the authoritative
    /// last-bar figures of a finished history load.
    ///
    /// The baseline only advances; a candidate minute earlier than the
    /// current baseline is ignored.
    pub fn set_last_volume(&mut self, minute: DateTime<Utc>, volume: f64) {
        if self.last_minute.is_some_and(|baseline| minute < baseline) {
            return;
        }
        self.last_minute = Some(minute);
        self.last_minute_volume = volume;
    }

    /// Replaces the newest candle with an identical, incomplete copy so
    /// live ticks can keep extending it.
    pub fn reopen_newest(&mut self) {
        if let Some(last) = self.candles.last_mut() {
            *last = last.reopened();
        }
    }

    /// Marks the series loaded and emits `Loaded` with the full snapshot.
    pub fn mark_loaded(&mut self) {
        self.loaded = true;
        self.sink.emit(SeriesEvent::Loaded {
            series: self.id,
            candles: self.candles.clone(),
        });
    }

    /// Emits `Failed` once; subsequent calls are no-ops.
    pub fn fail(&mut self, error: &str) {
        if self.failed {
            return;
        }
        self.failed = true;
        self.sink.emit(SeriesEvent::Failed {
            series: self.id,
            error: error.to_string(),
        });
    }
}
