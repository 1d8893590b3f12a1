//! Per-series backfill driver.

use std::collections::VecDeque;

use candela_aggregate::{Candle, CandleSeries};
use candela_types::Tick;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::BarRow;

/// Load state of one history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Waiting for (more) response pages; ticks are buffered.
    #[default]
    Requesting,
    /// Backfill finished; live ticks apply directly.
    Ready,
    /// The upstream request failed; the series is inert.
    Failed,
}

impl LoadState {
    /// True once the load has concluded, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }

    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Requesting => "requesting",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Drives the paginated backfill of one [`CandleSeries`] and buffers live
/// ticks that arrive while the candle list is not yet stable.
#[derive(Debug)]
pub struct HistoryCoordinator {
    series: CandleSeries,
    buffered: VecDeque<Tick>,
    state: LoadState,
    subscribe: bool,
    target_count: u32,
    last_bar: Option<(DateTime<Utc>, f64)>,
    len_at_last_page: Option<usize>,
}

impl HistoryCoordinator {
    /// Creates a coordinator around a freshly created series.
    #[must_use]
    pub fn new(series: CandleSeries, target_count: u32, subscribe: bool) -> Self {
        Self {
            series,
            buffered: VecDeque::new(),
            state: LoadState::Requesting,
            subscribe,
            target_count,
            last_bar: None,
            len_at_last_page: None,
        }
    }

    /// The coordinated series.
    #[must_use]
    pub const fn series(&self) -> &CandleSeries {
        &self.series
    }

    /// Current load state.
    #[must_use]
    pub const fn state(&self) -> LoadState {
        self.state
    }

    /// Number of bars the original request asked for.
    #[must_use]
    pub const fn target_count(&self) -> u32 {
        self.target_count
    }

    /// True if the series keeps receiving live ticks after loading.
    #[must_use]
    pub const fn is_subscribing(&self) -> bool {
        self.subscribe
    }

    /// True once the registry may discard this entry: a one-shot request
    /// that finished loading, or any failed request.
    #[must_use]
    pub const fn needs_removal(&self) -> bool {
        matches!(
            (self.subscribe, self.state),
            (false, LoadState::Ready) | (_, LoadState::Failed)
        )
    }

    /// Handles one live tick.
    ///
    /// While pages are outstanding the tick is buffered in arrival order;
    /// once ready it is applied immediately. Non-subscribing requests and
    /// failed loads drop ticks.
    pub fn on_tick(&mut self, tick: &Tick) {
        if !self.subscribe || tick.instrument != self.series.instrument() {
            return;
        }
        match self.state {
            LoadState::Requesting => self.buffered.push_back(tick.clone()),
            LoadState::Ready => self.series.add_tick(tick),
            LoadState::Failed => {}
        }
    }

    /// Applies one row of a response page via the series insert/replace
    /// rule. Rows of a late or duplicated page correct the series rather
    /// than erroring.
    pub fn on_row(&mut self, row: &BarRow) {
        let candle = Candle::new(
            row.timestamp,
            row.bid,
            row.ask,
            row.volume,
            true,
            self.series.timeframe().unit(),
            self.series.precision(),
        );
        self.series.add_candle(candle, row.position);
    }

    /// Stages the authoritative last-bar minute and volume of a page.
    /// Across pages only the newest figures are kept.
    pub fn set_last_bar(&mut self, minute: DateTime<Utc>, volume: f64) {
        if self.last_bar.is_none_or(|(staged, _)| minute >= staged) {
            self.last_bar = Some((minute, volume));
        }
    }

    /// Records a completed page and reports whether it grew the series.
    /// A page without growth means the upstream has no more data.
    pub fn note_page(&mut self) -> bool {
        let len = self.series.len();
        let progressed = self.len_at_last_page.is_none_or(|previous| len > previous);
        self.len_at_last_page = Some(len);
        progressed
    }

    /// Finalizes a completed load: seeds the reconciliation baseline from
    /// the staged last-bar figures and re-opens the newest historical
    /// candle so live ticks keep extending it.
    ///
    /// The first call additionally replays buffered ticks in arrival order
    /// and marks the series loaded (emitting `Loaded`). A page redelivered
    /// by a re-request replaces the open candle with a completed copy, so
    /// the baseline/re-open steps run again on every completed page; only
    /// the load itself concludes once.
    pub fn finish(&mut self) {
        if self.state == LoadState::Failed {
            return;
        }
        if let Some((minute, volume)) = self.last_bar {
            self.series.set_last_volume(minute, volume);
        }
        self.series.reopen_newest();
        if self.state == LoadState::Ready {
            return;
        }

        let buffered = std::mem::take(&mut self.buffered);
        let replayed = buffered.len();
        for tick in &buffered {
            self.series.add_tick(tick);
        }

        self.state = LoadState::Ready;
        self.series.mark_loaded();
        debug!(
            series = %self.series.id(),
            candles = self.series.len(),
            replayed,
            "history load finished"
        );
    }

    /// Marks the load failed, emits `Failed` and drops any buffered ticks.
    pub fn fail(&mut self, error: &str) {
        warn!(series = %self.series.id(), error, "history load failed");
        self.state = LoadState::Failed;
        self.buffered.clear();
        self.series.fail(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candela_aggregate::{EventSink, Ohlc, SeriesEvent};
    use candela_types::BoundaryCalculator;
    use chrono::TimeZone;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<SeriesEvent>>);

    impl EventSink for CollectingSink {
        fn emit(&self, event: SeriesEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    impl CollectingSink {
        fn events(&self) -> Vec<SeriesEvent> {
            self.0.lock().unwrap().clone()
        }
    }

    fn ts(h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, mi, 0).unwrap()
    }

    fn coordinator(subscribe: bool, sink: Arc<CollectingSink>) -> HistoryCoordinator {
        let series = CandleSeries::new(
            "EUR/USD",
            "m1".parse().unwrap(),
            BoundaryCalculator::new(0, 0),
            5,
            sink,
        );
        HistoryCoordinator::new(series, 3, subscribe)
    }

    fn row(position: usize, minute: DateTime<Utc>, close: f64, volume: f64) -> BarRow {
        BarRow {
            timestamp: minute,
            bid: Ohlc::new(close, close, close, close),
            ask: Ohlc::new(close, close, close, close),
            volume,
            position,
        }
    }

    fn tick(h: u32, mi: u32, s: u32, bid: f64, volume: f64) -> Tick {
        let timestamp = Utc.with_ymd_and_hms(2024, 1, 15, h, mi, s).unwrap();
        Tick::new("EUR/USD", timestamp, bid, bid + 0.0001, volume)
    }

    #[test]
    fn test_load_state() {
        assert!(!LoadState::Requesting.is_terminal());
        assert!(LoadState::Ready.is_terminal());
        assert!(LoadState::Failed.is_terminal());
        assert_eq!(LoadState::Ready.to_string(), "ready");
    }

    #[test]
    fn test_ticks_buffer_until_finish() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, Arc::clone(&sink));

        coordinator.on_row(&row(0, ts(10, 0), 1.1000, 5.0));
        coordinator.on_row(&row(1, ts(10, 1), 1.1005, 6.0));

        // Arrives mid-load: must not touch the series yet
        coordinator.on_tick(&tick(10, 1, 40, 1.1009, 8.0));
        assert_eq!(coordinator.series().len(), 2);
        assert!(coordinator.series().get(1).unwrap().is_completed());

        coordinator.set_last_bar(ts(10, 1), 6.0);
        coordinator.note_page();
        coordinator.finish();

        assert_eq!(coordinator.state(), LoadState::Ready);
        let newest = coordinator.series().get(1).unwrap();
        assert!(!newest.is_completed());
        assert_eq!(newest.bid().close, 1.1009);
        // Replayed tick diffs against the authoritative last-bar volume
        assert_relative_eq!(newest.volume(), 8.0);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            SeriesEvent::Loaded { candles, .. } => assert_eq!(candles.len(), 2),
            other => panic!("expected Loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_finish_is_idempotent() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, Arc::clone(&sink));

        coordinator.on_row(&row(0, ts(10, 0), 1.1000, 5.0));
        coordinator.finish();
        coordinator.finish();
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_redelivered_page_reopens_the_newest_candle() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, Arc::clone(&sink));

        coordinator.on_row(&row(0, ts(10, 0), 1.1000, 5.0));
        coordinator.on_row(&row(1, ts(10, 1), 1.1005, 6.0));
        coordinator.set_last_bar(ts(10, 1), 6.0);
        coordinator.note_page();
        coordinator.finish();
        assert!(!coordinator.series().get(1).unwrap().is_completed());

        // A re-request redelivers the page: the replaced newest candle is
        // completed again until the page finishes
        coordinator.on_row(&row(1, ts(10, 1), 1.1005, 6.0));
        assert!(coordinator.series().get(1).unwrap().is_completed());

        coordinator.note_page();
        coordinator.finish();

        let newest = coordinator.series().get(1).unwrap();
        assert!(!newest.is_completed());
        assert_eq!(coordinator.state(), LoadState::Ready);
        // Loaded was not emitted a second time
        assert_eq!(sink.events().len(), 1);
    }

    #[test]
    fn test_one_shot_drops_ticks_and_needs_removal() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(false, Arc::clone(&sink));

        coordinator.on_row(&row(0, ts(10, 0), 1.1000, 5.0));
        coordinator.on_tick(&tick(10, 0, 30, 1.2, 9.0));
        assert!(!coordinator.needs_removal());

        coordinator.finish();
        assert!(coordinator.needs_removal());
        assert_relative_eq!(coordinator.series().get(0).unwrap().volume(), 5.0);
    }

    #[test]
    fn test_failure_is_inert() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, Arc::clone(&sink));

        coordinator.on_tick(&tick(10, 0, 0, 1.1, 5.0));
        coordinator.fail("no connection");

        assert_eq!(coordinator.state(), LoadState::Failed);
        assert!(coordinator.needs_removal());
        assert!(coordinator.series().is_empty());

        // No buffering or processing after failure
        coordinator.on_tick(&tick(10, 0, 30, 1.1, 6.0));
        assert!(coordinator.series().is_empty());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], SeriesEvent::Failed { .. }));
    }

    #[test]
    fn test_set_last_bar_keeps_newest() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, sink);

        coordinator.set_last_bar(ts(10, 5), 7.0);
        coordinator.set_last_bar(ts(10, 3), 99.0);
        assert_eq!(coordinator.last_bar, Some((ts(10, 5), 7.0)));
    }

    #[test]
    fn test_note_page_tracks_progress() {
        let sink = Arc::new(CollectingSink::default());
        let mut coordinator = coordinator(true, sink);

        assert!(coordinator.note_page());
        coordinator.on_row(&row(0, ts(10, 0), 1.1, 5.0));
        assert!(coordinator.note_page());
        assert!(!coordinator.note_page());
    }
}
