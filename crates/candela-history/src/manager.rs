//! Subscription registry and page routing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use candela_aggregate::{Candle, CandleSeries, EventSink, SeriesId};
use candela_types::{BoundaryCalculator, CandelaError, HistoryRequest, Result, Tick};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{BarRow, HistoryCoordinator, HistoryTransport};

/// Registry of candle series keyed by `instrument + "_" + timeframe`.
///
/// The manager owns one [`HistoryCoordinator`] per series, routes transport
/// responses and live ticks to them and drives the follow-up requests of a
/// paginated backfill. All entry points take `&self`; callers on the tick
/// thread and the response thread share one manager behind an `Arc`.
pub struct CandleManager {
    transport: Arc<dyn HistoryTransport>,
    calculator: BoundaryCalculator,
    sink: Arc<dyn EventSink>,
    histories: Mutex<HashMap<String, HistoryCoordinator>>,
}

impl std::fmt::Debug for CandleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let histories = self.lock();
        f.debug_struct("CandleManager")
            .field("calculator", &self.calculator)
            .field("series", &histories.len())
            .finish_non_exhaustive()
    }
}

impl CandleManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new(
        transport: Arc<dyn HistoryTransport>,
        calculator: BoundaryCalculator,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            calculator,
            sink,
            histories: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, HistoryCoordinator>> {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests history for the given instrument and timeframe and keeps
    /// the series subscribed to live ticks afterwards.
    ///
    /// Returns the id of the series the request resolves into. Repeated
    /// calls with the same key reuse the existing series and trigger a
    /// fresh backfill.
    pub fn get_history(&self, request: &HistoryRequest) -> Result<SeriesId> {
        self.request(request, true)
    }

    /// Like [`get_history`](Self::get_history) but the series is discarded
    /// once loaded instead of following live ticks.
    pub fn get_history_once(&self, request: &HistoryRequest) -> Result<SeriesId> {
        self.request(request, false)
    }

    fn request(&self, request: &HistoryRequest, subscribe: bool) -> Result<SeriesId> {
        if !self.transport.is_ready() {
            return Err(CandelaError::TransportNotReady);
        }
        let key = request.key();
        let id = {
            let mut histories = self.lock();
            let coordinator = histories.entry(key.clone()).or_insert_with(|| {
                let precision = self.transport.instrument_precision(&request.instrument);
                let series = CandleSeries::new(
                    request.instrument.clone(),
                    request.timeframe,
                    self.calculator,
                    precision,
                    Arc::clone(&self.sink),
                );
                debug!(%key, series = %series.id(), subscribe, "new candle series");
                HistoryCoordinator::new(series, request.count, subscribe)
            });
            coordinator.series().id()
        };
        if let Err(error) = self.transport.request_history(request) {
            self.on_history_failed(&key, &error.to_string());
            return Err(CandelaError::Transport(error.to_string()));
        }
        Ok(id)
    }

    /// Routes a live tick to every series, dropping entries that finished
    /// a one-shot load or failed.
    pub fn on_tick(&self, tick: &Tick) {
        let mut histories = self.lock();
        histories.retain(|_, coordinator| !coordinator.needs_removal());
        for coordinator in histories.values_mut() {
            coordinator.on_tick(tick);
        }
    }

    /// Routes one bar row of a response page.
    pub fn on_history_row(&self, key: &str, row: &BarRow) {
        if let Some(coordinator) = self.lock().get_mut(key) {
            coordinator.on_row(row);
        }
    }

    /// Routes the authoritative last-bar minute and volume of a page.
    pub fn on_last_bar(&self, key: &str, minute: DateTime<Utc>, volume: f64) {
        if let Some(coordinator) = self.lock().get_mut(key) {
            coordinator.set_last_bar(minute, volume);
        }
    }

    /// Routes a failed history request.
    pub fn on_history_failed(&self, key: &str, error: &str) {
        if let Some(coordinator) = self.lock().get_mut(key) {
            coordinator.fail(error);
        }
    }

    /// Handles the completion of one response page.
    ///
    /// When the series is still short of its target and the page brought
    /// new bars, a follow-up request for the missing count (plus the
    /// shared boundary bar) ending at the oldest loaded bar is sent.
    /// Otherwise the load is finalized.
    pub fn on_request_completed(&self, key: &str) {
        let follow_up = {
            let mut histories = self.lock();
            let Some(coordinator) = histories.get_mut(key) else {
                return;
            };
            let progressed = coordinator.note_page();
            let have = coordinator.series().len();
            let target = coordinator.target_count() as usize;
            if have == 0 || have >= target || !progressed {
                coordinator.finish();
                None
            } else {
                let missing = (target - have) as u32;
                Some(HistoryRequest::with_range(
                    coordinator.series().instrument(),
                    coordinator.series().timeframe(),
                    None,
                    coordinator.series().oldest_start(),
                    missing + 1,
                ))
            }
        };
        if let Some(request) = follow_up {
            debug!(%key, count = request.count, "requesting older bars");
            if let Err(error) = self.transport.request_history(&request) {
                warn!(%key, %error, "follow-up request failed");
                self.on_history_failed(key, &error.to_string());
            }
        }
    }

    /// Snapshot of the candles of one series, oldest first.
    #[must_use]
    pub fn snapshot(&self, key: &str) -> Option<Vec<Candle>> {
        self.lock()
            .get(key)
            .map(|coordinator| coordinator.series().candles().to_vec())
    }

    /// Id of the series registered under `key`.
    #[must_use]
    pub fn series_id(&self, key: &str) -> Option<SeriesId> {
        self.lock().get(key).map(|c| c.series().id())
    }

    /// Number of registered series.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no series is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
