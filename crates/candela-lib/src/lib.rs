//! Candlestick aggregation engine for live forex tick streams.
//!
//! This is a facade crate that re-exports functionality from the candela
//! workspace crates for convenient access.
//!
//! # Quick Start
//!
//! ```ignore
//! use candela_lib::prelude::*;
//! use std::sync::Arc;
//!
//! let (events, mut updates) = tokio::sync::mpsc::unbounded_channel();
//! let manager = CandleManager::new(
//!     transport,
//!     BoundaryCalculator::new(day_offset_for_zone("EST"), -1),
//!     Arc::new(events),
//! );
//!
//! let request = HistoryRequest::new("EUR/USD", "m1".parse()?, DEFAULT_BAR_COUNT);
//! manager.get_history(&request)?;
//!
//! while let Some(event) = updates.blocking_recv() {
//!     match event {
//!         SeriesEvent::Loaded { candles, .. } => println!("{} bars", candles.len()),
//!         SeriesEvent::Updated { candle, .. } => println!("{candle:?}"),
//!         SeriesEvent::Failed { error, .. } => eprintln!("{error}"),
//!     }
//! }
//! ```

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candela-rs/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use candela_types::*;

// Re-export the candle model
#[cfg(feature = "aggregate")]
pub use candela_aggregate::{Candle, CandleSeries, EventSink, Ohlc, SeriesEvent, SeriesId};

// Re-export backfill coordination
#[cfg(feature = "history")]
pub use candela_history::{
    BarRow, CandleManager, HistoryCoordinator, HistoryTransport, LoadState, TransportError,
};

/// Prelude module for convenient imports.
///
/// ```
/// use candela_lib::prelude::*;
/// ```
pub mod prelude {
    pub use candela_types::{
        BoundaryCalculator, CandelaError, DEFAULT_BAR_COUNT, HistoryRequest, Result, Tick,
        Timeframe, TimeframeUnit, day_offset_for_zone,
    };

    #[cfg(feature = "aggregate")]
    pub use candela_aggregate::{Candle, CandleSeries, EventSink, Ohlc, SeriesEvent};

    #[cfg(feature = "history")]
    pub use candela_history::{BarRow, CandleManager, HistoryTransport};
}
