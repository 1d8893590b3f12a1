//! Core types for the candela live candle aggregation engine.
//!
//! This crate provides the fundamental data structures shared by the engine:
//!
//! - [`Tick`] - A single price tick carrying a cumulative minute volume
//! - [`Timeframe`] - Validated aggregation timeframe (unit + length)
//! - [`BoundaryCalculator`] - Calendar-aware period boundary math
//! - [`HistoryRequest`] - Descriptor of one paginated history request

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candela-rs/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod boundary;
mod error;
mod request;
mod tick;
mod timeframe;

pub use boundary::{BoundaryCalculator, day_offset_for_zone, minute_start};
pub use error::{CandelaError, Result};
pub use request::{DEFAULT_BAR_COUNT, HistoryRequest};
pub use tick::Tick;
pub use timeframe::{Timeframe, TimeframeError, TimeframeUnit};
