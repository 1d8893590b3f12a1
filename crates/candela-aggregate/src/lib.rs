//! Candle aggregation for the candela engine.
//!
//! This crate provides the mutable candle model and its owning series:
//!
//! - [`Ohlc`] - One price side (bid or ask) of a candle
//! - [`Candle`] - OHLC aggregate for one time bucket
//! - [`CandleSeries`] - Ordered candle sequence with live tick reconciliation
//! - [`SeriesEvent`] / [`EventSink`] - Push-style change notifications

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candela-rs/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod candle;
mod series;

pub use candle::{Candle, Ohlc};
pub use series::{CandleSeries, EventSink, SeriesEvent, SeriesId};
