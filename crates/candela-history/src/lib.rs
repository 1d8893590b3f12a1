//! Backfill coordination and subscription routing for the candela engine.
//!
//! This crate connects the pure aggregation model to an external transport:
//!
//! - [`HistoryTransport`] / [`BarRow`] - The seam to the session transport
//! - [`HistoryCoordinator`] - Drives one paginated backfill to completion
//! - [`CandleManager`] - Registry routing ticks and pages to their series

#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/candela-rs/candela/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod coordinator;
mod manager;
mod transport;

pub use coordinator::{HistoryCoordinator, LoadState};
pub use manager::CandleManager;
pub use transport::{BarRow, HistoryTransport, TransportError};
