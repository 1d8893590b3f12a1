//! The seam to the external session transport.

use candela_aggregate::Ohlc;
use candela_types::HistoryRequest;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Error surfaced by a transport when a history request cannot be sent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The session is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The upstream rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

/// One row of a historical bar page.
///
/// Rows of a page are delivered oldest to newest, each carrying its
/// position index within the response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRow {
    /// Period start of the bar.
    pub timestamp: DateTime<Utc>,
    /// Bid side prices.
    pub bid: Ohlc,
    /// Ask side prices.
    pub ask: Ohlc,
    /// Accumulated tick volume of the bar.
    pub volume: f64,
    /// Position of the row within the response, oldest first.
    pub position: usize,
}

/// Outbound interface to the session transport.
///
/// Implementations own the network session and perform the actual I/O; the
/// engine only issues requests through this trait and receives results via
/// the `CandleManager` callbacks.
pub trait HistoryTransport: Send + Sync {
    /// True when the session can accept history requests.
    fn is_ready(&self) -> bool;

    /// Decimal precision (digits) of the instrument's market quotes.
    fn instrument_precision(&self, instrument: &str) -> u8;

    /// Sends one history request upstream.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request cannot be submitted.
    fn request_history(&self, request: &HistoryRequest) -> Result<(), TransportError>;
}
