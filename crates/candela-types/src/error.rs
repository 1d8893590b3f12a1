//! Error types for candela.

use thiserror::Error;

use crate::TimeframeError;

/// Result type alias for candela operations.
pub type Result<T> = std::result::Result<T, CandelaError>;

/// Errors that can occur while setting up or driving a candle series.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CandelaError {
    /// Invalid timeframe name or unit/length combination.
    #[error(transparent)]
    Timeframe(#[from] TimeframeError),

    /// The transport session cannot accept requests yet.
    #[error("transport is not in the proper state")]
    TransportNotReady,

    /// The transport rejected a history request.
    #[error("transport error: {0}")]
    Transport(String),
}
