//! History request descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Timeframe;

/// Default number of bars requested when no count is given.
pub const DEFAULT_BAR_COUNT: u32 = 300;

/// One paginated request for historical bars.
///
/// Responses and live ticks are correlated to a series through
/// [`HistoryRequest::key`], not through an opaque request id, so re-requests
/// for the same instrument/timeframe land on the same series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Name of the instrument.
    pub instrument: String,
    /// Requested timeframe.
    pub timeframe: Timeframe,
    /// Lower bound of the range; `None` means unbounded.
    pub from: Option<DateTime<Utc>>,
    /// Upper bound of the range (inclusive); `None` means unbounded.
    pub to: Option<DateTime<Utc>>,
    /// Number of bars requested.
    pub count: u32,
}

impl HistoryRequest {
    /// Creates an unbounded request for the newest `count` bars.
    #[must_use]
    pub fn new(instrument: impl Into<String>, timeframe: Timeframe, count: u32) -> Self {
        Self {
            instrument: instrument.into(),
            timeframe,
            from: None,
            to: None,
            count,
        }
    }

    /// Creates a range-bounded request.
    #[must_use]
    pub fn with_range(
        instrument: impl Into<String>,
        timeframe: Timeframe,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        count: u32,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timeframe,
            from,
            to,
            count,
        }
    }

    /// Stable identity key: `instrument + "_" + timeframe name`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.instrument, self.timeframe)
    }
}
