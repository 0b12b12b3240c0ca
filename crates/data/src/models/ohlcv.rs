//! OHLCV bar model.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// One hourly OHLCV record for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    #[must_use]
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true when `low <= open, close <= high` and volume is finite.
    /// Any NaN field fails the check.
    #[must_use]
    pub fn has_valid_range(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.volume.is_finite()
    }

    /// Returns true when the close price is strictly positive.
    #[must_use]
    pub fn has_positive_close(&self) -> bool {
        self.close > 0.0
    }

    /// Copy of this bar re-stamped at `timestamp`. Used when forward-filling gaps.
    #[must_use]
    pub fn restamped(&self, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, ..*self }
    }
}

/// Truncates a timestamp to the start of its hour.
#[must_use]
pub fn floor_to_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(Duration::hours(1)).unwrap_or(ts)
}
