//! Correlation sweep result row.

use serde::{Deserialize, Serialize};

/// Association between a lagged rolling-sentiment feature and a future
/// return for one (asset, horizon, window, lag) grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub symbol: String,
    pub price_horizon_hours: usize,
    pub sentiment_window_hours: usize,
    pub lag_hours: usize,
    pub pearson_r: f64,
    pub pearson_p: f64,
    pub spearman_r: f64,
    pub spearman_p: f64,
    pub n_observations: usize,
}

impl CorrelationResult {
    /// CSV column order, matching the field order.
    pub const COLUMNS: [&'static str; 9] = [
        "symbol",
        "price_horizon_hours",
        "sentiment_window_hours",
        "lag_hours",
        "pearson_r",
        "pearson_p",
        "spearman_r",
        "spearman_p",
        "n_observations",
    ];

    /// Returns true if the Pearson p-value is below `alpha`. NaN is never significant.
    #[must_use]
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.pearson_p < alpha
    }

    #[must_use]
    pub fn abs_pearson(&self) -> f64 {
        self.pearson_r.abs()
    }
}
