//! Correlation sweep engine.
//!
//! For every asset and every (horizon, window, lag) grid point, pairs the
//! lagged rolling sentiment with the future return and measures their
//! association. Grid points with too few paired observations are skipped.
//! Output order is canonical: asset (table order), then H, W, L.

use cryptosent_core::SweepConfig;
use cryptosent_data::{CorrelationResult, MasterTable};

use super::correlation::analyze_pearson;
use super::features::{future_returns, lagged, paired, rolling_mean};
use super::ic::analyze_spearman;

/// Counts collected over one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    /// Grid points evaluated
    pub evaluated: usize,
    /// Grid points skipped for insufficient observations
    pub insufficient: usize,
    /// Result rows whose correlation is undefined (constant input)
    pub undefined: usize,
    /// Symbols missing from the master table
    pub missing_symbols: usize,
}

impl SweepStats {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Evaluated: {}, Insufficient sample: {}, Undefined: {}, Missing symbols: {}",
            self.evaluated, self.insufficient, self.undefined, self.missing_symbols
        )
    }
}

/// Grid search over price horizon, sentiment window and lag.
#[derive(Debug, Clone)]
pub struct CorrelationSweep {
    price_horizons: Vec<usize>,
    sentiment_windows: Vec<usize>,
    lags: Vec<usize>,
    min_observations: usize,
}

impl CorrelationSweep {
    #[must_use]
    pub fn new(config: &SweepConfig) -> Self {
        Self {
            price_horizons: config.price_horizons.clone(),
            sentiment_windows: config.sentiment_windows.clone(),
            lags: config.lags.clone(),
            min_observations: config.min_observations,
        }
    }

    /// Sweeps every symbol of the table, in table order.
    #[must_use]
    pub fn run(&self, table: &MasterTable) -> (Vec<CorrelationResult>, SweepStats) {
        self.run_symbols(table, table.symbols())
    }

    /// Sweeps the given symbols, in the order given.
    #[must_use]
    pub fn run_symbols(
        &self,
        table: &MasterTable,
        symbols: &[String],
    ) -> (Vec<CorrelationResult>, SweepStats) {
        let mut results = Vec::new();
        let mut stats = SweepStats::default();

        for symbol in symbols {
            let (Some(close), Some(sentiment)) =
                (table.close_series(symbol), table.sentiment_series(symbol))
            else {
                tracing::warn!("Symbol {} not present in master table", symbol);
                stats.missing_symbols += 1;
                continue;
            };
            self.sweep_series(symbol, &close, &sentiment, &mut results, &mut stats);
        }

        (results, stats)
    }

    /// Sweeps one asset's close and hourly sentiment series.
    pub fn sweep_series(
        &self,
        symbol: &str,
        close: &[Option<f64>],
        sentiment: &[f64],
        results: &mut Vec<CorrelationResult>,
        stats: &mut SweepStats,
    ) {
        // Each rolling window is reused across horizons and lags.
        let rolled: Vec<Vec<f64>> = self
            .sentiment_windows
            .iter()
            .map(|&w| rolling_mean(sentiment, w))
            .collect();

        for &horizon in &self.price_horizons {
            let target = future_returns(close, horizon);

            for (wi, &window) in self.sentiment_windows.iter().enumerate() {
                for &lag in &self.lags {
                    stats.evaluated += 1;
                    let feature = lagged(&rolled[wi], lag);
                    let (x, y) = paired(&feature, &target);

                    if x.len() < self.min_observations {
                        stats.insufficient += 1;
                        continue;
                    }

                    let pearson = analyze_pearson(&x, &y);
                    let spearman = analyze_spearman(&x, &y);
                    if pearson.coefficient.is_nan() {
                        stats.undefined += 1;
                    }

                    results.push(CorrelationResult {
                        symbol: symbol.to_string(),
                        price_horizon_hours: horizon,
                        sentiment_window_hours: window,
                        lag_hours: lag,
                        pearson_r: pearson.coefficient,
                        pearson_p: pearson.p_value,
                        spearman_r: spearman.coefficient,
                        spearman_p: spearman.p_value,
                        n_observations: x.len(),
                    });
                }
            }
        }
    }
}
