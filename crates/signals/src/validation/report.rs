//! Sweep report generation.
//!
//! Derives the "top significant" view from the full result table and renders
//! a human-readable summary of the sweep.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use cryptosent_data::CorrelationResult;

use super::sweep::SweepStats;

/// Rows with a Pearson p-value below `alpha`, ranked by descending |r|.
///
/// Undefined (NaN) rows never qualify. Ties keep their canonical order.
#[must_use]
pub fn top_significant(results: &[CorrelationResult], alpha: f64) -> Vec<CorrelationResult> {
    let mut significant: Vec<CorrelationResult> = results
        .iter()
        .filter(|r| r.is_significant(alpha) && !r.pearson_r.is_nan())
        .cloned()
        .collect();
    significant.sort_by(|a, b| b.abs_pearson().total_cmp(&a.abs_pearson()));
    significant
}

/// Summary of one correlation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    /// Result rows written to the full table
    pub total_results: usize,
    /// Grid points evaluated
    pub evaluated: usize,
    /// Grid points below the observation threshold
    pub insufficient: usize,
    /// Significance cutoff used for the top view
    pub significance_level: f64,
    /// Significant rows, strongest first
    pub top: Vec<CorrelationResult>,
}

impl SweepReport {
    /// Builds the report from sweep output.
    #[must_use]
    pub fn generate(results: &[CorrelationResult], stats: &SweepStats, alpha: f64) -> Self {
        Self {
            total_results: results.len(),
            evaluated: stats.evaluated,
            insufficient: stats.insufficient,
            significance_level: alpha,
            top: top_significant(results, alpha),
        }
    }

    /// Strongest significant row for `symbol`, if any.
    #[must_use]
    pub fn best_for(&self, symbol: &str) -> Option<&CorrelationResult> {
        self.top
            .iter()
            .find(|r| r.symbol.eq_ignore_ascii_case(symbol))
    }

    /// Converts the report to a human-readable text format, listing at most
    /// `top_n` significant rows.
    #[must_use]
    pub fn to_text(&self, top_n: usize) -> String {
        let mut output = String::new();

        output.push_str("=== Correlation Sweep Report ===\n\n");
        output.push_str(&format!(
            "Grid points: {} evaluated, {} below sample threshold, {} results\n",
            self.evaluated, self.insufficient, self.total_results
        ));
        output.push_str(&format!(
            "Significant (p<{}): {}\n\n",
            self.significance_level,
            self.top.len()
        ));

        if self.top.is_empty() {
            output.push_str("No significant correlations found.\n");
            return output;
        }

        output.push_str(&format!(
            "{:<8} {:>4} {:>4} {:>4} {:>9} {:>10} {:>10} {:>6}\n",
            "symbol", "H", "W", "L", "pearson", "p", "spearman", "n"
        ));
        for r in self.top.iter().take(top_n) {
            output.push_str(&format!(
                "{:<8} {:>4} {:>4} {:>4} {:>9.4} {:>10.2e} {:>10.4} {:>6}\n",
                r.symbol,
                r.price_horizon_hours,
                r.sentiment_window_hours,
                r.lag_hours,
                r.pearson_r,
                r.pearson_p,
                r.spearman_r,
                r.n_observations
            ));
        }

        output
    }

    /// Converts the report to JSON format.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, h: usize, r: f64, p: f64) -> CorrelationResult {
        CorrelationResult {
            symbol: symbol.to_string(),
            price_horizon_hours: h,
            sentiment_window_hours: 4,
            lag_hours: 0,
            pearson_r: r,
            pearson_p: p,
            spearman_r: r,
            spearman_p: p,
            n_observations: 120,
        }
    }

    fn results() -> Vec<CorrelationResult> {
        vec![
            row("BTC", 1, 0.10, 0.20),
            row("BTC", 4, -0.35, 0.001),
            row("ETH", 1, 0.22, 0.01),
            row("ETH", 4, f64::NAN, f64::NAN),
            row("ETH", 6, 0.50, 0.05),
        ]
    }

    #[test]
    fn top_view_filters_and_ranks_by_absolute_r() {
        let top = top_significant(&results(), 0.05);
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].symbol.as_str(), top[0].price_horizon_hours), ("BTC", 4));
        assert_eq!((top[1].symbol.as_str(), top[1].price_horizon_hours), ("ETH", 1));
    }

    #[test]
    fn top_view_is_empty_without_significant_rows() {
        assert!(top_significant(&[row("BTC", 1, 0.1, 0.5)], 0.05).is_empty());
        assert!(top_significant(&[], 0.05).is_empty());
    }

    #[test]
    fn report_counts_and_best_row() {
        let stats = SweepStats {
            evaluated: 8,
            insufficient: 3,
            ..SweepStats::default()
        };
        let report = SweepReport::generate(&results(), &stats, 0.05);

        assert_eq!(report.total_results, 5);
        assert_eq!(report.evaluated, 8);
        assert_eq!(report.best_for("eth").unwrap().price_horizon_hours, 1);
        assert!(report.best_for("SOL").is_none());
    }

    #[test]
    fn to_text_lists_at_most_top_n_rows() {
        let report = SweepReport::generate(&results(), &SweepStats::default(), 0.05);
        let text = report.to_text(1);

        assert!(text.contains("Correlation Sweep Report"));
        assert!(text.contains("Significant (p<0.05): 2"));
        assert!(text.contains("-0.3500"));
        assert!(!text.contains("0.2200"));
    }

    #[test]
    fn to_text_reports_no_findings() {
        let report = SweepReport::generate(&[], &SweepStats::default(), 0.05);
        assert!(report.to_text(5).contains("No significant correlations found."));
    }

    #[test]
    fn to_json_parses_correctly() {
        let report = SweepReport::generate(&results(), &SweepStats::default(), 0.05);
        let json = report.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["total_results"], 5);
        assert_eq!(parsed["top"].as_array().unwrap().len(), 2);
    }
}
