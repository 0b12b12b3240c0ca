//! Shared types for data collectors.

use anyhow::{anyhow, Result};
use std::str::FromStr;

/// Bar interval accepted by the market data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartInterval {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    OneDay,
    OneWeek,
}

impl ChartInterval {
    /// Returns the chart API string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartInterval::OneMinute => "1m",
            ChartInterval::FiveMinutes => "5m",
            ChartInterval::FifteenMinutes => "15m",
            ChartInterval::ThirtyMinutes => "30m",
            ChartInterval::OneHour => "1h",
            ChartInterval::OneDay => "1d",
            ChartInterval::OneWeek => "1wk",
        }
    }
}

impl FromStr for ChartInterval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "1m" => Ok(ChartInterval::OneMinute),
            "5m" => Ok(ChartInterval::FiveMinutes),
            "15m" => Ok(ChartInterval::FifteenMinutes),
            "30m" => Ok(ChartInterval::ThirtyMinutes),
            "1h" | "60m" => Ok(ChartInterval::OneHour),
            "1d" => Ok(ChartInterval::OneDay),
            "1w" | "1wk" => Ok(ChartInterval::OneWeek),
            _ => Err(anyhow!(
                "Invalid interval: '{}'. Valid values: 1m, 5m, 15m, 30m, 1h, 1d, 1wk",
                s
            )),
        }
    }
}

/// Statistics for one acquisition run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchStats {
    /// Total API requests made
    pub total_requests: u64,
    /// Records returned by the source
    pub total_records: u64,
    /// Units of work (tickers, communities) that failed and were skipped
    pub failed_units: u64,
    /// Records dropped as incomplete
    pub incomplete_skipped: u64,
    /// Records dropped as duplicates
    pub duplicates_skipped: u64,
}

impl FetchStats {
    /// Creates a new stats tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Records: {}, Requests: {}, Failed units: {}, Incomplete: {}, Duplicates: {}",
            self.total_records,
            self.total_requests,
            self.failed_units,
            self.incomplete_skipped,
            self.duplicates_skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_round_trips_through_api_string() {
        assert_eq!(ChartInterval::from_str("1h").unwrap(), ChartInterval::OneHour);
        assert_eq!(ChartInterval::from_str("60m").unwrap().as_str(), "1h");
        assert_eq!(ChartInterval::from_str("1W").unwrap().as_str(), "1wk");
    }

    #[test]
    fn test_interval_from_str_invalid() {
        let result = ChartInterval::from_str("3h");
        assert!(result.unwrap_err().to_string().contains("Invalid interval"));
    }

    #[test]
    fn test_fetch_stats_summary() {
        let stats = FetchStats {
            total_requests: 3,
            total_records: 250,
            failed_units: 1,
            incomplete_skipped: 2,
            duplicates_skipped: 7,
        };

        let summary = stats.summary();
        assert!(summary.contains("Records: 250"));
        assert!(summary.contains("Failed units: 1"));
        assert!(summary.contains("Duplicates: 7"));
    }
}
