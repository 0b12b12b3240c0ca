//! Market cleaner: repairs one ticker's bars into a validated, gap-free
//! hourly series.

use chrono::Duration;
use tracing::debug;

use crate::models::{floor_to_hour, OhlcvBar};

/// Counts collected while cleaning one series.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MarketCleaningReport {
    /// Bars received
    pub input_rows: usize,
    /// Bars whose timestamp was not on the hour
    pub realigned: usize,
    pub duplicates_removed: usize,
    pub non_positive_close_removed: usize,
    pub invalid_ohlc_removed: usize,
    /// Hours synthesized by forward fill
    pub gaps_filled: usize,
    /// Zero-volume bars in the output (diagnostic only, never removed)
    pub zero_volume_rows: usize,
    pub output_rows: usize,
}

impl MarketCleaningReport {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Input: {}, Realigned: {}, Duplicates: {}, Non-positive close: {}, Invalid OHLC: {}, Gaps filled: {}, Zero volume: {}, Output: {}",
            self.input_rows,
            self.realigned,
            self.duplicates_removed,
            self.non_positive_close_removed,
            self.invalid_ohlc_removed,
            self.gaps_filled,
            self.zero_volume_rows,
            self.output_rows
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MarketCleaner;

impl MarketCleaner {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Cleans a raw bar series.
    ///
    /// Steps: floor to the hour, sort, drop duplicate hours (first wins), drop
    /// `close <= 0`, drop bars violating `low <= open, close <= high`, then
    /// reindex onto the complete hourly range and forward-fill the holes.
    #[must_use]
    pub fn clean(&self, bars: Vec<OhlcvBar>) -> (Vec<OhlcvBar>, MarketCleaningReport) {
        let mut report = MarketCleaningReport {
            input_rows: bars.len(),
            ..MarketCleaningReport::default()
        };

        let mut aligned: Vec<OhlcvBar> = bars
            .into_iter()
            .map(|bar| {
                let hour = floor_to_hour(bar.timestamp);
                if hour != bar.timestamp {
                    report.realigned += 1;
                }
                bar.restamped(hour)
            })
            .collect();
        // Stable sort keeps the original order among equal hours.
        aligned.sort_by_key(|bar| bar.timestamp);

        let before = aligned.len();
        aligned.dedup_by_key(|bar| bar.timestamp);
        report.duplicates_removed = before - aligned.len();

        let before = aligned.len();
        aligned.retain(OhlcvBar::has_positive_close);
        report.non_positive_close_removed = before - aligned.len();

        let before = aligned.len();
        aligned.retain(OhlcvBar::has_valid_range);
        report.invalid_ohlc_removed = before - aligned.len();

        let valid = aligned.len();
        let filled = forward_fill_hours(aligned);
        report.gaps_filled = filled.len() - valid;
        report.zero_volume_rows = filled.iter().filter(|bar| bar.volume == 0.0).count();
        report.output_rows = filled.len();

        debug!("Market cleaning: {}", report.summary());
        (filled, report)
    }
}

/// Reindexes sorted, unique hourly bars onto every hour between the first and
/// last bar, carrying the previous bar forward into each missing hour.
fn forward_fill_hours(bars: Vec<OhlcvBar>) -> Vec<OhlcvBar> {
    let mut out: Vec<OhlcvBar> = Vec::with_capacity(bars.len());
    let one_hour = Duration::hours(1);

    for bar in bars {
        if let Some(prev) = out.last().copied() {
            let mut next = prev.timestamp + one_hour;
            while next < bar.timestamp {
                out.push(prev.restamped(next));
                next += one_hour;
            }
        }
        out.push(bar);
    }

    out
}
