//! Time-series unifier: aligns every asset's cleaned bars and the per-post
//! sentiment scores onto one contiguous UTC hourly index.
//!
//! Timezone contract: bars arrive as `DateTime<Utc>`; sentiment timestamps
//! arrive naive and are localized here as UTC wall-clock time. Nothing is
//! joined before both sides are in UTC.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap};

use cryptosent_data::{
    floor_to_hour, MasterRow, MasterTable, OhlcvBar, PricePoint, SentimentAggregate,
    SentimentRecord,
};

/// Counts collected while building the master table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnifyReport {
    pub rows: usize,
    /// (post, symbol) pairs after explosion
    pub exploded_rows: usize,
    /// Exploded rows whose hour falls outside the price index
    pub outside_price_range: usize,
    /// Mentions of symbols that are not tracked
    pub unknown_symbols: usize,
    /// Asset-hours filled from the previous known price
    pub forward_filled: usize,
}

impl UnifyReport {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Rows: {}, Exploded posts: {}, Outside price range: {}, Unknown symbols: {}, Forward-filled: {}",
            self.rows,
            self.exploded_rows,
            self.outside_price_range,
            self.unknown_symbols,
            self.forward_filled
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
}

/// Builds the master hourly table for a fixed, ordered set of symbols.
#[derive(Debug, Clone)]
pub struct TimeSeriesUnifier {
    symbols: Vec<String>,
}

/// Localizes a naive sentiment timestamp, asserting it is UTC wall-clock time.
#[must_use]
pub fn localize_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&naive)
}

impl TimeSeriesUnifier {
    #[must_use]
    pub fn new(symbols: Vec<String>) -> Self {
        Self { symbols }
    }

    fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
    }

    /// Outer-joins the bars of every asset, left-joins hourly sentiment onto
    /// the price index, zero-fills sentiment and forward-fills prices.
    ///
    /// `markets` pairs a symbol with its cleaned bars; unknown symbols are ignored.
    ///
    /// # Errors
    /// Returns an error if no asset has any bar, since there is no index to
    /// align onto.
    pub fn unify(
        &self,
        markets: &[(String, Vec<OhlcvBar>)],
        sentiment: &[SentimentRecord],
    ) -> Result<(MasterTable, UnifyReport)> {
        let mut report = UnifyReport::default();
        let width = self.symbols.len();

        // Outer join of all price series on the hour.
        let mut prices: BTreeMap<DateTime<Utc>, Vec<Option<PricePoint>>> = BTreeMap::new();
        for (symbol, bars) in markets {
            let Some(idx) = self.symbol_index(symbol) else {
                tracing::warn!("Ignoring bars for untracked symbol {}", symbol);
                continue;
            };
            for bar in bars {
                let slot = prices
                    .entry(floor_to_hour(bar.timestamp))
                    .or_insert_with(|| vec![None; width]);
                if slot[idx].is_none() {
                    slot[idx] = Some(PricePoint::from(bar));
                }
            }
        }

        let (Some(&first), Some(&last)) = (prices.keys().next(), prices.keys().next_back()) else {
            return Err(anyhow!("No price data to build the hourly index from"));
        };

        // Explode posts into (symbol, hour) buckets.
        let mut buckets: HashMap<(usize, DateTime<Utc>), Accumulator> = HashMap::new();
        for record in sentiment {
            let hour = floor_to_hour(localize_utc(record.timestamp));
            for symbol in &record.mentioned_symbols {
                let Some(idx) = self.symbol_index(symbol) else {
                    report.unknown_symbols += 1;
                    continue;
                };
                report.exploded_rows += 1;
                if hour < first || hour > last {
                    report.outside_price_range += 1;
                    continue;
                }
                let acc = buckets.entry((idx, hour)).or_default();
                acc.sum += record.sentiment_score;
                acc.count += 1;
            }
        }

        let mut rows = Vec::new();
        let mut carried: Vec<Option<PricePoint>> = vec![None; width];
        let mut hour = first;
        while hour <= last {
            let observed = prices.get(&hour);
            let row_prices: Vec<Option<PricePoint>> = (0..width)
                .map(|idx| {
                    match observed.and_then(|p| p[idx]) {
                        Some(point) => carried[idx] = Some(point),
                        None if carried[idx].is_some() => report.forward_filled += 1,
                        None => {}
                    }
                    carried[idx]
                })
                .collect();

            let row_sentiment: Vec<SentimentAggregate> = (0..width)
                .map(|idx| match buckets.get(&(idx, hour)) {
                    Some(acc) if acc.count > 0 => SentimentAggregate {
                        mean_sentiment: acc.sum / acc.count as f64,
                        post_count: acc.count,
                    },
                    _ => SentimentAggregate::default(),
                })
                .collect();

            rows.push(MasterRow {
                timestamp: hour,
                prices: row_prices,
                sentiment: row_sentiment,
            });
            hour += Duration::hours(1);
        }

        report.rows = rows.len();
        Ok((MasterTable::new(self.symbols.clone(), rows), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() + Duration::hours(hour)
    }

    fn bar(hour: i64, close: f64) -> OhlcvBar {
        OhlcvBar::new(t(hour), close, close, close, close, 1.0)
    }

    fn record(id: &str, hour: i64, minute: i64, symbols: &[&str], score: f64) -> SentimentRecord {
        SentimentRecord {
            id: id.to_string(),
            timestamp: (t(hour) + Duration::minutes(minute)).naive_utc(),
            mentioned_symbols: symbols.iter().map(|s| s.to_string()).collect(),
            sentiment_score: score,
        }
    }

    #[test]
    fn aligns_sparse_sentiment_onto_price_hours() {
        let bars: Vec<OhlcvBar> = (0..=10).map(|h| bar(h, 100.0 + h as f64)).collect();
        let sentiment = vec![
            record("a", 2, 5, &["BTC"], 0.5),
            record("b", 2, 40, &["BTC"], -0.1),
            record("c", 7, 0, &["BTC"], 0.8),
        ];

        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string()]);
        let (table, report) = unifier
            .unify(&[("BTC".to_string(), bars)], &sentiment)
            .unwrap();

        assert_eq!(table.len(), 11);
        assert_eq!(report.rows, 11);
        let means = table.sentiment_series("BTC").unwrap();
        let counts = table.post_count_series("BTC").unwrap();
        for (h, (&mean, &count)) in means.iter().zip(&counts).enumerate() {
            match h {
                2 => {
                    assert!((mean - 0.2).abs() < 1e-12);
                    assert_eq!(count, 2);
                }
                7 => {
                    assert_eq!(mean, 0.8);
                    assert_eq!(count, 1);
                }
                _ => {
                    assert_eq!(mean, 0.0);
                    assert_eq!(count, 0);
                }
            }
        }
        assert!(table.close_series("BTC").unwrap().iter().all(Option::is_some));
    }

    #[test]
    fn multi_symbol_posts_count_toward_each_asset() {
        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string(), "ETH".to_string()]);
        let markets = vec![
            ("BTC".to_string(), vec![bar(0, 1.0), bar(1, 2.0)]),
            ("ETH".to_string(), vec![bar(0, 3.0), bar(1, 4.0)]),
        ];
        let (table, report) = unifier
            .unify(&markets, &[record("a", 1, 0, &["BTC", "ETH", "DOGE"], 0.3)])
            .unwrap();

        assert_eq!(report.exploded_rows, 2);
        assert_eq!(report.unknown_symbols, 1);
        assert_eq!(table.post_count_series("BTC").unwrap(), vec![0, 1]);
        assert_eq!(table.post_count_series("ETH").unwrap(), vec![0, 1]);
    }

    #[test]
    fn outer_join_keeps_non_overlapping_history_and_forward_fills() {
        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string(), "ETH".to_string()]);
        let markets = vec![
            ("BTC".to_string(), vec![bar(0, 10.0), bar(1, 11.0), bar(4, 14.0)]),
            ("ETH".to_string(), vec![bar(2, 20.0), bar(3, 21.0)]),
        ];
        let (table, report) = unifier.unify(&markets, &[]).unwrap();

        assert_eq!(table.len(), 5);
        assert_eq!(
            table.close_series("BTC").unwrap(),
            vec![Some(10.0), Some(11.0), Some(11.0), Some(11.0), Some(14.0)]
        );
        assert_eq!(
            table.close_series("ETH").unwrap(),
            vec![None, None, Some(20.0), Some(21.0), Some(21.0)]
        );
        assert_eq!(report.forward_filled, 3);
    }

    #[test]
    fn posts_outside_price_range_are_dropped() {
        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string()]);
        let (table, report) = unifier
            .unify(
                &[("BTC".to_string(), vec![bar(5, 1.0), bar(6, 1.0)])],
                &[record("early", 1, 0, &["BTC"], 0.9), record("in", 6, 30, &["btc"], 0.4)],
            )
            .unwrap();

        assert_eq!(report.outside_price_range, 1);
        assert_eq!(table.sentiment_series("BTC").unwrap(), vec![0.0, 0.4]);
    }

    #[test]
    fn no_prices_is_an_error() {
        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string()]);
        assert!(unifier.unify(&[("BTC".to_string(), Vec::new())], &[]).is_err());
    }

    #[test]
    fn index_is_contiguous_and_unique() {
        let unifier = TimeSeriesUnifier::new(vec!["BTC".to_string()]);
        let (table, _) = unifier
            .unify(&[("BTC".to_string(), vec![bar(0, 1.0), bar(9, 2.0)])], &[])
            .unwrap();

        let stamps = table.timestamps();
        assert_eq!(stamps.len(), 10);
        for pair in stamps.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::hours(1));
        }
    }
}
