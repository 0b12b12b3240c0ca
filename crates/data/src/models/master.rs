//! Master hourly table: price and sentiment for every asset on one UTC index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::OhlcvBar;

/// Price fields of one asset for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl From<&OhlcvBar> for PricePoint {
    fn from(bar: &OhlcvBar) -> Self {
        Self {
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Hourly sentiment aggregate for one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentAggregate {
    pub mean_sentiment: f64,
    pub post_count: u64,
}

/// One hour of the master table. `prices` and `sentiment` are indexed by the
/// owning table's symbol order.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterRow {
    pub timestamp: DateTime<Utc>,
    /// `None` only before an asset's first bar
    pub prices: Vec<Option<PricePoint>>,
    pub sentiment: Vec<SentimentAggregate>,
}

/// Master hourly table keyed by a unique, contiguous UTC hour index.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTable {
    symbols: Vec<String>,
    rows: Vec<MasterRow>,
}

/// Price column suffixes in file order.
pub const PRICE_FIELDS: [&str; 5] = ["open", "high", "low", "close", "volume"];
pub const SENTIMENT_MEAN_SUFFIX: &str = "sentiment_mean";
pub const POST_COUNT_SUFFIX: &str = "post_count";

/// Column name for an asset field, e.g. (`BTC`, `close`) -> `btc_close`.
#[must_use]
pub fn column_name(symbol: &str, field: &str) -> String {
    format!("{}_{}", symbol.to_lowercase(), field)
}

impl MasterTable {
    #[must_use]
    pub fn new(symbols: Vec<String>, rows: Vec<MasterRow>) -> Self {
        Self { symbols, rows }
    }

    #[must_use]
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    #[must_use]
    pub fn rows(&self) -> &[MasterRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of `symbol` in the column order (case-insensitive).
    #[must_use]
    pub fn symbol_index(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .iter()
            .position(|s| s.eq_ignore_ascii_case(symbol))
    }

    #[must_use]
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.rows.iter().map(|r| r.timestamp).collect()
    }

    /// Close price series for `symbol`, `None` where no price is known.
    #[must_use]
    pub fn close_series(&self, symbol: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.symbol_index(symbol)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.prices[idx].map(|p| p.close))
                .collect(),
        )
    }

    /// Hourly mean sentiment series for `symbol` (zero where no posts).
    #[must_use]
    pub fn sentiment_series(&self, symbol: &str) -> Option<Vec<f64>> {
        let idx = self.symbol_index(symbol)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.sentiment[idx].mean_sentiment)
                .collect(),
        )
    }

    /// Post count series for `symbol`.
    #[must_use]
    pub fn post_count_series(&self, symbol: &str) -> Option<Vec<u64>> {
        let idx = self.symbol_index(symbol)?;
        Some(self.rows.iter().map(|r| r.sentiment[idx].post_count).collect())
    }

    /// Column names in file order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        let mut names = vec!["timestamp".to_string()];
        for symbol in &self.symbols {
            for field in PRICE_FIELDS {
                names.push(column_name(symbol, field));
            }
        }
        for symbol in &self.symbols {
            names.push(column_name(symbol, SENTIMENT_MEAN_SUFFIX));
            names.push(column_name(symbol, POST_COUNT_SUFFIX));
        }
        names
    }
}
