//! Data collectors for the sentiment pipeline.
//!
//! This module provides the two external data sources:
//! - Hourly OHLCV bars from the Yahoo Finance chart API
//! - Discussion posts from Reddit communities
//!
//! Both sit behind async traits so stages can be driven by mocks in tests.

mod reddit_collector;
mod types;
mod yahoo_collector;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cryptosent_data::{OhlcvBar, RawPost};

pub use reddit_collector::{RedditCollector, DEFAULT_PAGE_SIZE};
pub use types::{ChartInterval, FetchStats};
pub use yahoo_collector::{normalize_label, YahooChartCollector};

/// External source of OHLCV bars.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Fetches bars for `ticker` in `[start, end]` at `interval`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the response is malformed.
    async fn fetch_bars(
        &self,
        ticker: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: ChartInterval,
    ) -> Result<Vec<OhlcvBar>>;
}

/// External source of discussion posts.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetches up to `limit` newest posts from each community.
    ///
    /// Each community is a separate unit of work: a failing community is
    /// logged, counted in the stats and skipped. Returned posts are untagged.
    ///
    /// # Errors
    /// Returns an error only when the source cannot be used at all
    /// (e.g. authentication fails).
    async fn fetch_posts(
        &self,
        communities: &[String],
        limit: usize,
    ) -> Result<(Vec<RawPost>, FetchStats)>;
}
