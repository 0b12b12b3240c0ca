//! Acquire stage.
//!
//! Fetches hourly bars for every configured asset and recent posts from every
//! configured community, tags the posts with the asset symbols they mention,
//! and writes the raw Parquet files.

use anyhow::Result;
use chrono::{Duration, Utc};
use std::str::FromStr;

use cryptosent_core::{PipelineConfig, PipelineError, StageOutcome};
use cryptosent_data::ParquetStorage;
use cryptosent_signals::{tag_posts, ChartInterval, MarketDataSource, PostSource};

/// Counts collected over one acquire run.
#[derive(Debug, Default, Clone)]
pub struct AcquireStats {
    /// Tickers whose bars were written
    pub tickers_written: usize,
    /// Tickers that failed or returned nothing
    pub tickers_skipped: usize,
    /// Posts written after tagging
    pub posts_written: usize,
    /// Posts dropped for mentioning no tracked asset
    pub posts_untagged: usize,
}

impl AcquireStats {
    /// Formats a summary report.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Tickers: {} written, {} skipped; Posts: {} written, {} untagged",
            self.tickers_written, self.tickers_skipped, self.posts_written, self.posts_untagged
        )
    }
}

/// Runs the acquire stage. `posts` is `None` when no credentials are
/// available, in which case the post sub-step is skipped.
///
/// # Errors
/// Returns an error if the configured interval is invalid or a file cannot
/// be written. Source failures are logged and skipped per unit.
pub async fn run_acquire(
    config: &PipelineConfig,
    market: &dyn MarketDataSource,
    posts: Option<&dyn PostSource>,
) -> Result<StageOutcome> {
    let interval = ChartInterval::from_str(&config.acquisition.interval)
        .map_err(|e| PipelineError::Config(e.to_string()))?;
    let end = Utc::now();
    let start = end - Duration::days(config.acquisition.days_of_data);
    let mut stats = AcquireStats::default();

    tracing::info!("Sub-step: fetching market data ({} to {})", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"));
    for asset in &config.assets {
        match market.fetch_bars(&asset.ticker, start, end, interval).await {
            Ok(bars) if bars.is_empty() => {
                tracing::warn!("No market data returned for {}, skipping", asset.ticker);
                stats.tickers_skipped += 1;
            }
            Ok(bars) => {
                let path = config.paths.raw_market_path(&asset.ticker);
                ParquetStorage::write_bars(&path, &bars)?;
                tracing::info!("Saved {} bars for {} to {}", bars.len(), asset.ticker, path.display());
                stats.tickers_written += 1;
            }
            Err(e) => {
                let err = PipelineError::Source {
                    unit: asset.ticker.clone(),
                    message: format!("{e:#}"),
                };
                tracing::error!("{}", err);
                stats.tickers_skipped += 1;
            }
        }
    }

    tracing::info!("Sub-step: fetching discussion posts");
    match posts {
        None => tracing::warn!("Reddit credentials not configured, skipping post acquisition"),
        Some(source) => {
            fetch_posts(config, source, &mut stats).await?;
        }
    }

    tracing::info!("Acquire summary: {}", stats.summary());
    if stats.tickers_written == 0 && stats.posts_written == 0 {
        return Ok(StageOutcome::skipped("no data acquired"));
    }
    Ok(StageOutcome::Completed)
}

async fn fetch_posts(
    config: &PipelineConfig,
    source: &dyn PostSource,
    stats: &mut AcquireStats,
) -> Result<()> {
    let acquisition = &config.acquisition;
    let (raw, fetch_stats) = match source
        .fetch_posts(&acquisition.subreddits, acquisition.post_limit_per_sub)
        .await
    {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Post source unavailable: {:#}", e);
            return Ok(());
        }
    };
    tracing::info!("Fetched posts: {}", fetch_stats.summary());

    let (tagged, untagged) = tag_posts(raw, &config.keyword_map());
    stats.posts_untagged = untagged;
    if tagged.is_empty() {
        tracing::warn!("No posts mention a tracked asset; nothing written");
        return Ok(());
    }

    let path = config.paths.raw_posts_path();
    ParquetStorage::write_posts(&path, &tagged)?;
    tracing::info!("Saved {} tagged posts to {}", tagged.len(), path.display());
    stats.posts_written = tagged.len();
    Ok(())
}
