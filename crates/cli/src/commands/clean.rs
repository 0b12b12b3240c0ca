//! Clean stage.
//!
//! Filters the raw posts and repairs every asset's raw bar series into a
//! validated, gap-free hourly series.

use anyhow::Result;

use cryptosent_core::{AssetConfig, PipelineConfig, PipelineError, StageOutcome};
use cryptosent_data::{MarketCleaner, ParquetStorage, PostCleaner};

/// Runs the clean stage. A missing or unreadable input skips only its own
/// sub-step; the remaining units are still cleaned.
///
/// # Errors
/// Sub-step failures are logged, not returned.
pub fn run_clean(config: &PipelineConfig) -> Result<StageOutcome> {
    let mut written = 0usize;

    tracing::info!("Sub-step: cleaning posts");
    match clean_posts(config) {
        Ok(true) => written += 1,
        Ok(false) => {}
        Err(e) => tracing::error!("Post cleaning failed: {:#}", e),
    }

    for asset in &config.assets {
        tracing::info!("Sub-step: cleaning {} market data", asset.symbol);
        match clean_market(config, asset) {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => tracing::error!("{} market cleaning failed: {:#}", asset.symbol, e),
        }
    }

    if written == 0 {
        return Ok(StageOutcome::skipped("no cleaned output written"));
    }
    Ok(StageOutcome::Completed)
}

fn clean_posts(config: &PipelineConfig) -> Result<bool> {
    let input = config.paths.raw_posts_path();
    if !input.exists() {
        tracing::warn!("{}", PipelineError::MissingInput { path: input });
        return Ok(false);
    }

    let raw = ParquetStorage::read_posts(&input)?;
    let (cleaned, report) = PostCleaner::new().clean(raw);
    tracing::info!("Post cleaning: {}", report.summary());

    if cleaned.is_empty() {
        tracing::warn!(
            "{}",
            PipelineError::EmptyResult {
                stage: "post cleaning".to_string()
            }
        );
        return Ok(false);
    }

    let output = config.paths.cleaned_posts_path();
    ParquetStorage::write_posts(&output, &cleaned)?;
    tracing::info!("Saved {} cleaned posts to {}", cleaned.len(), output.display());
    Ok(true)
}

fn clean_market(config: &PipelineConfig, asset: &AssetConfig) -> Result<bool> {
    let input = config.paths.raw_market_path(&asset.ticker);
    if !input.exists() {
        tracing::warn!("{}", PipelineError::MissingInput { path: input });
        return Ok(false);
    }

    let raw = ParquetStorage::read_bars(&input)?;
    let (cleaned, report) = MarketCleaner::new().clean(raw);
    tracing::info!("{} cleaning: {}", asset.symbol, report.summary());
    if report.zero_volume_rows > 0 {
        tracing::warn!("{} has {} zero-volume hours", asset.symbol, report.zero_volume_rows);
    }

    if cleaned.is_empty() {
        tracing::warn!(
            "{}",
            PipelineError::EmptyResult {
                stage: format!("{} market cleaning", asset.symbol)
            }
        );
        return Ok(false);
    }

    let output = config.paths.cleaned_market_path(&asset.symbol);
    ParquetStorage::write_bars(&output, &cleaned)?;
    tracing::info!("Saved {} cleaned bars to {}", cleaned.len(), output.display());
    Ok(true)
}
