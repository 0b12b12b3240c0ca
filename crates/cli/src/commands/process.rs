//! Process stage.
//!
//! Scores every cleaned post, then aligns the cleaned bars and the per-post
//! scores into the master hourly table.

use anyhow::Result;

use cryptosent_core::{PipelineConfig, PipelineError, StageOutcome};
use cryptosent_data::ParquetStorage;
use cryptosent_signals::{score_posts, LexiconScorer, SentimentScorer, TimeSeriesUnifier};

/// Runs the process stage with the default lexicon scorer.
///
/// # Errors
/// Returns an error if an input file is unreadable or an output cannot be written.
pub fn run_process(config: &PipelineConfig) -> Result<StageOutcome> {
    run_process_with(config, &LexiconScorer::new())
}

/// Runs the process stage with the given scorer.
///
/// # Errors
/// Returns an error if an input file is unreadable or an output cannot be written.
pub fn run_process_with(config: &PipelineConfig, scorer: &dyn SentimentScorer) -> Result<StageOutcome> {
    tracing::info!("Sub-step: scoring sentiment");
    if let Err(e) = score_sentiment(config, scorer) {
        tracing::error!("Sentiment scoring failed: {:#}", e);
    }

    tracing::info!("Sub-step: unifying data");
    unify(config)
}

fn score_sentiment(config: &PipelineConfig, scorer: &dyn SentimentScorer) -> Result<()> {
    let input = config.paths.cleaned_posts_path();
    if !input.exists() {
        tracing::warn!("{}", PipelineError::MissingInput { path: input });
        return Ok(());
    }

    let posts = ParquetStorage::read_posts(&input)?;
    let scored = score_posts(scorer, posts);
    if scored.is_empty() {
        tracing::warn!(
            "{}",
            PipelineError::EmptyResult {
                stage: "sentiment scoring".to_string()
            }
        );
        return Ok(());
    }

    let mean = scored.iter().map(|p| p.sentiment_score).sum::<f64>() / scored.len() as f64;
    let output = config.paths.sentiment_path();
    ParquetStorage::write_scored_posts(&output, &scored)?;
    tracing::info!(
        "Scored {} posts (mean {:.3}), saved to {}",
        scored.len(),
        mean,
        output.display()
    );
    Ok(())
}

fn unify(config: &PipelineConfig) -> Result<StageOutcome> {
    // Every input must be present before anything is read.
    let sentiment_path = config.paths.sentiment_path();
    let mut required = vec![sentiment_path.clone()];
    required.extend(
        config
            .assets
            .iter()
            .map(|a| config.paths.cleaned_market_path(&a.symbol)),
    );
    if let Some(path) = required.into_iter().find(|p| !p.exists()) {
        let err = PipelineError::MissingInput { path };
        tracing::error!("Unification aborted: {}", err);
        return Ok(StageOutcome::skipped(err));
    }

    let sentiment = ParquetStorage::read_sentiment(&sentiment_path)?;
    let mut markets = Vec::with_capacity(config.assets.len());
    for asset in &config.assets {
        let bars = ParquetStorage::read_bars(&config.paths.cleaned_market_path(&asset.symbol))?;
        markets.push((asset.symbol.clone(), bars));
    }

    let unifier = TimeSeriesUnifier::new(config.symbols());
    let (table, report) = match unifier.unify(&markets, &sentiment) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!("Unification produced no table: {:#}", e);
            return Ok(StageOutcome::skipped(PipelineError::EmptyResult {
                stage: "unification".to_string(),
            }));
        }
    };
    tracing::info!("Unification: {}", report.summary());

    let output = config.paths.master_path();
    ParquetStorage::write_master(&output, &table)?;
    tracing::info!(
        "Saved master table ({} hours x {} columns) to {}",
        table.len(),
        table.column_names().len(),
        output.display()
    );
    Ok(StageOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use cryptosent_data::{OhlcvBar, RawPost};

    struct FixedScorer(f64);

    impl SentimentScorer for FixedScorer {
        fn score(&self, _text: &str) -> f64 {
            self.0
        }
    }

    fn config(root: &std::path::Path) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.paths = config.paths.rooted_at(root);
        config
    }

    fn seed_inputs(config: &PipelineConfig) {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        for asset in &config.assets {
            let bars: Vec<OhlcvBar> = (0..6)
                .map(|h| OhlcvBar::new(t0 + Duration::hours(h), 1.0, 2.0, 0.5, 1.5, 1.0))
                .collect();
            ParquetStorage::write_bars(&config.paths.cleaned_market_path(&asset.symbol), &bars)
                .unwrap();
        }

        let post = RawPost {
            id: "p1".to_string(),
            timestamp: t0 + Duration::minutes(150),
            community: "ethereum".to_string(),
            title: "ETH and BTC".to_string(),
            body: Some("good day".to_string()),
            score: 3,
            comment_count: 2,
            mentioned_symbols: vec!["BTC".to_string(), "ETH".to_string()],
        };
        ParquetStorage::write_posts(&config.paths.cleaned_posts_path(), &[post]).unwrap();
    }

    #[test]
    fn builds_master_table_from_cleaned_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        seed_inputs(&config);

        let outcome = run_process_with(&config, &FixedScorer(0.5)).unwrap();
        assert!(outcome.is_completed());

        let table = ParquetStorage::read_master(&config.paths.master_path()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(
            table.sentiment_series("ETH").unwrap(),
            vec![0.0, 0.0, 0.5, 0.0, 0.0, 0.0]
        );
        assert_eq!(table.post_count_series("BTC").unwrap()[2], 1);
    }

    #[test]
    fn missing_market_file_skips_without_master() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        seed_inputs(&config);
        std::fs::remove_file(config.paths.cleaned_market_path("ETH")).unwrap();

        let outcome = run_process_with(&config, &FixedScorer(0.1)).unwrap();

        assert!(!outcome.is_completed());
        assert!(config.paths.sentiment_path().exists());
        assert!(!config.paths.master_path().exists());
    }

    #[test]
    fn unreadable_posts_skip_unification_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        seed_inputs(&config);
        std::fs::write(config.paths.cleaned_posts_path(), b"not parquet").unwrap();

        let outcome = run_process_with(&config, &FixedScorer(0.2)).unwrap();

        assert!(!outcome.is_completed());
        assert!(!config.paths.master_path().exists());
    }

    #[test]
    fn default_scorer_runs_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        seed_inputs(&config);

        assert!(run_process(&config).unwrap().is_completed());
        let records = ParquetStorage::read_sentiment(&config.paths.sentiment_path()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].sentiment_score > 0.0);
    }
}
