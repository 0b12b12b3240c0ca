//! Analyze stage.
//!
//! Runs the correlation sweep over the master hourly table and writes the
//! full result table plus the top-significant view.

use anyhow::{Context, Result};
use std::fs;

use cryptosent_core::{PipelineConfig, PipelineError, StageOutcome};
use cryptosent_data::{CsvStorage, ParquetStorage};
use cryptosent_signals::{CorrelationSweep, SweepReport};

/// Runs the analyze stage.
///
/// # Errors
/// Returns an error if the master table is unreadable or a result file
/// cannot be written.
pub fn run_analyze(config: &PipelineConfig) -> Result<StageOutcome> {
    let input = config.paths.master_path();
    if !input.exists() {
        let err = PipelineError::MissingInput { path: input };
        tracing::warn!("{}", err);
        return Ok(StageOutcome::skipped(err));
    }

    let table = ParquetStorage::read_master(&input)?;
    tracing::info!(
        "Sweeping {} assets over {} hours",
        table.symbols().len(),
        table.len()
    );

    let sweep = CorrelationSweep::new(&config.sweep);
    let (results, stats) = sweep.run_symbols(&table, &config.symbols());
    tracing::info!("Sweep: {}", stats.summary());

    if results.is_empty() {
        tracing::warn!(
            "No grid point reached {} paired observations; nothing written",
            config.sweep.min_observations
        );
        return Ok(StageOutcome::skipped(PipelineError::EmptyResult {
            stage: "correlation sweep".to_string(),
        }));
    }

    let output = config.paths.correlation_results_path();
    CsvStorage::write_correlations(&output, &results)?;
    tracing::info!("Saved {} correlation results to {}", results.len(), output.display());

    let report = SweepReport::generate(&results, &stats, config.sweep.significance_level);
    let top_path = config.paths.top_correlations_path();
    CsvStorage::write_correlations(&top_path, &report.top)?;
    tracing::info!(
        "Saved {} significant correlations to {}",
        report.top.len(),
        top_path.display()
    );

    for symbol in config.symbols() {
        match report.best_for(&symbol) {
            Some(best) => tracing::info!(
                "{}: strongest H={} W={} L={} r={:.4} p={:.2e}",
                symbol,
                best.price_horizon_hours,
                best.sentiment_window_hours,
                best.lag_hours,
                best.pearson_r,
                best.pearson_p
            ),
            None => tracing::info!("{}: no significant correlation", symbol),
        }
    }

    let report_path = config.paths.sweep_report_path();
    fs::write(&report_path, report.to_json()?)
        .with_context(|| format!("Failed to write {}", report_path.display()))?;

    println!("{}", report.to_text(config.sweep.top_n));
    Ok(StageOutcome::Completed)
}
