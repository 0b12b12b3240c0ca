//! Error taxonomy for pipeline stages.
//!
//! Stages report most of these as skips rather than aborting the run; only
//! configuration errors propagate to the entry point.

use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds a pipeline stage can hit.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input file does not exist.
    #[error("input file not found: {}", path.display())]
    MissingInput {
        /// Path that was expected.
        path: PathBuf,
    },

    /// Filtering or joining removed every row.
    #[error("{stage} produced no rows")]
    EmptyResult {
        /// Stage or sub-step that came up empty.
        stage: String,
    },

    /// An external data source failed for one unit of work.
    #[error("source failure for {unit}: {message}")]
    Source {
        /// Ticker or community that failed.
        unit: String,
        /// Underlying failure description.
        message: String,
    },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required credential environment variable is absent.
    #[error("missing credential environment variable: {0}")]
    MissingCredential(String),
}

impl PipelineError {
    /// Returns true for errors that must abort the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::MissingCredential(_))
    }
}

/// Result of running one stage that did not fail fatally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage wrote its output.
    Completed,
    /// The stage was skipped; no output was written.
    Skipped(String),
}

impl StageOutcome {
    #[must_use]
    pub fn skipped(reason: impl std::fmt::Display) -> Self {
        Self::Skipped(reason.to_string())
    }

    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}
