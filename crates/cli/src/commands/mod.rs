//! Pipeline stages for the crypto sentiment CLI.

pub mod acquire;
pub mod analyze;
pub mod clean;
pub mod process;

pub use acquire::run_acquire;
pub use analyze::run_analyze;
pub use clean::run_clean;
pub use process::run_process;

use clap::ValueEnum;
use cryptosent_core::PipelineError;
use std::fmt;

/// A named pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Stage {
    /// Fetch market bars and discussion posts
    Acquire,
    /// Clean raw posts and market bars
    Clean,
    /// Score sentiment and build the master hourly table
    Process,
    /// Run the correlation sweep
    Analyze,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 4] = [Stage::Acquire, Stage::Clean, Stage::Process, Stage::Analyze];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Stage::Acquire => "acquire",
            Stage::Clean => "clean",
            Stage::Process => "process",
            Stage::Analyze => "analyze",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stages to run, always in the fixed acquire → clean → process → analyze
/// order. No request means every stage.
#[must_use]
pub fn resolve_stages(requested: &[Stage]) -> Vec<Stage> {
    if requested.is_empty() {
        return Stage::ALL.to_vec();
    }
    Stage::ALL
        .into_iter()
        .filter(|s| requested.contains(s))
        .collect()
}

/// Returns true when a stage error must end the run. Anything that is not a
/// configuration or credential failure is logged and the next stage runs.
#[must_use]
pub fn is_fatal(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<PipelineError>()
        .is_some_and(PipelineError::is_fatal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_configuration_errors_are_fatal() {
        let config = anyhow::Error::new(PipelineError::Config("bad interval".into()));
        assert!(is_fatal(&config));

        let credential = anyhow::Error::new(PipelineError::MissingCredential("REDDIT_CLIENT_ID".into()));
        assert!(is_fatal(&credential.context("acquire")));

        let io = anyhow::anyhow!("Invalid Parquet file. Corrupt footer");
        assert!(!is_fatal(&io));

        let skip = anyhow::Error::new(PipelineError::EmptyResult { stage: "clean".into() });
        assert!(!is_fatal(&skip));
    }

    #[test]
    fn no_request_runs_everything_in_order() {
        assert_eq!(resolve_stages(&[]), Stage::ALL.to_vec());
    }

    #[test]
    fn requested_stages_follow_fixed_order_once() {
        let stages = resolve_stages(&[Stage::Analyze, Stage::Acquire, Stage::Analyze]);
        assert_eq!(stages, vec![Stage::Acquire, Stage::Analyze]);
    }

    #[test]
    fn stage_names_parse_from_cli_values() {
        assert_eq!(Stage::from_str("process", true).unwrap(), Stage::Process);
        assert!(Stage::from_str("deploy", true).is_err());
        assert_eq!(Stage::Clean.to_string(), "clean");
    }
}
