use anyhow::Result;
use clap::Parser;

mod commands;

use commands::{resolve_stages, Stage};
use cryptosent_core::{
    ConfigLoader, PipelineConfig, RedditCredentials, StageOutcome, DEFAULT_CONFIG_PATH,
};
use cryptosent_signals::{PostSource, RedditCollector, YahooChartCollector};

#[derive(Parser)]
#[command(name = "cryptosent")]
#[command(about = "Crypto sentiment and price correlation pipeline", long_about = None)]
struct Cli {
    /// Stages to run (default: all, in order acquire, clean, process, analyze)
    #[arg(value_enum)]
    stages: Vec<Stage>,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::load_from(&cli.config)?;

    // Credentials are only fatal when acquisition was asked for by name.
    let acquire_requested = cli.stages.contains(&Stage::Acquire);
    let stages = resolve_stages(&cli.stages);

    tracing::info!("Starting pipeline: {:?}", stages);
    for stage in stages {
        tracing::info!(">>> Stage: {}", stage);
        let result = match stage {
            Stage::Acquire => run_acquire_stage(&config, acquire_requested).await,
            Stage::Clean => commands::run_clean(&config),
            Stage::Process => commands::run_process(&config),
            Stage::Analyze => commands::run_analyze(&config),
        };
        match result {
            Ok(StageOutcome::Completed) => tracing::info!("Stage {} completed", stage),
            Ok(StageOutcome::Skipped(reason)) => {
                tracing::warn!("Stage {} skipped: {}", stage, reason);
            }
            Err(e) if commands::is_fatal(&e) => return Err(e),
            Err(e) => tracing::error!("Stage {} failed: {:#}", stage, e),
        }
    }

    tracing::info!("Pipeline finished");
    Ok(())
}

async fn run_acquire_stage(config: &PipelineConfig, explicit: bool) -> Result<StageOutcome> {
    let sources = &config.sources;
    let market = YahooChartCollector::with_config(&sources.yahoo_base_url, sources.requests_per_second);

    let reddit = match RedditCredentials::from_env() {
        Ok(credentials) => Some(RedditCollector::with_config(
            credentials,
            &sources.reddit_auth_url,
            &sources.reddit_api_url,
            sources.requests_per_second,
        )),
        Err(e) if explicit => return Err(e.into()),
        Err(e) => {
            tracing::warn!("{}; Reddit acquisition will be skipped", e);
            None
        }
    };

    commands::run_acquire(
        config,
        &market,
        reddit.as_ref().map(|r| r as &dyn PostSource),
    )
    .await
}
