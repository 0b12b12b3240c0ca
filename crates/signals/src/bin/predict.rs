//! Trains and cross-validates the directional model for one asset at one
//! (horizon, window, lag) grid point, reading the master hourly table.

use anyhow::Result;
use clap::Parser;

use cryptosent_core::{ConfigLoader, DEFAULT_CONFIG_PATH};
use cryptosent_data::ParquetStorage;
use cryptosent_signals::PredictiveModel;

#[derive(Parser, Debug)]
#[command(name = "cryptosent-predict")]
#[command(about = "Predict price direction from lagged sentiment", long_about = None)]
struct Args {
    /// Asset symbol (e.g., "BTC")
    #[arg(long, default_value = "BTC")]
    symbol: String,

    /// Prediction horizon in hours
    #[arg(long, default_value = "24")]
    horizon: usize,

    /// Sentiment rolling window in hours
    #[arg(long, default_value = "12")]
    window: usize,

    /// Feature lag in hours
    #[arg(long, default_value = "1")]
    lag: usize,

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

    let args = Args::parse();
    let config = ConfigLoader::load_from(&args.config)?;

    if args.horizon == 0 || args.window == 0 {
        anyhow::bail!("--horizon and --window must be positive");
    }

    let master_path = config.paths.master_path();
    if !master_path.exists() {
        tracing::warn!(
            "Master table not found at {}; run the process stage first",
            master_path.display()
        );
        return Ok(());
    }

    let table = ParquetStorage::read_master(&master_path)?;
    tracing::info!(
        "Predicting {} direction: H={}h W={}h L={}h over {} hours",
        args.symbol,
        args.horizon,
        args.window,
        args.lag,
        table.len()
    );

    let model = PredictiveModel::new(args.horizon, args.window, args.lag, config.model.clone());
    let Some(outcome) = model.evaluate(&table, &args.symbol)? else {
        return Ok(());
    };

    for fold in &outcome.folds {
        tracing::info!(
            "Fold {}: train {} test {} accuracy {:.3} baseline {:.3}",
            fold.fold,
            fold.train_size,
            fold.test_size,
            fold.accuracy,
            fold.baseline_accuracy
        );
    }
    tracing::info!("{}", outcome.summary());
    for row in &outcome.coefficients {
        println!("{:<18} {:>10.4}", row.feature, row.coefficient);
    }

    outcome.save(&config.paths)?;
    Ok(())
}
