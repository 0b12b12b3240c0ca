use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Root configuration, built once at process start and passed by reference
/// into every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub assets: Vec<AssetConfig>,
    pub acquisition: AcquisitionConfig,
    pub paths: PathsConfig,
    pub sweep: SweepConfig,
    pub model: ModelConfig,
    pub sources: SourcesConfig,
}

/// One tracked asset: its symbol, the market-data ticker, and the keywords
/// that tag a post as discussing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    pub symbol: String,
    pub ticker: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    pub subreddits: Vec<String>,
    pub post_limit_per_sub: usize,
    pub days_of_data: i64,
    /// Market data interval, e.g. "1h"
    pub interval: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub results_dir: PathBuf,
}

/// Grid and thresholds for the correlation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Future return horizons, in hours
    pub price_horizons: Vec<usize>,
    /// Trailing sentiment windows, in hours
    pub sentiment_windows: Vec<usize>,
    /// Feature lags, in hours
    pub lags: Vec<usize>,
    /// Grid points with fewer paired observations produce no result row
    pub min_observations: usize,
    /// Pearson p-value cutoff for the top-significant view
    pub significance_level: f64,
    /// Rows of the top-significant view echoed to the log
    pub top_n: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub min_samples: usize,
    pub folds: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub yahoo_base_url: String,
    pub reddit_auth_url: String,
    pub reddit_api_url: String,
    pub requests_per_second: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            assets: vec![
                AssetConfig {
                    symbol: "BTC".to_string(),
                    ticker: "BTC-USD".to_string(),
                    keywords: vec!["bitcoin".to_string(), "btc".to_string()],
                },
                AssetConfig {
                    symbol: "ETH".to_string(),
                    ticker: "ETH-USD".to_string(),
                    keywords: vec![
                        "ethereum".to_string(),
                        "eth".to_string(),
                        "ether".to_string(),
                    ],
                },
            ],
            acquisition: AcquisitionConfig {
                subreddits: vec![
                    "CryptoCurrency".to_string(),
                    "Bitcoin".to_string(),
                    "ethereum".to_string(),
                ],
                post_limit_per_sub: 1000,
                days_of_data: 365,
                interval: "1h".to_string(),
            },
            paths: PathsConfig {
                raw_dir: PathBuf::from("data/raw"),
                processed_dir: PathBuf::from("data/processed"),
                results_dir: PathBuf::from("results"),
            },
            sweep: SweepConfig::default(),
            model: ModelConfig {
                min_samples: 200,
                folds: 5,
                learning_rate: 0.1,
                epochs: 500,
                l2: 1.0,
            },
            sources: SourcesConfig {
                yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
                reddit_auth_url: "https://www.reddit.com".to_string(),
                reddit_api_url: "https://oauth.reddit.com".to_string(),
                requests_per_second: 2,
            },
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            price_horizons: vec![1, 4, 6, 12, 24, 72, 168],
            sentiment_windows: vec![1, 4, 6, 12, 24, 72, 168],
            lags: vec![0, 1, 2, 4, 6, 12],
            min_observations: 50,
            significance_level: 0.05,
            top_n: 5,
        }
    }
}

impl PipelineConfig {
    /// Checks invariants the stages rely on.
    ///
    /// # Errors
    /// Returns `PipelineError::Config` describing the first violation found.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.assets.is_empty() {
            return Err(PipelineError::Config("at least one asset is required".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for asset in &self.assets {
            if asset.symbol.trim().is_empty() {
                return Err(PipelineError::Config("asset symbol must not be empty".into()));
            }
            if !seen.insert(asset.symbol.to_lowercase()) {
                return Err(PipelineError::Config(format!(
                    "duplicate asset symbol: {}",
                    asset.symbol
                )));
            }
            if asset.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(PipelineError::Config(format!(
                    "asset {} has an empty keyword",
                    asset.symbol
                )));
            }
        }

        let sweep = &self.sweep;
        if sweep.price_horizons.is_empty()
            || sweep.sentiment_windows.is_empty()
            || sweep.lags.is_empty()
        {
            return Err(PipelineError::Config("sweep grid dimensions must not be empty".into()));
        }
        if sweep.price_horizons.contains(&0) {
            return Err(PipelineError::Config("price horizons must be positive".into()));
        }
        if sweep.sentiment_windows.contains(&0) {
            return Err(PipelineError::Config("sentiment windows must be positive".into()));
        }
        if !(0.0..=1.0).contains(&sweep.significance_level) {
            return Err(PipelineError::Config(format!(
                "significance level out of range: {}",
                sweep.significance_level
            )));
        }
        if self.model.folds < 2 {
            return Err(PipelineError::Config("model folds must be at least 2".into()));
        }
        if self.sources.requests_per_second == 0 {
            return Err(PipelineError::Config("requests_per_second must be > 0".into()));
        }

        Ok(())
    }

    /// Keyword map in insertion (config) order.
    #[must_use]
    pub fn keyword_map(&self) -> Vec<(String, Vec<String>)> {
        self.assets
            .iter()
            .map(|a| (a.symbol.clone(), a.keywords.clone()))
            .collect()
    }

    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    #[must_use]
    pub fn asset(&self, symbol: &str) -> Option<&AssetConfig> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol))
    }
}

impl PathsConfig {
    /// Raw bars for a ticker, e.g. `BTC-USD` -> `btc_usd_market_data.parquet`.
    #[must_use]
    pub fn raw_market_path(&self, ticker: &str) -> PathBuf {
        self.raw_dir.join(format!(
            "{}_market_data.parquet",
            ticker.replace('-', "_").to_lowercase()
        ))
    }

    #[must_use]
    pub fn raw_posts_path(&self) -> PathBuf {
        self.raw_dir.join("raw_reddit_data.parquet")
    }

    #[must_use]
    pub fn cleaned_posts_path(&self) -> PathBuf {
        self.processed_dir.join("cleaned_reddit_data.parquet")
    }

    #[must_use]
    pub fn cleaned_market_path(&self, symbol: &str) -> PathBuf {
        self.processed_dir
            .join(format!("cleaned_{}_market_data.parquet", symbol.to_lowercase()))
    }

    #[must_use]
    pub fn sentiment_path(&self) -> PathBuf {
        self.processed_dir.join("sentiment_data.parquet")
    }

    #[must_use]
    pub fn master_path(&self) -> PathBuf {
        self.processed_dir.join("master_data.parquet")
    }

    #[must_use]
    pub fn correlation_results_path(&self) -> PathBuf {
        self.results_dir.join("correlation_results.csv")
    }

    #[must_use]
    pub fn top_correlations_path(&self) -> PathBuf {
        self.results_dir.join("top_significant_correlations.csv")
    }

    #[must_use]
    pub fn sweep_report_path(&self) -> PathBuf {
        self.results_dir.join("sweep_report.json")
    }

    #[must_use]
    pub fn prediction_results_path(&self, symbol: &str) -> PathBuf {
        self.results_dir
            .join(format!("prediction_results_{}.csv", symbol.to_lowercase()))
    }

    #[must_use]
    pub fn prediction_summary_path(&self, symbol: &str) -> PathBuf {
        self.results_dir
            .join(format!("prediction_summary_{}.csv", symbol.to_lowercase()))
    }

    #[must_use]
    pub fn coefficients_path(&self, symbol: &str) -> PathBuf {
        self.results_dir
            .join(format!("coefficients_{}.csv", symbol.to_lowercase()))
    }

    #[must_use]
    pub fn model_artifact_path(&self, symbol: &str) -> PathBuf {
        self.results_dir
            .join(format!("model_artifact_{}.json", symbol.to_lowercase()))
    }

    /// Rebases every directory under `root`. Used to run stages against
    /// scratch directories.
    #[must_use]
    pub fn rooted_at(&self, root: &Path) -> Self {
        Self {
            raw_dir: root.join(&self.raw_dir),
            processed_dir: root.join(&self.processed_dir),
            results_dir: root.join(&self.results_dir),
        }
    }
}

/// Reddit API credentials. Never part of the file config; read from the
/// environment only.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("user_agent", &self.user_agent)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl RedditCredentials {
    pub const CLIENT_ID_VAR: &'static str = "REDDIT_CLIENT_ID";
    pub const CLIENT_SECRET_VAR: &'static str = "REDDIT_CLIENT_SECRET";
    pub const USER_AGENT_VAR: &'static str = "REDDIT_USER_AGENT";
    pub const USERNAME_VAR: &'static str = "REDDIT_USERNAME";
    pub const PASSWORD_VAR: &'static str = "REDDIT_PASSWORD";

    /// Reads credentials from the process environment, loading `.env` first
    /// if one exists.
    ///
    /// # Errors
    /// Returns `PipelineError::MissingCredential` naming the first absent
    /// or empty variable.
    pub fn from_env() -> Result<Self, PipelineError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `PipelineError::MissingCredential` naming the first absent
    /// or empty variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PipelineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| PipelineError::MissingCredential(key.to_string()))
        };

        Ok(Self {
            client_id: get(Self::CLIENT_ID_VAR)?,
            client_secret: get(Self::CLIENT_SECRET_VAR)?,
            user_agent: get(Self::USER_AGENT_VAR)?,
            username: get(Self::USERNAME_VAR)?,
            password: get(Self::PASSWORD_VAR)?,
        })
    }
}
