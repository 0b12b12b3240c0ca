use crate::config::PipelineConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the pipeline TOML file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Pipeline.toml";

/// Prefix for environment overrides, e.g. `CRYPTOSENT_SWEEP__MIN_OBSERVATIONS=80`.
pub const ENV_PREFIX: &str = "CRYPTOSENT_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the pipeline configuration from the default file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged config is invalid.
    pub fn load() -> Result<PipelineConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads the pipeline configuration by merging built-in defaults, the TOML
    /// file at `path` (skipped when absent), and `CRYPTOSENT_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged config is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<PipelineConfig> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config file at {}, using defaults", path.display());
        }

        let config: PipelineConfig = Self::figment(path).extract()?;
        config.validate()?;

        Ok(config)
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(PipelineConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn load_without_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::load_from("missing.toml").expect("defaults");
            assert_eq!(config.sweep.price_horizons, vec![1, 4, 6, 12, 24, 72, 168]);
            assert_eq!(config.acquisition.subreddits.len(), 3);
            Ok(())
        });
    }

    #[test]
    fn toml_file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "Pipeline.toml",
                r#"
                [sweep]
                price_horizons = [1, 24]
                sentiment_windows = [6]
                lags = [0, 2]
                min_observations = 80
                significance_level = 0.01
                top_n = 3

                [[assets]]
                symbol = "SOL"
                ticker = "SOL-USD"
                keywords = ["solana", "sol"]
                "#,
            )?;

            let config = ConfigLoader::load_from("Pipeline.toml").expect("config");
            assert_eq!(config.sweep.price_horizons, vec![1, 24]);
            assert_eq!(config.sweep.min_observations, 80);
            assert_eq!(config.symbols(), vec!["SOL"]);
            assert_eq!(config.paths.raw_dir.to_str(), Some("data/raw"));
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("Pipeline.toml", "[sweep]\nmin_observations = 80\n")?;
            jail.set_env("CRYPTOSENT_SWEEP__MIN_OBSERVATIONS", "120");

            let config = ConfigLoader::load_from("Pipeline.toml").expect("config");
            assert_eq!(config.sweep.min_observations, 120);
            Ok(())
        });
    }

    #[test]
    fn invalid_merged_config_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("Pipeline.toml", "[sweep]\nsentiment_windows = [0]\n")?;
            assert!(ConfigLoader::load_from("Pipeline.toml").is_err());
            Ok(())
        });
    }
}
