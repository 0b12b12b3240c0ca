pub mod config;
pub mod config_loader;
pub mod error;

pub use config::{
    AcquisitionConfig, AssetConfig, ModelConfig, PathsConfig, PipelineConfig, RedditCredentials,
    SourcesConfig, SweepConfig,
};
pub use config_loader::{ConfigLoader, DEFAULT_CONFIG_PATH, ENV_PREFIX};
pub use error::{PipelineError, StageOutcome};
