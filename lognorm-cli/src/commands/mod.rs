//! Command handlers -- one module per subcommand

pub mod config;
pub mod normalize;
pub mod rules;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lognorm_core::config::LognormConfig;
use lognorm_normalizer::{NoopGeoLocator, NormalizerPool};

use crate::error::CliError;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "lognorm.toml";

/// Where the effective configuration comes from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    /// Explicit or discovered config file. `None` means defaults + env only.
    pub path: Option<PathBuf>,
    /// `--rules` directories overriding `normalizer.paths`.
    pub rules: Vec<PathBuf>,
}

impl ConfigSource {
    pub fn new(explicit: Option<PathBuf>, rules: Vec<PathBuf>) -> Self {
        let path = explicit.or_else(|| {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            default.exists().then(|| default.to_path_buf())
        });
        Self { path, rules }
    }

    /// Human-readable origin for reports.
    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "(defaults)".to_owned(),
        }
    }

    /// Load the effective configuration.
    pub async fn load(&self) -> Result<LognormConfig, CliError> {
        let mut config = match &self.path {
            Some(path) => LognormConfig::from_file(path).await?,
            None => LognormConfig::default(),
        };
        config.apply_env_overrides();
        if !self.rules.is_empty() {
            config.normalizer.paths = self
                .rules
                .iter()
                .map(|p| p.display().to_string())
                .collect();
        }
        config.validate()?;
        Ok(config)
    }
}

/// Build a normalizer pool from the effective configuration.
pub async fn build_pool(config: &LognormConfig) -> Result<NormalizerPool, CliError> {
    tracing::info!(paths = ?config.normalizer.paths, "loading rule sets");
    let pool = NormalizerPool::from_config(&config.normalizer, Arc::new(NoopGeoLocator)).await?;
    Ok(pool)
}
