use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::{
    cluster::ClusterConfig,
    observability::ObservabilityConfig,
    remote::{ManagedServiceConfig, RemoteClientConfig},
    runtime::{ExecutorConfig, SchedulerConfig},
};

const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/composer.toml",
    "composer.toml",
    "/etc/composer/config.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cluster: ClusterConfig,
    pub executor: ExecutorConfig,
    pub scheduler: SchedulerConfig,
    pub remote: RemoteClientConfig,
    pub services: Vec<ManagedServiceConfig>,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// Without an explicit path the first existing file of
    /// `config/composer.toml`, `composer.toml`, `/etc/composer/config.toml` is used.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("config file does not exist: {path}"));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if let Some(path) = DEFAULT_CONFIG_PATHS
                    .iter()
                    .find(|path| Path::new(path).exists())
                {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("COMPOSER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("failed to parse TOML config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config to TOML")
    }

    pub fn validate(&self) -> Result<()> {
        self.cluster.validate().context("invalid cluster config")?;
        self.executor.validate().context("invalid executor config")?;
        self.scheduler.validate().context("invalid scheduler config")?;
        self.remote.validate().context("invalid remote client config")?;
        self.observability
            .validate()
            .context("invalid observability config")?;

        let mut seen = HashSet::new();
        for service in &self.services {
            service.validate().context("invalid managed service config")?;
            if !seen.insert(service.id.as_str()) {
                return Err(anyhow::anyhow!("duplicate managed service id: {}", service.id));
            }
        }
        Ok(())
    }
}
