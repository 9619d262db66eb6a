use std::path::Path;

use anyhow::{Context, Result};
use config::{Config as ConfigLoader, Environment, File};
use serde::Deserialize;
use tabml_core::{PlatformConfig, ServingConfig, StorageConfig, TrainingConfig};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "tabml=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub training: TrainingConfig,
    pub serving: ServingConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Layered load: `config/default`, `config/local`, an optional explicit
    /// file, then `TABML__*` environment variables.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("TABML")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?;

        let config: Self = config
            .try_deserialize()
            .context("failed to parse configuration")?;
        config.platform().check()?;
        Ok(config)
    }

    pub fn platform(&self) -> PlatformConfig {
        PlatformConfig {
            training: self.training.clone(),
            serving: self.serving.clone(),
            storage: self.storage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn defaults_apply_without_sources() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.log_format, LogFormat::Pretty);
        assert_eq!(config.serving.max_batch_size, 1000);
    }

    #[test]
    #[serial]
    fn explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\nlog_format = \"json\"\n\n[training]\nrandom_seed = 7\n"
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.log_format, LogFormat::Json);
        assert_eq!(config.training.random_seed, 7);
        assert_eq!(config.training.test_fraction, 0.2);
    }

    #[test]
    #[serial]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[training]\ntest_fraction = 1.5\n").unwrap();

        assert!(Config::load(Some(file.path())).is_err());
    }
}
