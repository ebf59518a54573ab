use anyhow::{Context, Result};
use geolq_metric::LqConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    #[serde(default)]
    pub lq: LqConfig,
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(skip)]
    config_file_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nRun with --init to create a new configuration",
                config_path.display()
            );
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read configuration file")?;

        let mut config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse configuration file")?;
        config.validate()?;

        config.config_file_path = config_path;
        Ok(config)
    }

    /// Create a default configuration and write it to disk
    pub fn create_default(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config = Config {
            node: NodeConfig {
                name: "geolq-node".to_string(),
            },
            lq: LqConfig::default(),
            logging: LoggingConfig::default(),
            config_file_path: config_path.clone(),
        };

        let yaml = serde_yaml::to_string(&config)?;
        fs::write(&config_path, yaml)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node.name.is_empty() {
            anyhow::bail!("node.name must not be empty");
        }
        self.lq
            .validate()
            .context("Invalid link-quality configuration")?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file_path
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("geolqd")
            .join("config.yaml")
    }
}
