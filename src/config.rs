use anyhow::Context;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::send::SendConfig;

pub const CONFIG_FILE: &str = ".pdfdrop.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send: Option<SendConfig>,
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| format!("Invalid {}", path.display()))?;
        Ok(config)
    }

    /// Loads `.pdfdrop.toml` from the current directory if present.
    ///
    /// A broken file is reported and ignored so the command still runs on defaults.
    pub fn load_default() -> Option<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(cfg) => {
                let abs_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
                info!("Using configuration file: {}", abs_path.display());
                Some(cfg)
            }
            Err(e) => {
                error!("Failed to load configuration file: {:#}, using defaults", e);
                None
            }
        }
    }

    pub fn generate_config_file(path: impl AsRef<Path>, force: bool) -> anyhow::Result<()> {
        let path = path.as_ref();
        if path.exists() && !force {
            anyhow::bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                path.display()
            );
        }

        let content = Self::generate_full_config()?;
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;

        info!("Configuration file generated: {}", path.display());
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            send: Some(SendConfig::with_defaults()),
        };
        let toml_content =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
        Ok(format!(
            "# pdfdrop configuration file\n# All fields are optional, command line arguments override config file values\n\n{}",
            toml_content
        ))
    }
}
