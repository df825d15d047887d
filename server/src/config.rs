use log::warn;
use std::{env, path::PathBuf};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Process configuration, read from the environment (and `.env`).
///
/// | Variable            | Default   |
/// |---------------------|-----------|
/// | `HOST`              | `0.0.0.0` |
/// | `PORT`              | `3000`    |
/// | `UPLOAD_DIR`        | `uploads` |
/// | `UPLOAD_BODY_LIMIT` | unlimited |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// Maximum request body size in bytes. `None` accepts any size.
    pub body_limit: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            body_limit: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = lookup("HOST")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(value) => value.trim().parse::<u16>().unwrap_or_else(|_| {
                warn!("Ignoring invalid PORT {:?}, using {}", value, DEFAULT_PORT);
                DEFAULT_PORT
            }),
            None => defaults.port,
        };

        let upload_dir = lookup("UPLOAD_DIR")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let body_limit = lookup("UPLOAD_BODY_LIMIT").and_then(|value| {
            match value.trim().parse::<usize>() {
                Ok(limit) => Some(limit),
                Err(_) => {
                    warn!("Ignoring invalid UPLOAD_BODY_LIMIT {:?}", value);
                    None
                }
            }
        });

        Self {
            host,
            port,
            upload_dir,
            body_limit,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "8081"),
            ("UPLOAD_DIR", "/srv/pdfs"),
            ("UPLOAD_BODY_LIMIT", "1048576"),
        ]);
        assert_eq!(config.bind_addr(), "127.0.0.1:8081");
        assert_eq!(config.upload_dir, PathBuf::from("/srv/pdfs"));
        assert_eq!(config.body_limit, Some(1_048_576));
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config_from(&[("PORT", "http"), ("UPLOAD_BODY_LIMIT", "lots")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.body_limit, None);
    }
}
