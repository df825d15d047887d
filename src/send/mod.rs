use anyhow::Result;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod upload;

pub use upload::send_file;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_FIELD: &str = "pdf";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// File to upload
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Server URL (e.g. http://localhost:3000)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Form field that carries the file
    #[arg(short, long)]
    pub field: Option<String>,

    /// Request timeout (e.g. 30s, 2m)
    #[arg(short, long, value_parser = humantime_serde::re::humantime::parse_duration)]
    pub timeout: Option<Duration>,
}

/// `[send]` table of `.pdfdrop.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl SendConfig {
    pub fn with_defaults() -> Self {
        Self {
            server: Some(DEFAULT_SERVER_URL.to_string()),
            field: Some(DEFAULT_FIELD.to_string()),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// Settings for one upload after merging arguments, config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOptions {
    pub server: String,
    pub field: String,
    pub timeout: Duration,
}

impl SendOptions {
    /// Command line wins over the config file, which wins over defaults.
    pub fn resolve(args: &SendArgs, config: Option<&SendConfig>) -> Self {
        let server = args
            .server
            .clone()
            .or_else(|| config.and_then(|c| c.server.clone()))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let field = args
            .field
            .clone()
            .or_else(|| config.and_then(|c| c.field.clone()))
            .unwrap_or_else(|| DEFAULT_FIELD.to_string());
        let timeout = args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout))
            .unwrap_or(DEFAULT_TIMEOUT);

        Self {
            server,
            field,
            timeout,
        }
    }
}

pub fn run(args: SendArgs, config: Option<&SendConfig>) -> Result<()> {
    let options = SendOptions::resolve(&args, config);
    let reply = send_file(&options, &args.path)?;
    println!("{}", reply);
    Ok(())
}
