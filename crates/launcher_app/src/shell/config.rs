//! Launcher configuration, read from a RON file.
//!
//! Every field has a default matching the deployed application, so a missing
//! file (or a file naming only a few fields) is fine.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "PIPELINE_LAUNCHER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "./launcher.ron";

const CLIENT_ID: &str = "99fbd4f5-fc2f-40c1-95fa-f8bcae8e8d94";
const AUTHORITY: &str =
    "https://login.microsoftonline.com/a3b7e820-e897-498d-a4bf-c723c6f52ab6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    pub client_id: String,
    pub authority: String,
    /// Application scopes; the platform scopes are added by the provider.
    pub scopes: Vec<String>,
    pub api_base_url: String,
    pub state_dir: PathBuf,
    pub request_timeout_secs: u64,
    /// Overrides the device code polling interval the platform asks for.
    pub poll_interval_secs: Option<u64>,
    pub log: LogConfig,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            authority: AUTHORITY.to_string(),
            scopes: vec![format!("api://{CLIENT_ID}/acces_as_user")],
            api_base_url: "http://localhost:7071".to_string(),
            state_dir: PathBuf::from("./.pipeline_launcher"),
            request_timeout_secs: 30,
            poll_interval_secs: None,
            log: LogConfig::default(),
        }
    }
}

impl LauncherConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LogDestination {
    #[default]
    File,
    Terminal,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub destination: LogDestination,
    /// `error`, `warn`, `info`, `debug`, `trace` or `off`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            destination: LogDestination::File,
            level: "info".to_string(),
        }
    }
}

impl LogConfig {
    /// Unknown level names fall back to `info`.
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.level.trim()).unwrap_or(LevelFilter::Info)
    }
}

/// Path named by `$PIPELINE_LAUNCHER_CONFIG`, else `./launcher.ron`.
pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

pub fn load() -> anyhow::Result<LauncherConfig> {
    load_from(&config_path())
}

/// Reads the config at `path`; a missing file yields the defaults.
pub fn load_from(path: &Path) -> anyhow::Result<LauncherConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LauncherConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };
    ron::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}
