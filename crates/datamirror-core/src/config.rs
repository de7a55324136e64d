use crate::registry::DatasetSpec;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy parameters for the HTTP transport (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per download (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 0.25,
            max_delay_secs: 30,
        }
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_low_speed_time_secs() -> u64 {
    60
}

/// Global configuration loaded from `~/.config/datamirror/config.toml`.
/// Command-line flags override these values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatamirrorConfig {
    /// Where datasets are materialized when `--download-dir` is not given.
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    /// Shared extraction cache; `None` extracts straight into the download dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    /// Seconds allowed for the TCP/TLS connect.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Abort a transfer that stays under 1 KiB/s for this many seconds.
    #[serde(default = "default_low_speed_time_secs")]
    pub low_speed_time_secs: u64,
    /// Optional retry policy; if missing, a failed transfer is not retried.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
    /// Extra datasets added to (or overriding) the built-in registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datasets: Vec<DatasetSpec>,
}

impl Default for DatamirrorConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            cache_dir: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            low_speed_time_secs: default_low_speed_time_secs(),
            retry: None,
            datasets: Vec::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("datamirror")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from `path`, or defaults when it does not exist. Never writes.
pub fn load_at(path: &Path) -> Result<DatamirrorConfig> {
    if !path.exists() {
        return Ok(DatamirrorConfig::default());
    }
    let data = fs::read_to_string(path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: DatamirrorConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from the XDG config dirs without creating anything.
pub fn load() -> Result<DatamirrorConfig> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("datamirror")?;
    match xdg_dirs.find_config_file("config.toml") {
        Some(path) => load_at(&path),
        None => Ok(DatamirrorConfig::default()),
    }
}

/// Load configuration from `path`, creating it with defaults if it does not exist.
pub fn load_or_init_at(path: &Path) -> Result<DatamirrorConfig> {
    if !path.exists() {
        let default_cfg = DatamirrorConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        fs::write(path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_at(path)
}

/// Load configuration from the XDG config dir, creating a default file if none exists.
pub fn load_or_init() -> Result<DatamirrorConfig> {
    load_or_init_at(&config_path()?)
}
