//! Application configuration for the GERBIL adapter.
//!
//! User config lives at `~/.qanary-gerbil/qanary-gerbil.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GerbilError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "qanary-gerbil.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".qanary-gerbil";

// ---------------------------------------------------------------------------
// Config structs (matching qanary-gerbil.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Orchestration service location.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Result store access settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Inbound HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the orchestration service (scheme + host).
    #[serde(default = "default_pipeline_host")]
    pub host: String,

    /// Port of the orchestration service.
    #[serde(default = "default_pipeline_port")]
    pub port: u16,

    /// Upper bound for one pipeline run, in seconds.
    #[serde(default = "default_pipeline_timeout")]
    pub timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            host: default_pipeline_host(),
            port: default_pipeline_port(),
            timeout_secs: default_pipeline_timeout(),
        }
    }
}

impl PipelineConfig {
    /// `host:port` as a URL, the address every orchestration call goes to.
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.host).map_err(|e| {
            GerbilError::config(format!("pipeline host '{}' is not a URL: {e}", self.host))
        })?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(GerbilError::config(format!(
                "pipeline host '{}' has no host component",
                self.host
            )));
        }
        url.set_port(Some(self.port))
            .map_err(|()| GerbilError::config(format!("cannot set port on '{}'", self.host)))?;
        Ok(url)
    }

    /// Timeout for the orchestration call.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_pipeline_host() -> String {
    "http://localhost".into()
}
fn default_pipeline_port() -> u16 {
    8080
}
fn default_pipeline_timeout() -> u64 {
    300
}

/// `[store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Upper bound for a single result-store query, in seconds.
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_store_timeout(),
        }
    }
}

impl StoreConfig {
    /// Timeout for each result-store query.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_store_timeout() -> u64 {
    30
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8090".into()
}

impl AppConfig {
    /// Reject values that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.timeout_secs == 0 {
            return Err(GerbilError::config("pipeline.timeout_secs must be greater than 0"));
        }
        if self.store.timeout_secs == 0 {
            return Err(GerbilError::config("store.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.qanary-gerbil/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| GerbilError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.qanary-gerbil/qanary-gerbil.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| GerbilError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| GerbilError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| GerbilError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| GerbilError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| GerbilError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
