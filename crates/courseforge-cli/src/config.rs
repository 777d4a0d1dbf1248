//! Configuration file management for courseforge.
//!
//! Provides a TOML-based config file at `~/.config/courseforge/config.toml`
//! and a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use courseforge_core::gateway::GatewayConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api: ApiSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiSection {
    /// Base URL of the generation service.
    pub url: String,
    /// Per-request timeout in seconds. Omit to use the built-in default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the courseforge config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/courseforge` or
/// `~/.config/courseforge`. We intentionally ignore the platform-specific
/// `dirs::config_dir()` (which returns `~/Library/Application Support` on
/// macOS).
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("courseforge");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("courseforge")
}

/// Return the path to the courseforge config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    Ok(())
}

// -----------------------------------------------------------------------
// Resolution
// -----------------------------------------------------------------------

/// Resolve the gateway configuration using the chain:
/// CLI flag > `COURSEFORGE_API_URL` env > config file > default.
///
/// The timeout comes from the config file when present; neither the flag
/// nor the env var override it.
pub fn resolve(cli_api_url: Option<&str>) -> GatewayConfig {
    let file_config = load_config().ok();

    let base_url = if let Some(url) = cli_api_url {
        url.to_string()
    } else if let Ok(url) = std::env::var("COURSEFORGE_API_URL") {
        url
    } else if let Some(ref cfg) = file_config {
        cfg.api.url.clone()
    } else {
        GatewayConfig::DEFAULT_BASE_URL.to_string()
    };

    let mut config = GatewayConfig::new(base_url);
    if let Some(secs) = file_config.and_then(|cfg| cfg.api.timeout_secs) {
        config.timeout = Duration::from_secs(secs);
    }
    config
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
