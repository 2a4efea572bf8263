//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`MGVP_*`, handled by clap in the service binary)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the service logs a warning and
//! starts with compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Compiled-in defaults used when neither CLI, environment nor TOML supply a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub port: u16,
    pub authority_url: String,
    pub sequence_url: String,
    pub profile_id: String,
    pub heartbeat_interval_secs: u64,
    pub max_scrub_rate: f64,
    /// `EnvFilter` directive used when neither RUST_LOG nor config sets one
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            port: 5790,
            authority_url: "http://127.0.0.1:8080/api/budget".to_string(),
            sequence_url: "http://127.0.0.1:8080/api".to_string(),
            profile_id: "default".to_string(),
            heartbeat_interval_secs: 60,
            max_scrub_rate: 2.0,
            log_level: "mgvp_gp=debug,mgvp_common=debug,tower_http=debug".to_string(),
        }
    }
}

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; unset fields fall back to [`CompiledDefaults`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Base URL of the remote watch-budget authority
    #[serde(default)]
    pub authority_url: Option<String>,

    /// Base URL of the sequence provider
    #[serde(default)]
    pub sequence_url: Option<String>,

    /// Profile reported to the budget authority when starting sessions
    #[serde(default)]
    pub profile_id: Option<String>,

    /// Heartbeat interval in seconds
    #[serde(default)]
    pub heartbeat_interval_secs: Option<u64>,

    /// Media seconds scrubbed per wall-clock second at full tilt
    #[serde(default)]
    pub max_scrub_rate: Option<f64>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,
}

impl TomlConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if let Some(rate) = self.max_scrub_rate {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(Error::Config(format!(
                    "max_scrub_rate must be positive, got {}",
                    rate
                )));
            }
        }
        if self.heartbeat_interval_secs == Some(0) {
            return Err(Error::Config(
                "heartbeat_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the bootstrap configuration with graceful degradation
///
/// An explicit path must exist and parse. Without one, the platform config
/// locations are searched; nothing found yields an empty config (all defaults).
pub fn load_toml_config(explicit_path: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit_path {
        info!("Loading configuration from {}", path.display());
        return TomlConfig::from_file(path);
    }

    match default_config_file() {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::from_file(&path)
        }
        None => {
            warn!("No config file found, using compiled defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Locate the first existing platform config file
///
/// Linux checks `~/.config/mgvp/config.toml` then `/etc/mgvp/config.toml`;
/// other platforms check the user config directory only.
pub fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("mgvp").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/mgvp/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Pick the first available value: CLI/env, then TOML, then compiled default
pub fn resolve<T>(cli_value: Option<T>, toml_value: Option<T>, default: T) -> T {
    cli_value.or(toml_value).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_priority() {
        assert_eq!(resolve(Some(1), Some(2), 3), 1);
        assert_eq!(resolve(None, Some(2), 3), 2);
        assert_eq!(resolve::<u16>(None, None, 3), 3);
    }

    #[test]
    fn test_rejects_zero_heartbeat_interval() {
        let result = TomlConfig::from_toml_str("heartbeat_interval_secs = 0");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_negative_scrub_rate() {
        let result = TomlConfig::from_toml_str("max_scrub_rate = -1.0");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
