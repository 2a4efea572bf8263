//! mgvp-gp configuration
//!
//! Command-line arguments (each backed by an `MGVP_*` environment variable)
//! override the TOML file, which overrides compiled defaults.

use crate::budget::MonitorConfig;
use crate::error::{Error, Result};
use crate::playback::ControllerConfig;
use crate::session::SessionSettings;
use clap::Parser;
use mgvp_common::config::{resolve, CompiledDefaults, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for mgvp-gp
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mgvp-gp")]
#[command(about = "Motion-gesture playback service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "MGVP_PORT")]
    pub port: Option<u16>,

    /// TOML config file (defaults to the platform config location)
    #[arg(short, long, env = "MGVP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the watch-budget authority
    #[arg(long, env = "MGVP_AUTHORITY_URL")]
    pub authority_url: Option<String>,

    /// Base URL of the sequence provider
    #[arg(long, env = "MGVP_SEQUENCE_URL")]
    pub sequence_url: Option<String>,

    /// Profile reported to the budget authority
    #[arg(long, env = "MGVP_PROFILE_ID")]
    pub profile_id: Option<String>,

    /// Seconds between budget heartbeats
    #[arg(long, env = "MGVP_HEARTBEAT_INTERVAL_SECS")]
    pub heartbeat_interval_secs: Option<u64>,

    /// Media seconds scrubbed per second at full tilt
    #[arg(long, env = "MGVP_MAX_SCRUB_RATE")]
    pub max_scrub_rate: Option<f64>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "MGVP_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub port: u16,
    pub authority_url: String,
    pub sequence_url: String,
    pub profile_id: String,
    pub heartbeat_interval: Duration,
    pub max_scrub_rate: f64,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge CLI/env, TOML and compiled defaults
    pub fn resolve(args: &Args, toml: &TomlConfig) -> Result<Self> {
        let defaults = CompiledDefaults::default();

        let heartbeat_secs = resolve(
            args.heartbeat_interval_secs,
            toml.heartbeat_interval_secs,
            defaults.heartbeat_interval_secs,
        );
        if heartbeat_secs == 0 {
            return Err(Error::Config(
                "heartbeat interval must be at least 1 second".to_string(),
            ));
        }

        let max_scrub_rate = resolve(args.max_scrub_rate, toml.max_scrub_rate, defaults.max_scrub_rate);
        if !max_scrub_rate.is_finite() || max_scrub_rate <= 0.0 {
            return Err(Error::Config(format!(
                "max scrub rate must be positive, got {}",
                max_scrub_rate
            )));
        }

        Ok(Self {
            port: resolve(args.port, toml.port, defaults.port),
            authority_url: resolve(
                args.authority_url.clone(),
                toml.authority_url.clone(),
                defaults.authority_url,
            ),
            sequence_url: resolve(
                args.sequence_url.clone(),
                toml.sequence_url.clone(),
                defaults.sequence_url,
            ),
            profile_id: resolve(
                args.profile_id.clone(),
                toml.profile_id.clone(),
                defaults.profile_id,
            ),
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            max_scrub_rate,
            log_level: resolve(
                args.log_level.clone(),
                toml.logging.level.clone(),
                defaults.log_level,
            ),
        })
    }

    /// Per-session tuning derived from this configuration
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            controller: ControllerConfig {
                max_scrub_rate: self.max_scrub_rate,
                ..ControllerConfig::default()
            },
            gestures: Default::default(),
            monitor: MonitorConfig {
                profile_id: self.profile_id.clone(),
                heartbeat_interval: self.heartbeat_interval,
            },
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        let defaults = CompiledDefaults::default();
        Self {
            port: defaults.port,
            authority_url: defaults.authority_url,
            sequence_url: defaults.sequence_url,
            profile_id: defaults.profile_id,
            heartbeat_interval: Duration::from_secs(defaults.heartbeat_interval_secs),
            max_scrub_rate: defaults.max_scrub_rate,
            log_level: defaults.log_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_overrides() {
        let config = ServiceConfig::resolve(&Args::default(), &TomlConfig::default()).unwrap();
        assert_eq!(config.port, 5790);
        assert_eq!(config.heartbeat_interval, Duration::from_secs(60));
        assert_eq!(config.max_scrub_rate, 2.0);
    }

    #[test]
    fn test_cli_beats_toml() {
        let toml = TomlConfig::from_toml_str(
            r#"
            port = 6000
            profile_id = "from-toml"
            heartbeat_interval_secs = 30
            "#,
        )
        .unwrap();
        let args = Args::try_parse_from(["mgvp-gp", "--port", "7000"]).unwrap();

        let config = ServiceConfig::resolve(&args, &toml).unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.profile_id, "from-toml");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_rejects_zero_interval_from_cli() {
        let args = Args {
            heartbeat_interval_secs: Some(0),
            ..Args::default()
        };
        assert!(matches!(
            ServiceConfig::resolve(&args, &TomlConfig::default()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_session_settings_carry_config() {
        let config = ServiceConfig {
            max_scrub_rate: 4.0,
            profile_id: "kid".to_string(),
            ..ServiceConfig::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.controller.max_scrub_rate, 4.0);
        assert_eq!(settings.monitor.profile_id, "kid");
    }
}
