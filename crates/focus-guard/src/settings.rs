//! Layered application settings
//!
//! Defaults, then an optional TOML file, then `FOCUS_GUARD__*` environment
//! variables (`__` separates nested keys, e.g.
//! `FOCUS_GUARD__ATTENTION__HEAD_DOWN_PITCH_DEG=-12`).

use crate::AppError;
use alerting::AlertConfig;
use attention::AttentionConfig;
use config::{Config, Environment, File};
use landmark_capture::SourceConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::Level;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "focus-guard.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FOCUS_GUARD";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub capture: SourceConfig,
    pub attention: AttentionConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level, AppError> {
        self.level
            .parse()
            .map_err(|_| AppError::Config(format!("unknown log level '{}'", self.level)))
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Write per-frame telemetry to stdout as JSON lines
    pub telemetry_json: bool,
}

impl Settings {
    /// Load settings from `path` (if present) and the environment
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.logging.max_level()?;
        Ok(settings)
    }
}
