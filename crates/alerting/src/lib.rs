//! Alerting System
//!
//! Drives a persistent audio alarm while the user is distracted: two (or
//! more) tracks alternate until the alarm is stopped.

pub mod backend;
mod controller;

pub use backend::{MixerSettings, PlaybackBackend, PlaybackError, SilentBackend};
#[cfg(feature = "rodio")]
pub use backend::RodioBackend;
pub use controller::{AlarmController, AlertConfig, BackendKind};

use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Alerting error types
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("No alarm tracks configured")]
    NoTracks,

    #[error("Audio backend error: {0}")]
    Backend(#[from] PlaybackError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Backend '{0:?}' not available in this build")]
    Unavailable(BackendKind),
}

/// Create the backend selected in the configuration
pub fn open_backend(config: &AlertConfig) -> Result<Box<dyn PlaybackBackend>, AlertError> {
    info!("Using {:?} audio backend", config.backend);
    match config.backend {
        BackendKind::Silent => {
            let length = Duration::try_from_secs_f64(config.silent_track_seconds)
                .map_err(|e| AlertError::Config(format!("silent_track_seconds: {}", e)))?;
            Ok(Box::new(SilentBackend::new(length)))
        }
        #[cfg(feature = "rodio")]
        BackendKind::Rodio => Ok(Box::new(RodioBackend::new())),
        #[cfg(not(feature = "rodio"))]
        BackendKind::Rodio => Err(AlertError::Unavailable(BackendKind::Rodio)),
    }
}
