//! Landmark Capture Library for FocusGuard
//!
//! Provides the facial landmark frame types consumed by the attention core
//! and the sources that produce them:
//! - FaceMesh-style landmark frames (478 points incl. iris)
//! - JSON-lines replay of recorded detector output
//!
//! Camera acquisition and the landmark detector itself live outside this
//! workspace; anything able to emit one `CapturedFrame` per camera frame can
//! implement [`LandmarkSource`].

pub mod frame;
pub mod replay;

pub use frame::{CapturedFrame, Landmark, LandmarkFrame, FACE_MESH_LANDMARKS};
pub use replay::ReplaySource;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to open landmark source {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Invalid frame format: {0}")]
    Format(String),

    #[error("Read error: {0}")]
    Read(#[from] std::io::Error),

    #[error("Malformed record on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// A producer of landmark frames, one per camera frame.
///
/// `Ok(None)` signals the end of the stream.
pub trait LandmarkSource {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError>;
}

/// Landmark source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to a JSON-lines landmark recording
    pub path: PathBuf,
    /// Frame width used when a record carries none
    pub width: u32,
    /// Frame height used when a record carries none
    pub height: u32,
    /// Target FPS of the outer loop
    pub fps: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("landmarks.jsonl"),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl SourceConfig {
    /// Interval between frames at the configured FPS
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}
