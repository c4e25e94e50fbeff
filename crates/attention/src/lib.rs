//! Attention Monitoring
//!
//! Real-time attention analysis over facial landmarks:
//! - Head pitch estimation (perspective-n-point solve)
//! - Vertical gaze ratio from iris position
//! - Eye aspect ratio and sustained eye closure
//! - Exponential smoothing of the per-frame signals
//! - Debounced focus state machine

pub mod analysis;
pub mod config;
pub mod engine;
pub mod geometry;
pub mod pose;
pub mod smoothing;
pub mod state;

#[cfg(test)]
mod testing;

pub use analysis::{FrameTelemetry, SessionSummary};
pub use config::{AttentionConfig, EyeTopology, GeometryConfig};
pub use engine::{FocusEngine, FocusState};
pub use geometry::FaceMetrics;
pub use pose::{PoseError, PoseSolution, SolverSettings};
pub use smoothing::Smoother;
pub use state::EyeClosureTimer;

use landmark_capture::CapturedFrame;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

/// Attention error types
#[derive(Error, Debug)]
pub enum AttentionError {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Per-frame attention pipeline
///
/// geometry → smoothing → thresholds → focus engine, one call per frame.
pub struct AttentionMonitor {
    config: AttentionConfig,
    pitch: Smoother,
    gaze: Smoother,
    ear: Smoother,
    closure: EyeClosureTimer,
    engine: FocusEngine,
}

impl AttentionMonitor {
    /// Create a new monitor whose session starts now
    pub fn new(config: AttentionConfig) -> Result<Self, AttentionError> {
        Self::starting_at(config, Instant::now())
    }

    /// Create a new monitor whose session started at `start`
    pub fn starting_at(config: AttentionConfig, start: Instant) -> Result<Self, AttentionError> {
        let delay = config.distraction_delay()?;
        let hold = config.sleep_duration()?;
        config.geometry.validate(landmark_capture::FACE_MESH_LANDMARKS)?;
        info!(
            "Attention monitor: delay {:.1}s, pitch < {}°, gaze > {}, EAR < {} for {:.1}s",
            delay.as_secs_f64(),
            config.head_down_pitch_deg,
            config.eye_down_gaze_ratio,
            config.ear_closed_threshold,
            hold.as_secs_f64()
        );

        Ok(Self {
            pitch: Smoother::new(config.pitch_alpha),
            gaze: Smoother::new(config.gaze_alpha),
            ear: Smoother::new(config.ear_alpha),
            closure: EyeClosureTimer::new(config.ear_closed_threshold, hold),
            engine: FocusEngine::starting_at(delay, start),
            config,
        })
    }

    /// Analyze a frame captured now
    pub fn process(&mut self, frame: &CapturedFrame) -> FrameTelemetry {
        self.process_at(frame, Instant::now())
    }

    /// Analyze a frame captured at `now`
    pub fn process_at(&mut self, frame: &CapturedFrame, now: Instant) -> FrameTelemetry {
        let topology = &self.config.geometry;
        let (mut pitch_deg, mut gaze_ratio, mut ear) = (0.0, topology.neutral_gaze_ratio, topology.neutral_ear);

        let (head_down, eyes_down, eyes_closed) = match &frame.landmarks {
            Some(landmarks) => {
                let raw = geometry::measure(landmarks, frame.width, frame.height, topology);
                pitch_deg = self.pitch.update(raw.pitch_deg);
                gaze_ratio = self.gaze.update(raw.gaze_ratio);
                ear = self.ear.update(raw.ear);
                (
                    pitch_deg < self.config.head_down_pitch_deg,
                    gaze_ratio > self.config.eye_down_gaze_ratio,
                    self.closure.update_at(now, ear),
                )
            }
            // No face: treat as looking away
            None => (true, false, false),
        };

        let state = self.engine.update_at(now, head_down, eyes_down, eyes_closed);
        debug!(
            seq = frame.sequence,
            %state,
            pitch_deg,
            gaze_ratio,
            ear,
            "Frame analyzed"
        );

        FrameTelemetry {
            state,
            face_detected: frame.face_detected(),
            pitch_deg,
            gaze_ratio,
            ear,
            head_down,
            eyes_down,
            eyes_closed,
            total_focused_seconds: self.engine.total_focused_seconds(),
            distraction_count: self.engine.distraction_count(),
        }
    }

    pub fn engine(&self) -> &FocusEngine {
        &self.engine
    }

    pub fn config(&self) -> &AttentionConfig {
        &self.config
    }

    pub fn summary(&self) -> SessionSummary {
        self.engine.summary()
    }
}
