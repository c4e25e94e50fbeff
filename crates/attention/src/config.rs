//! Attention configuration

use crate::pose::SolverSettings;
use crate::AttentionError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Landmark indices describing one eye
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeTopology {
    /// Upper eyelid landmarks
    pub top_lid: [usize; 3],
    /// Lower eyelid landmarks
    pub bottom_lid: [usize; 3],
    /// Refined iris center landmark
    pub iris: usize,
    /// EAR boundary in P1..P6 order (corner, two upper, corner, two lower)
    pub boundary: [usize; 6],
}

impl EyeTopology {
    /// Image-left eye (the subject's right eye) in the FaceMesh topology,
    /// outer corner 33, inner corner 133
    pub fn face_mesh_left() -> Self {
        Self {
            top_lid: [159, 160, 161],
            bottom_lid: [144, 145, 153],
            iris: 468,
            boundary: [33, 160, 158, 133, 153, 144],
        }
    }

    /// Image-right eye (the subject's left eye), inner corner 362, outer
    /// corner 263
    pub fn face_mesh_right() -> Self {
        Self {
            top_lid: [386, 387, 388],
            bottom_lid: [373, 374, 380],
            iris: 473,
            boundary: [362, 387, 385, 263, 380, 373],
        }
    }

    fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.top_lid
            .iter()
            .chain(&self.bottom_lid)
            .chain(&self.boundary)
            .chain(std::iter::once(&self.iris))
            .copied()
    }
}

/// Landmark topology, canonical face model and solver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Nose tip, chin, then the outer eye corners and mouth corners in
    /// image-left, image-right order. FaceMesh labels points anatomically,
    /// so 33 and 57 sit left of 263 and 287 in an unmirrored frame.
    pub pose_landmarks: [usize; 6],
    /// Canonical 3D face (y up, z toward the viewer) matching `pose_landmarks`
    pub model_points: [[f64; 3]; 6],
    pub left_eye: EyeTopology,
    pub right_eye: EyeTopology,
    /// Spans below this (pixels) are treated as degenerate
    pub degenerate_epsilon: f64,
    /// Gaze ratio reported for a degenerate eyelid span
    pub neutral_gaze_ratio: f64,
    /// EAR reported for a degenerate eye width
    pub neutral_ear: f64,
    pub solver: SolverSettings,
}

impl GeometryConfig {
    /// Check that every landmark index exists in a frame of `landmark_count`
    /// points
    pub fn validate(&self, landmark_count: usize) -> Result<(), AttentionError> {
        let out_of_range = self
            .pose_landmarks
            .iter()
            .copied()
            .chain(self.left_eye.indices())
            .chain(self.right_eye.indices())
            .find(|&idx| idx >= landmark_count);

        match out_of_range {
            Some(idx) => Err(AttentionError::Config(format!(
                "landmark index {idx} out of range for {landmark_count}-point frames"
            ))),
            None => Ok(()),
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            pose_landmarks: [1, 152, 33, 263, 57, 287],
            model_points: [
                [0.0, 0.0, 0.0],
                [0.0, -63.6, -12.5],
                [-43.3, 32.7, -26.0],
                [43.3, 32.7, -26.0],
                [-28.9, -28.9, -24.1],
                [28.9, -28.9, -24.1],
            ],
            left_eye: EyeTopology::face_mesh_left(),
            right_eye: EyeTopology::face_mesh_right(),
            degenerate_epsilon: 1e-6,
            neutral_gaze_ratio: 0.5,
            neutral_ear: 0.3,
            solver: SolverSettings::default(),
        }
    }
}

/// Attention thresholds and smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Smoothed pitch below this (degrees) counts as head down
    pub head_down_pitch_deg: f64,

    /// Smoothed gaze ratio above this counts as eyes down
    pub eye_down_gaze_ratio: f64,

    /// Smoothed EAR below this counts as eyes closed
    pub ear_closed_threshold: f64,

    /// Eyes must stay closed this long (seconds) to count as sleeping
    pub sleep_seconds: f64,

    /// Debounce before a distraction is confirmed (seconds)
    pub distraction_delay_seconds: f64,

    /// Smoothing coefficients
    pub pitch_alpha: f64,
    pub gaze_alpha: f64,
    pub ear_alpha: f64,

    pub geometry: GeometryConfig,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            head_down_pitch_deg: -15.0,
            eye_down_gaze_ratio: 0.62,
            ear_closed_threshold: 0.18,
            sleep_seconds: 3.0,
            distraction_delay_seconds: 2.0,
            pitch_alpha: 0.25,
            gaze_alpha: 0.3,
            ear_alpha: 0.3,
            geometry: GeometryConfig::default(),
        }
    }
}

impl AttentionConfig {
    /// Create strict config (shorter debounce)
    pub fn strict() -> Self {
        Self {
            head_down_pitch_deg: -10.0,
            sleep_seconds: 2.0,
            distraction_delay_seconds: 1.0,
            ..Default::default()
        }
    }

    /// Create lenient config (longer debounce)
    pub fn lenient() -> Self {
        Self {
            head_down_pitch_deg: -20.0,
            sleep_seconds: 4.0,
            distraction_delay_seconds: 4.0,
            ..Default::default()
        }
    }

    /// Debounce window as a duration
    pub fn distraction_delay(&self) -> Result<Duration, AttentionError> {
        seconds("distraction_delay_seconds", self.distraction_delay_seconds)
    }

    /// Eye-closure hold time as a duration
    pub fn sleep_duration(&self) -> Result<Duration, AttentionError> {
        seconds("sleep_seconds", self.sleep_seconds)
    }
}

fn seconds(field: &str, value: f64) -> Result<Duration, AttentionError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| AttentionError::Config(format!("{field} = {value}: {e}")))
}
