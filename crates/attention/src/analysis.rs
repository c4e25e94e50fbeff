//! Per-frame telemetry and session summary

use crate::engine::FocusState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything the overlay needs to render one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameTelemetry {
    /// Focus state after this frame's update
    pub state: FocusState,

    /// Whether a face was detected
    pub face_detected: bool,

    /// Smoothed head pitch (degrees), neutral when no face
    pub pitch_deg: f64,

    /// Smoothed vertical gaze ratio, neutral when no face
    pub gaze_ratio: f64,

    /// Smoothed eye aspect ratio, neutral when no face
    pub ear: f64,

    /// Derived signals fed to the focus engine
    pub head_down: bool,
    pub eyes_down: bool,
    pub eyes_closed: bool,

    /// Cumulative focused time (seconds)
    pub total_focused_seconds: f64,

    /// Confirmed distractions this session
    pub distraction_count: u32,
}

impl FrameTelemetry {
    /// Check if any distraction signal fired this frame
    pub fn distracted_signal(&self) -> bool {
        self.head_down || self.eyes_down || self.eyes_closed
    }
}

/// End-of-session totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_focused_seconds: f64,
    pub distraction_count: u32,
}

impl SessionSummary {
    /// Focused time as `MM:SS`
    pub fn focus_clock(&self) -> String {
        format_clock(self.total_focused_seconds)
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session Summary")?;
        writeln!(f, "Total Focus Time : {}", self.focus_clock())?;
        write!(f, "Distractions     : {}", self.distraction_count)
    }
}

/// Format seconds as `MM:SS` (minutes keep growing past 59)
pub fn format_clock(seconds: f64) -> String {
    let whole = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", whole / 60, whole % 60)
}
