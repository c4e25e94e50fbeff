//! Focus state machine with debounced distraction detection

use crate::analysis::SessionSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Attention state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FocusState {
    /// Looking at the screen
    #[default]
    Focused,
    /// Distracted signal seen, debounce running
    Warning,
    /// Distraction confirmed
    Distracted,
}

impl FocusState {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusState::Focused => "FOCUSED",
            FocusState::Warning => "WARNING",
            FocusState::Distracted => "DISTRACTED",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hysteresis state machine over the three distraction signals
///
/// Time is read from a monotonic clock. Focused time accumulates the delta
/// between consecutive updates while the engine is `Focused`, so results do
/// not depend on the frame rate.
#[derive(Debug, Clone)]
pub struct FocusEngine {
    state: FocusState,
    delay: Duration,
    warning_started_at: Option<Instant>,
    focus_started_at: Instant,
    total_focused: Duration,
    distraction_count: u32,
    last_update_at: Instant,
}

impl FocusEngine {
    /// Create an engine whose session starts now
    pub fn new(delay: Duration) -> Self {
        Self::starting_at(delay, Instant::now())
    }

    /// Create an engine whose session started at `start`
    pub fn starting_at(delay: Duration, start: Instant) -> Self {
        Self {
            state: FocusState::Focused,
            delay,
            warning_started_at: None,
            focus_started_at: start,
            total_focused: Duration::ZERO,
            distraction_count: 0,
            last_update_at: start,
        }
    }

    /// Feed this frame's signals, timestamped now
    pub fn update(&mut self, head_down: bool, eyes_down: bool, eyes_closed: bool) -> FocusState {
        self.update_at(Instant::now(), head_down, eyes_down, eyes_closed)
    }

    /// Feed this frame's signals observed at `now`
    pub fn update_at(
        &mut self,
        now: Instant,
        head_down: bool,
        eyes_down: bool,
        eyes_closed: bool,
    ) -> FocusState {
        let dt = now.saturating_duration_since(self.last_update_at);
        self.last_update_at = now;

        let distracted = head_down || eyes_down || eyes_closed;

        match self.state {
            FocusState::Focused => {
                self.total_focused += dt;
                if distracted {
                    debug!(head_down, eyes_down, eyes_closed, "Distraction signal, starting debounce");
                    self.state = FocusState::Warning;
                    self.warning_started_at = Some(now);
                }
            }
            FocusState::Warning => {
                if !distracted {
                    debug!("Distraction signal cleared during debounce");
                    self.state = FocusState::Focused;
                    self.warning_started_at = None;
                } else {
                    let elapsed = self
                        .warning_started_at
                        .map_or(self.delay, |start| now.saturating_duration_since(start));
                    if elapsed >= self.delay {
                        self.state = FocusState::Distracted;
                        self.distraction_count += 1;
                        self.warning_started_at = None;
                        info!(
                            "Distraction confirmed after {:.2}s (count: {})",
                            elapsed.as_secs_f64(),
                            self.distraction_count
                        );
                    }
                }
            }
            FocusState::Distracted => {
                if !distracted {
                    info!("Focus regained");
                    self.state = FocusState::Focused;
                    self.focus_started_at = now;
                }
            }
        }

        self.state
    }

    pub fn state(&self) -> FocusState {
        self.state
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// When the debounce currently running started
    pub fn warning_started_at(&self) -> Option<Instant> {
        self.warning_started_at
    }

    /// Start of the current focused stretch
    pub fn focus_started_at(&self) -> Instant {
        self.focus_started_at
    }

    pub fn total_focused(&self) -> Duration {
        self.total_focused
    }

    pub fn total_focused_seconds(&self) -> f64 {
        self.total_focused.as_secs_f64()
    }

    pub fn focus_minutes(&self) -> f64 {
        self.total_focused_seconds() / 60.0
    }

    pub fn distraction_count(&self) -> u32 {
        self.distraction_count
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            total_focused_seconds: self.total_focused_seconds(),
            distraction_count: self.distraction_count,
        }
    }
}
