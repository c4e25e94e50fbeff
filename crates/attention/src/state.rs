//! Per-signal timing state

use std::time::{Duration, Instant};

/// Tracks how long the eyes have stayed closed
///
/// The first below-threshold sample only starts the timer; the eyes count as
/// closed once a later sample finds them still closed after `hold`.
#[derive(Debug, Clone)]
pub struct EyeClosureTimer {
    threshold: f64,
    hold: Duration,
    closed_since: Option<Instant>,
}

impl EyeClosureTimer {
    pub fn new(threshold: f64, hold: Duration) -> Self {
        Self {
            threshold,
            hold,
            closed_since: None,
        }
    }

    /// Feed a smoothed EAR sample observed at `now`
    pub fn update_at(&mut self, now: Instant, ear: f64) -> bool {
        if ear >= self.threshold {
            self.closed_since = None;
            return false;
        }
        match self.closed_since {
            None => {
                self.closed_since = Some(now);
                false
            }
            Some(since) => now.saturating_duration_since(since) >= self.hold,
        }
    }

    pub fn closed_since(&self) -> Option<Instant> {
        self.closed_since
    }

    pub fn reset(&mut self) {
        self.closed_since = None;
    }
}
