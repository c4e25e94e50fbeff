//! One monitoring session: attention pipeline plus alarm, stepped per frame

use alerting::{AlarmController, PlaybackBackend};
use attention::{AttentionMonitor, FocusState, FrameTelemetry, SessionSummary};
use landmark_capture::CapturedFrame;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Frames-per-second over fixed windows
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    window_start: Option<Instant>,
    frames: u32,
    fps: f64,
}

impl FpsMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: None,
            frames: 0,
            fps: 0.0,
        }
    }

    /// Count a frame at `now` and return the latest rate
    pub fn tick_at(&mut self, now: Instant) -> f64 {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= self.window && !elapsed.is_zero() {
            self.fps = f64::from(self.frames) / elapsed.as_secs_f64();
            self.frames = 0;
            self.window_start = Some(now);
        }
        self.fps
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

/// Result of one step
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub sequence: u32,
    pub fps: f64,
    pub alarm_active: bool,
    #[serde(flatten)]
    pub telemetry: FrameTelemetry,
}

pub struct Session<B: PlaybackBackend> {
    monitor: AttentionMonitor,
    alarm: AlarmController<B>,
    fps: FpsMeter,
    frames: u64,
}

impl<B: PlaybackBackend> Session<B> {
    pub fn new(monitor: AttentionMonitor, alarm: AlarmController<B>) -> Self {
        Self {
            monitor,
            alarm,
            fps: FpsMeter::default(),
            frames: 0,
        }
    }

    pub fn step(&mut self, frame: &CapturedFrame) -> FrameReport {
        self.step_at(frame, Instant::now())
    }

    /// Process one frame observed at `now`
    ///
    /// The alarm follows the state produced by this same frame, and the
    /// player is pumped last.
    pub fn step_at(&mut self, frame: &CapturedFrame, now: Instant) -> FrameReport {
        let telemetry = self.monitor.process_at(frame, now);

        if telemetry.state == FocusState::Distracted {
            self.alarm.start_alarm();
        } else {
            self.alarm.stop_alarm();
        }
        self.alarm.pump();

        self.frames += 1;
        FrameReport {
            sequence: frame.sequence,
            fps: self.fps.tick_at(now),
            alarm_active: self.alarm.alarm_active(),
            telemetry,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn monitor(&self) -> &AttentionMonitor {
        &self.monitor
    }

    pub fn alarm(&self) -> &AlarmController<B> {
        &self.alarm
    }

    pub fn summary(&self) -> SessionSummary {
        self.monitor.summary()
    }

    /// Release the audio backend and return the final totals
    pub fn finish(self) -> SessionSummary {
        let summary = self.monitor.summary();
        self.alarm.shutdown();
        summary
    }
}
