//! FocusGuard
//!
//! Wires the landmark source, the attention pipeline and the audio alarm
//! into a frame-paced loop that runs until the stream ends or Ctrl-C.

pub mod session;
pub mod settings;

pub use session::{FpsMeter, FrameReport, Session};
pub use settings::{LoggingConfig, OutputConfig, Settings, DEFAULT_CONFIG_FILE};

use alerting::{AlarmController, AlertError, PlaybackBackend};
use attention::{AttentionError, AttentionMonitor, SessionSummary};
use landmark_capture::{CaptureError, LandmarkSource, ReplaySource};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Attention error: {0}")]
    Attention(#[from] AttentionError),

    #[error("Alert error: {0}")]
    Alert(#[from] AlertError),

    #[error("Logging error: {0}")]
    Logging(String),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Interrupted,
    ReadError,
}

/// Initialize logging
pub fn init_logging(config: &LoggingConfig) -> Result<(), AppError> {
    let builder = FmtSubscriber::builder()
        .with_max_level(config.max_level()?)
        .with_target(true)
        .with_writer(std::io::stderr);

    let result = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };
    result.map_err(|e| AppError::Logging(e.to_string()))
}

/// Run a full session with the configured source and backend
pub async fn run(settings: Settings) -> Result<SessionSummary, AppError> {
    let mut source = ReplaySource::open(&settings.capture)?;
    info!("Landmark source opened: {}", settings.capture.path.display());

    let monitor = AttentionMonitor::new(settings.attention.clone())?;
    let backend = alerting::open_backend(&settings.alert)?;
    let alarm = AlarmController::new(settings.alert.clone(), backend)?;
    let mut session = Session::new(monitor, alarm);

    let reason = drive(
        &mut source,
        &mut session,
        settings.capture.frame_interval(),
        &settings.output,
    )
    .await;
    info!("Session ended ({:?}) after {} frames", reason, session.frames());

    let summary = session.finish();
    drop(source);
    Ok(summary)
}

/// Pull frames at `frame_interval` until the stream ends, a read fails or
/// Ctrl-C arrives
pub async fn drive<S, B>(
    source: &mut S,
    session: &mut Session<B>,
    frame_interval: Duration,
    output: &OutputConfig,
) -> StopReason
where
    S: LandmarkSource,
    B: PlaybackBackend,
{
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupt received, shutting down");
                return StopReason::Interrupted;
            }
            tick = ticker.tick() => {
                let frame = match source.next_frame() {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        info!("Landmark stream ended");
                        return StopReason::EndOfStream;
                    }
                    Err(e) => {
                        error!("Failed to read frame: {}", e);
                        return StopReason::ReadError;
                    }
                };

                let report = session.step_at(&frame, tick.into_std());
                debug!(
                    seq = report.sequence,
                    state = %report.telemetry.state,
                    fps = report.fps,
                    alarm = report.alarm_active,
                    "Frame processed"
                );
                if output.telemetry_json {
                    if let Err(e) = emit_telemetry(&report) {
                        error!("Failed to write telemetry: {}", e);
                    }
                }
            }
        }
    }
}

fn emit_telemetry(report: &FrameReport) -> Result<(), AppError> {
    use std::io::Write;

    let line = serde_json::to_string(report)?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    Ok(())
}
