//! Audio playback backends
//!
//! The controller talks to one music channel through [`PlaybackBackend`].
//! Playback drains asynchronously; completion is observed by polling
//! [`PlaybackBackend::is_busy`].

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Playback errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Mixer initialization failed: {0}")]
    Init(String),

    #[error("Failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Playback failed: {0}")]
    Play(String),
}

/// Output mixer format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Sample rate (Hz)
    pub frequency: u32,
    /// Bits per sample
    pub sample_bits: u16,
    /// Signed samples
    pub signed: bool,
    pub channels: u16,
    /// Buffer size (samples)
    pub buffer: u32,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            frequency: 44_100,
            sample_bits: 16,
            signed: true,
            channels: 2,
            buffer: 2048,
        }
    }
}

/// Single music channel
pub trait PlaybackBackend {
    /// Open the output device
    fn init(&mut self, settings: &MixerSettings) -> Result<(), PlaybackError>;

    /// Load a track, replacing whatever was loaded before
    fn load(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Start the loaded track from the beginning
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn stop(&mut self);

    /// Volume in `[0.0, 1.0]`
    fn set_volume(&mut self, volume: f32);

    /// True while a track is still draining
    fn is_busy(&self) -> bool;

    /// Release the output device
    fn quit(&mut self);
}

impl<B: PlaybackBackend + ?Sized> PlaybackBackend for Box<B> {
    fn init(&mut self, settings: &MixerSettings) -> Result<(), PlaybackError> {
        (**self).init(settings)
    }

    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        (**self).load(path)
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        (**self).play()
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }

    fn is_busy(&self) -> bool {
        (**self).is_busy()
    }

    fn quit(&mut self) {
        (**self).quit()
    }
}

/// Headless backend
///
/// Every track "plays" for a fixed length on the monotonic clock. Loading a
/// file that does not exist fails, as a real decoder would.
#[derive(Debug, Clone)]
pub struct SilentBackend {
    track_length: Duration,
    initialized: bool,
    loaded: Option<PathBuf>,
    started_at: Option<Instant>,
    volume: f32,
}

impl SilentBackend {
    pub fn new(track_length: Duration) -> Self {
        Self {
            track_length,
            initialized: false,
            loaded: None,
            started_at: None,
            volume: 1.0,
        }
    }

    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Busy check against an explicit clock reading
    pub fn is_busy_at(&self, now: Instant) -> bool {
        self.started_at
            .is_some_and(|start| now.saturating_duration_since(start) < self.track_length)
    }
}

impl PlaybackBackend for SilentBackend {
    fn init(&mut self, settings: &MixerSettings) -> Result<(), PlaybackError> {
        debug!(?settings, "Silent mixer initialized");
        self.initialized = true;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
        if !self.initialized {
            return Err(PlaybackError::Init("mixer not initialized".into()));
        }
        if !path.is_file() {
            return Err(PlaybackError::Load {
                path: path.to_path_buf(),
                reason: "file not found".into(),
            });
        }
        self.loaded = Some(path.to_path_buf());
        self.started_at = None;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        let Some(path) = &self.loaded else {
            return Err(PlaybackError::Play("no track loaded".into()));
        };
        debug!("Silent playback of {}", path.display());
        self.started_at = Some(Instant::now());
        Ok(())
    }

    fn stop(&mut self) {
        self.started_at = None;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn is_busy(&self) -> bool {
        self.is_busy_at(Instant::now())
    }

    fn quit(&mut self) {
        self.stop();
        self.loaded = None;
        self.initialized = false;
        info!("Silent mixer released");
    }
}

#[cfg(feature = "rodio")]
pub use self::rodio_backend::RodioBackend;

#[cfg(feature = "rodio")]
mod rodio_backend {
    use super::{MixerSettings, PlaybackBackend, PlaybackError};
    use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use tracing::{info, warn};

    /// Speaker output through the default rodio device
    ///
    /// A fresh sink is created for every `play`, so `stop` followed by
    /// `play` always restarts cleanly.
    pub struct RodioBackend {
        stream: Option<(OutputStream, OutputStreamHandle)>,
        pending: Option<Decoder<BufReader<File>>>,
        sink: Option<Sink>,
        volume: f32,
    }

    impl RodioBackend {
        pub fn new() -> Self {
            Self {
                stream: None,
                pending: None,
                sink: None,
                volume: 1.0,
            }
        }
    }

    impl Default for RodioBackend {
        fn default() -> Self {
            Self::new()
        }
    }

    impl PlaybackBackend for RodioBackend {
        fn init(&mut self, settings: &MixerSettings) -> Result<(), PlaybackError> {
            let stream = OutputStream::try_default().map_err(|e| PlaybackError::Init(e.to_string()))?;
            // The device negotiates its own format; requested settings are advisory
            info!(
                "Audio output opened (requested {} Hz, {} ch, buffer {})",
                settings.frequency, settings.channels, settings.buffer
            );
            self.stream = Some(stream);
            Ok(())
        }

        fn load(&mut self, path: &Path) -> Result<(), PlaybackError> {
            let load_err = |reason: String| PlaybackError::Load {
                path: path.to_path_buf(),
                reason,
            };
            let file = File::open(path).map_err(|e| load_err(e.to_string()))?;
            let decoder = Decoder::new(BufReader::new(file)).map_err(|e| load_err(e.to_string()))?;
            self.pending = Some(decoder);
            Ok(())
        }

        fn play(&mut self) -> Result<(), PlaybackError> {
            let Some((_, handle)) = &self.stream else {
                return Err(PlaybackError::Play("output not initialized".into()));
            };
            let Some(source) = self.pending.take() else {
                return Err(PlaybackError::Play("no track loaded".into()));
            };
            if let Some(old) = self.sink.take() {
                old.stop();
            }
            let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Play(e.to_string()))?;
            sink.set_volume(self.volume);
            sink.append(source);
            self.sink = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            if let Some(sink) = self.sink.take() {
                sink.stop();
            }
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(sink) = &self.sink {
                sink.set_volume(self.volume);
            }
        }

        fn is_busy(&self) -> bool {
            self.sink.as_ref().is_some_and(|sink| !sink.empty())
        }

        fn quit(&mut self) {
            self.stop();
            self.pending = None;
            if self.stream.take().is_none() {
                warn!("Audio output released twice");
            }
        }
    }
}
