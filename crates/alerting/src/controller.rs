//! Alarm Controller Implementation

use crate::backend::{MixerSettings, PlaybackBackend, PlaybackError};
use crate::AlertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// Which playback backend to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Simulated playback, no audio device
    #[default]
    Silent,
    /// Speaker output (requires the `rodio` feature)
    Rodio,
}

/// Alert configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Tracks played in round-robin order
    pub tracks: Vec<PathBuf>,
    /// Playback volume (default: 1.0)
    pub volume: f32,
    /// Mixer format requested at init
    pub mixer: MixerSettings,
    pub backend: BackendKind,
    /// Simulated track length for the silent backend (seconds)
    pub silent_track_seconds: f64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            tracks: vec![
                PathBuf::from("assets/abey-uth-jaa-saale.mp3"),
                PathBuf::from("assets/uth-jaa-no-censor.mp3"),
            ],
            volume: 1.0,
            mixer: MixerSettings::default(),
            backend: BackendKind::Silent,
            silent_track_seconds: 3.0,
        }
    }
}

/// Round-robin alarm over a single playback channel
///
/// While active, a track that finished on its own is followed by the next
/// one. `pump` must be called once per frame to notice completions.
pub struct AlarmController<B: PlaybackBackend> {
    config: AlertConfig,
    backend: B,
    current_index: usize,
    alarm_active: bool,
    is_playing: bool,
    released: bool,
}

impl<B: PlaybackBackend> AlarmController<B> {
    /// Initialize the backend and check the configured tracks
    pub fn new(config: AlertConfig, mut backend: B) -> Result<Self, AlertError> {
        if config.tracks.is_empty() {
            return Err(AlertError::NoTracks);
        }
        if !(0.0..=1.0).contains(&config.volume) {
            return Err(AlertError::Config(format!("volume {} outside [0, 1]", config.volume)));
        }

        backend.init(&config.mixer)?;

        for track in &config.tracks {
            if !track.is_file() {
                warn!("Alarm track not found: {} (configure alert.tracks)", track.display());
            }
        }
        info!("Alarm controller ready with {} tracks", config.tracks.len());

        Ok(Self {
            config,
            backend,
            current_index: 0,
            alarm_active: false,
            is_playing: false,
            released: false,
        })
    }

    /// Begin the alarm from the first track
    pub fn start_alarm(&mut self) {
        if self.alarm_active {
            return;
        }
        info!("Alarm started");
        self.alarm_active = true;
        self.current_index = 0;
        // a failed request is logged; the alarm stays stalled until restarted
        let _ = self.play_current();
    }

    /// Silence the alarm
    pub fn stop_alarm(&mut self) {
        if !self.alarm_active {
            return;
        }
        info!("Alarm stopped");
        self.alarm_active = false;
        self.is_playing = false;
        self.backend.stop();
    }

    /// Advance to the next track once the current one has drained
    pub fn pump(&mut self) {
        if !self.alarm_active {
            return;
        }
        if self.is_playing && !self.backend.is_busy() {
            self.current_index = (self.current_index + 1) % self.config.tracks.len();
            debug!("Track finished, advancing to {}", self.current_index);
            let _ = self.play_current();
        }
    }

    /// Load and play the track at `current_index`
    pub fn play_current(&mut self) -> Result<(), PlaybackError> {
        let track = &self.config.tracks[self.current_index];
        let result = self
            .backend
            .load(track)
            .map(|()| self.backend.set_volume(self.config.volume))
            .and_then(|()| self.backend.play());

        match &result {
            Ok(()) => {
                debug!("Playing {}", track.display());
                self.is_playing = true;
            }
            Err(e) => {
                error!("Alarm playback failed: {}", e);
                self.is_playing = false;
            }
        }
        result
    }

    /// Stop playback and release the backend
    pub fn shutdown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.alarm_active = false;
        self.is_playing = false;
        self.backend.stop();
        self.backend.quit();
        debug!("Alarm controller released");
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn tracks(&self) -> &[PathBuf] {
        &self.config.tracks
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: PlaybackBackend> Drop for AlarmController<B> {
    fn drop(&mut self) {
        self.release();
    }
}
