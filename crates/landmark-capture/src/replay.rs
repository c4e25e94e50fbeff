//! JSON-lines replay of recorded landmark detector output
//!
//! One record per line:
//!
//! ```text
//! {"width":640,"height":480,"landmarks":[{"x":0.51,"y":0.43,"z":-0.02}, ...]}
//! {"landmarks":null}
//! ```
//!
//! `width`/`height` fall back to the source configuration; a missing or null
//! `landmarks` field is a frame without a face. Blank lines are skipped.

use crate::frame::{CapturedFrame, Landmark, LandmarkFrame};
use crate::{CaptureError, LandmarkSource, SourceConfig};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct FrameRecord {
    width: Option<u32>,
    height: Option<u32>,
    #[serde(default)]
    landmarks: Option<Vec<Landmark>>,
}

/// Landmark source replaying a JSON-lines recording
pub struct ReplaySource<R = BufReader<File>> {
    reader: R,
    default_width: u32,
    default_height: u32,
    line: usize,
    sequence: u32,
}

impl ReplaySource {
    /// Open the recording named by `config.path`
    pub fn open(config: &SourceConfig) -> Result<Self, CaptureError> {
        let file = File::open(&config.path).map_err(|e| CaptureError::Open {
            path: config.path.clone(),
            reason: e.to_string(),
        })?;
        info!("Opened landmark recording {}", config.path.display());
        Ok(Self::from_reader(BufReader::new(file), config))
    }
}

impl<R: BufRead> ReplaySource<R> {
    /// Replay records from any buffered reader
    pub fn from_reader(reader: R, config: &SourceConfig) -> Self {
        Self {
            reader,
            default_width: config.width,
            default_height: config.height,
            line: 0,
            sequence: 0,
        }
    }

    /// Number of frames produced so far
    pub fn frames_read(&self) -> u32 {
        self.sequence
    }

    fn parse(&self, text: &str) -> Result<CapturedFrame, CaptureError> {
        let record: FrameRecord = serde_json::from_str(text).map_err(|e| CaptureError::Parse {
            line: self.line,
            reason: e.to_string(),
        })?;

        let landmarks = record.landmarks.map(LandmarkFrame::new).transpose()?;

        Ok(CapturedFrame::new(
            record.width.unwrap_or(self.default_width),
            record.height.unwrap_or(self.default_height),
            self.sequence,
            landmarks,
        ))
    }
}

impl<R: BufRead> LandmarkSource for ReplaySource<R> {
    fn next_frame(&mut self) -> Result<Option<CapturedFrame>, CaptureError> {
        let mut text = String::new();
        loop {
            text.clear();
            if self.reader.read_line(&mut text)? == 0 {
                debug!("Landmark recording exhausted after {} frames", self.sequence);
                return Ok(None);
            }
            self.line += 1;
            if !text.trim().is_empty() {
                break;
            }
        }

        let frame = self.parse(text.trim())?;
        self.sequence += 1;
        Ok(Some(frame))
    }
}
