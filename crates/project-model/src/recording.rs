//! The recording manifest (`recording.json`).
//!
//! Written once a capture session finishes; the export engine treats it
//! as read-only. Relative paths resolve against the manifest's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{read_json, write_json, ModelError, ModelResult};
use crate::geometry::Size;

/// Media produced by one recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    pub screen_video: PathBuf,

    #[serde(default)]
    pub webcam_video: Option<PathBuf>,

    #[serde(default)]
    pub system_audio: Option<PathBuf>,

    #[serde(default)]
    pub microphone_audio: Option<PathBuf>,

    /// Cursor metadata captured alongside the screen.
    #[serde(default)]
    pub cursor_metadata: Option<PathBuf>,

    /// Screen video pixel size.
    pub screen_size: Size,

    #[serde(default)]
    pub webcam_size: Option<Size>,

    /// Capture frame rate.
    pub fps: f64,

    /// When recording finished (RFC 3339).
    #[serde(default)]
    pub recorded_at: Option<String>,
}

impl RecordingResult {
    pub fn new(screen_video: impl Into<PathBuf>, screen_size: Size, fps: f64) -> Self {
        Self {
            screen_video: screen_video.into(),
            webcam_video: None,
            system_audio: None,
            microphone_audio: None,
            cursor_metadata: None,
            screen_size,
            webcam_size: None,
            fps,
            recorded_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Load a manifest and resolve its media paths against its directory.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let mut result: Self = read_json(path, "recording manifest")?;
        result.validate()?;
        if let Some(base) = path.parent() {
            result.resolve_paths(base);
        }
        Ok(result)
    }

    pub fn save(&self, path: &Path) -> ModelResult<()> {
        write_json(path, "recording manifest", self)
    }

    /// Make every relative media path absolute under `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.screen_video);
        for p in [
            &mut self.webcam_video,
            &mut self.system_audio,
            &mut self.microphone_audio,
            &mut self.cursor_metadata,
        ]
        .into_iter()
        .flatten()
        {
            resolve(p);
        }
    }

    pub fn has_webcam(&self) -> bool {
        self.webcam_video.is_some()
    }

    pub fn has_audio(&self) -> bool {
        self.system_audio.is_some() || self.microphone_audio.is_some()
    }

    fn validate(&self) -> ModelResult<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ModelError::Invalid {
                what: "recording manifest",
                message: format!("fps must be positive, got {}", self.fps),
            });
        }
        if self.screen_size.is_empty() {
            return Err(ModelError::Invalid {
                what: "recording manifest",
                message: "screen size must be non-empty".to_string(),
            });
        }
        Ok(())
    }
}
