//! Recorded cursor metadata (`cursor.json`).
//!
//! Captured alongside the screen video at a fixed sample rate. Positions
//! are normalized to the capture area; times are seconds since the
//! screen recording started.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{read_json, write_json, ModelError, ModelResult};
use crate::viewport::Point2D;

/// Schema version written by this crate.
pub const CURSOR_METADATA_VERSION: u32 = 1;

/// One pointer position sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorSample {
    /// Seconds since recording start.
    pub t: f64,
    /// Normalized X.
    pub x: f64,
    /// Normalized Y.
    pub y: f64,
    /// Whether a mouse button was held.
    #[serde(default)]
    pub p: bool,
}

impl CursorSample {
    pub fn new(t: f64, x: f64, y: f64) -> Self {
        Self { t, x, y, p: false }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// A mouse-button press.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CursorClickEvent {
    pub t: f64,
    pub x: f64,
    pub y: f64,
    /// 0 = primary, 1 = secondary, 2+ = other buttons.
    #[serde(default)]
    pub button: u8,
}

impl CursorClickEvent {
    pub fn new(t: f64, x: f64, y: f64) -> Self {
        Self {
            t,
            x,
            y,
            button: 0,
        }
    }

    pub fn point(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

/// A key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystrokeEvent {
    pub t: f64,
    pub key_code: u16,
    #[serde(default)]
    pub modifiers: u64,
    pub is_down: bool,
}

/// The whole cursor metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorMetadataFile {
    pub version: u32,
    /// Capture area width in points.
    pub capture_area_width: f64,
    /// Capture area height in points.
    pub capture_area_height: f64,
    /// Backing scale of the captured display.
    pub display_scale: f64,
    pub sample_rate_hz: u32,
    #[serde(default)]
    pub samples: Vec<CursorSample>,
    #[serde(default)]
    pub clicks: Vec<CursorClickEvent>,
    #[serde(default)]
    pub keystrokes: Vec<KeystrokeEvent>,
}

impl CursorMetadataFile {
    pub fn new(capture_area_width: f64, capture_area_height: f64, display_scale: f64) -> Self {
        Self {
            version: CURSOR_METADATA_VERSION,
            capture_area_width,
            capture_area_height,
            display_scale,
            sample_rate_hz: 120,
            samples: Vec::new(),
            clicks: Vec::new(),
            keystrokes: Vec::new(),
        }
    }

    /// Parse from JSON text and normalize ordering.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let mut file: Self = serde_json::from_str(json).map_err(|source| ModelError::Parse {
            what: "cursor metadata",
            source,
        })?;
        file.validate()?;
        file.normalize();
        Ok(file)
    }

    /// Load from disk and normalize ordering.
    pub fn load(path: &Path) -> ModelResult<Self> {
        let mut file: Self = read_json(path, "cursor metadata")?;
        file.validate()?;
        file.normalize();
        Ok(file)
    }

    pub fn save(&self, path: &Path) -> ModelResult<()> {
        write_json(path, "cursor metadata", self)
    }

    /// Stable-sort samples, clicks, and keystrokes by time.
    pub fn normalize(&mut self) {
        self.samples.sort_by(|a, b| a.t.total_cmp(&b.t));
        self.clicks.sort_by(|a, b| a.t.total_cmp(&b.t));
        self.keystrokes.sort_by(|a, b| a.t.total_cmp(&b.t));
    }

    fn validate(&self) -> ModelResult<()> {
        let finite = self
            .samples
            .iter()
            .all(|s| s.t.is_finite() && s.x.is_finite() && s.y.is_finite())
            && self
                .clicks
                .iter()
                .all(|c| c.t.is_finite() && c.x.is_finite() && c.y.is_finite());
        if !finite {
            return Err(ModelError::Invalid {
                what: "cursor metadata",
                message: "non-finite sample values".to_string(),
            });
        }
        Ok(())
    }

    /// Time of the last recorded sample or click.
    pub fn last_timestamp(&self) -> f64 {
        let s = self.samples.last().map(|s| s.t).unwrap_or(0.0);
        let c = self.clicks.last().map(|c| c.t).unwrap_or(0.0);
        s.max(c)
    }
}
