//! Flat editor state record.
//!
//! Everything the user configured in the editor that the export engine
//! consumes. Persisted as an opaque JSON blob; every field has a default
//! so blobs written by older versions still load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{read_json, write_json, ModelError, ModelResult};
use crate::export::ExportSettings;
use crate::geometry::{Rect, Size};
use crate::style::{
    BackgroundImageFillMode, BackgroundStyle, CameraAspect, CanvasAspect, CursorMovementSpeed,
    CursorSmoothing, CursorStyle, FullscreenFillMode, RegionTransition, RgbaColor,
};
use crate::zoom::ZoomKeyframe;

/// A half-open time span `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimeRange {
    pub fn new(start_secs: f64, end_secs: f64) -> Self {
        Self {
            start_secs,
            end_secs,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end_secs - self.start_secs).max(0.0)
    }

    /// True for a finite, non-empty range.
    pub fn is_valid(&self) -> bool {
        self.start_secs.is_finite() && self.end_secs.is_finite() && self.duration() > 0.0
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs
    }

    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start_secs.max(other.start_secs);
        let end = self.end_secs.min(other.end_secs);
        (end > start).then(|| TimeRange::new(start, end))
    }

    pub fn shifted(&self, offset: f64) -> TimeRange {
        TimeRange::new(self.start_secs + offset, self.end_secs + offset)
    }

    /// Clip `regions` to `window` and re-express them relative to its start.
    pub fn relative_to(regions: &[TimeRange], window: &TimeRange) -> Vec<TimeRange> {
        regions
            .iter()
            .filter_map(|r| r.intersection(window))
            .map(|r| r.shifted(-window.start_secs))
            .collect()
    }
}

/// Corner presets for the picture-in-picture camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PipCorner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Webcam placement, relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraLayout {
    pub relative_x: f64,
    pub relative_y: f64,
    pub relative_width: f64,
}

impl Default for CameraLayout {
    fn default() -> Self {
        Self {
            relative_x: 0.02,
            relative_y: 0.02,
            relative_width: 0.25,
        }
    }
}

impl CameraLayout {
    const CORNER_MARGIN: f64 = 0.02;

    /// Resolve to pixels on a canvas of `canvas` size.
    ///
    /// Width is relative to the canvas width; height follows the webcam aspect.
    pub fn pixel_rect(&self, canvas: Size, webcam: Size, aspect: CameraAspect) -> Rect {
        let w = canvas.width * self.relative_width;
        let h = w * aspect.height_to_width(webcam);
        Rect::new(
            canvas.width * self.relative_x,
            canvas.height * self.relative_y,
            w,
            h,
        )
    }

    /// Camera height as a fraction of canvas height.
    pub fn relative_height(&self, canvas: Size, webcam: Size, aspect: CameraAspect) -> f64 {
        if canvas.height <= 0.0 {
            return self.relative_width * 0.75;
        }
        self.relative_width * aspect.height_to_width(webcam) * canvas.width / canvas.height
    }

    /// Snap to a corner with a small margin.
    pub fn at_corner(&self, corner: PipCorner, relative_height: f64) -> CameraLayout {
        let m = Self::CORNER_MARGIN;
        let right = 1.0 - self.relative_width - m;
        let bottom = 1.0 - relative_height - m;
        let (relative_x, relative_y) = match corner {
            PipCorner::TopLeft => (m, m),
            PipCorner::TopRight => (right, m),
            PipCorner::BottomLeft => (m, bottom),
            PipCorner::BottomRight => (right, bottom),
        };
        CameraLayout {
            relative_x,
            relative_y,
            ..*self
        }
    }

    /// Keep the camera fully on the canvas.
    pub fn clamped(&self, relative_height: f64) -> CameraLayout {
        CameraLayout {
            relative_x: self
                .relative_x
                .clamp(0.0, (1.0 - self.relative_width).max(0.0)),
            relative_y: self.relative_y.clamp(0.0, (1.0 - relative_height).max(0.0)),
            ..*self
        }
    }
}

/// How cursor positions are looked up between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorLookupMode {
    /// Proportional interpolation between the bracketing samples.
    Linear,
    /// Average of the most recent samples at or before the query time.
    #[default]
    Windowed,
}

/// Parameters for automatic zoom detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoZoomSettings {
    pub zoom_level: f64,
    pub dwell_threshold_secs: f64,
    pub transition_duration_secs: f64,
}

impl Default for AutoZoomSettings {
    fn default() -> Self {
        Self {
            zoom_level: 2.0,
            dwell_threshold_secs: 0.5,
            transition_duration_secs: 0.4,
        }
    }
}

/// The editor's configuration, as consumed by export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorState {
    /// Trim window in recording time; `None` exports everything.
    pub trim: Option<TimeRange>,

    pub camera_layout: CameraLayout,
    pub camera_aspect: CameraAspect,
    /// Percent of the camera's shorter side.
    pub camera_corner_radius: f64,
    /// Canvas pixels.
    pub camera_border_width: f64,
    pub camera_border_color: RgbaColor,
    pub camera_mirrored: bool,
    /// Drop shadow strength under the PiP webcam, 0 to 100; 0 draws none.
    pub camera_shadow: f64,
    /// Recording-time spans where the webcam fills the canvas.
    pub camera_fullscreen_regions: Vec<TimeRange>,
    pub camera_fullscreen_fill_mode: FullscreenFillMode,
    pub camera_fullscreen_aspect: CameraAspect,
    pub camera_transition: RegionTransition,

    pub background_style: BackgroundStyle,
    pub background_image_fill_mode: BackgroundImageFillMode,
    pub canvas_aspect: CanvasAspect,
    /// Fraction of the screen size added around it on each side.
    pub padding: f64,
    /// Canvas pixels.
    pub video_corner_radius: f64,

    pub show_cursor: bool,
    pub cursor_style: CursorStyle,
    /// Points, at capture scale.
    pub cursor_size: f64,
    pub cursor_lookup: CursorLookupMode,
    pub cursor_smoothing: CursorSmoothing,
    /// Spring smoothing of the recorded path; `None` keeps it raw.
    pub cursor_movement_speed: Option<CursorMovementSpeed>,

    pub show_click_highlights: bool,
    pub click_highlight_color: RgbaColor,
    pub click_highlight_size: f64,
    pub click_highlight_duration_secs: f64,

    pub zoom_enabled: bool,
    pub zoom_follow_cursor: bool,
    pub auto_zoom_enabled: bool,
    pub auto_zoom: AutoZoomSettings,
    /// Recording-time keyframes placed by hand.
    pub zoom_keyframes: Vec<ZoomKeyframe>,

    /// Recording-time spans where system audio is audible; `None` = whole trim.
    pub system_audio_regions: Option<Vec<TimeRange>>,
    pub microphone_audio_regions: Option<Vec<TimeRange>>,
    pub system_audio_volume: f64,
    pub microphone_volume: f64,

    pub export: ExportSettings,
}

impl Default for EditorState {
    fn default() -> Self {
        Self {
            trim: None,
            camera_layout: CameraLayout::default(),
            camera_aspect: CameraAspect::Original,
            camera_corner_radius: 12.0,
            camera_border_width: 0.0,
            camera_border_color: RgbaColor::WHITE,
            camera_mirrored: false,
            camera_shadow: 0.0,
            camera_fullscreen_regions: Vec::new(),
            camera_fullscreen_fill_mode: FullscreenFillMode::Fill,
            camera_fullscreen_aspect: CameraAspect::Original,
            camera_transition: RegionTransition::default(),
            background_style: BackgroundStyle::None,
            background_image_fill_mode: BackgroundImageFillMode::Fill,
            canvas_aspect: CanvasAspect::Original,
            padding: 0.0,
            video_corner_radius: 0.0,
            show_cursor: true,
            cursor_style: CursorStyle::Arrow,
            cursor_size: 24.0,
            cursor_lookup: CursorLookupMode::Windowed,
            cursor_smoothing: CursorSmoothing::Standard,
            cursor_movement_speed: None,
            show_click_highlights: true,
            click_highlight_color: RgbaColor::rgb(0.2, 0.5, 1.0),
            click_highlight_size: 36.0,
            click_highlight_duration_secs: 0.4,
            zoom_enabled: true,
            zoom_follow_cursor: true,
            auto_zoom_enabled: false,
            auto_zoom: AutoZoomSettings::default(),
            zoom_keyframes: Vec::new(),
            system_audio_regions: None,
            microphone_audio_regions: None,
            system_audio_volume: 1.0,
            microphone_volume: 1.0,
            export: ExportSettings::default(),
        }
    }
}

impl EditorState {
    /// Serialize to an opaque blob.
    pub fn to_bytes(&self) -> ModelResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| ModelError::Parse {
            what: "editor state",
            source,
        })
    }

    /// Deserialize from a blob produced by [`EditorState::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> ModelResult<Self> {
        serde_json::from_slice(bytes).map_err(|source| ModelError::Parse {
            what: "editor state",
            source,
        })
    }

    pub fn load(path: &Path) -> ModelResult<Self> {
        read_json(path, "editor state")
    }

    pub fn save(&self, path: &Path) -> ModelResult<()> {
        write_json(path, "editor state", self)
    }

    /// The trim window to export, falling back to `[0, duration)` when the
    /// stored trim is missing, empty, or reaches past the source.
    pub fn effective_trim(&self, source_duration: f64) -> TimeRange {
        let full = TimeRange::new(0.0, source_duration.max(0.0));
        match self.trim {
            Some(trim) if trim.is_valid() => trim.intersection(&full).unwrap_or(full),
            _ => full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pip_rect_math() {
        let layout = CameraLayout {
            relative_x: 0.7,
            relative_y: 0.7,
            relative_width: 0.25,
        };
        let rect = layout.pixel_rect(
            Size::new(1920.0, 1080.0),
            Size::new(640.0, 480.0),
            CameraAspect::Original,
        );
        assert!((rect.x - 1344.0).abs() < 1e-9);
        assert!((rect.y - 756.0).abs() < 1e-9);
        assert!((rect.width - 480.0).abs() < 1e-9);
        assert!((rect.height - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_corner_snapping() {
        let layout = CameraLayout::default();
        let rel_h = 0.2;
        let br = layout.at_corner(PipCorner::BottomRight, rel_h);
        assert!((br.relative_x - 0.73).abs() < 1e-9);
        assert!((br.relative_y - 0.78).abs() < 1e-9);

        let off = CameraLayout {
            relative_x: 0.95,
            relative_y: -0.1,
            relative_width: 0.25,
        }
        .clamped(rel_h);
        assert!((off.relative_x - 0.75).abs() < 1e-9);
        assert!(off.relative_y.abs() < 1e-9);
    }

    #[test]
    fn test_bytes_round_trip_preserves_state() {
        let mut state = EditorState::default();
        state.trim = Some(TimeRange::new(1.0, 4.0));
        state.background_style = BackgroundStyle::Gradient { gradient_id: 5 };
        state.camera_fullscreen_regions = vec![TimeRange::new(2.0, 3.0)];
        let bytes = state.to_bytes().unwrap();
        assert_eq!(EditorState::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn test_older_blob_fills_defaults() {
        let state = EditorState::from_bytes(br#"{"padding":0.1}"#).unwrap();
        assert!((state.padding - 0.1).abs() < 1e-9);
        assert!((state.cursor_size - 24.0).abs() < 1e-9);
        assert!(state.show_click_highlights);
    }

    #[test]
    fn test_effective_trim() {
        let mut state = EditorState::default();
        assert_eq!(state.effective_trim(10.0), TimeRange::new(0.0, 10.0));

        state.trim = Some(TimeRange::new(2.0, 2.0));
        assert_eq!(state.effective_trim(10.0), TimeRange::new(0.0, 10.0));

        state.trim = Some(TimeRange::new(2.0, 20.0));
        assert_eq!(state.effective_trim(10.0), TimeRange::new(2.0, 10.0));
    }

    #[test]
    fn test_regions_relative_to_trim() {
        let window = TimeRange::new(2.0, 6.0);
        let regions = vec![
            TimeRange::new(0.0, 1.0),
            TimeRange::new(1.0, 3.0),
            TimeRange::new(5.0, 9.0),
        ];
        let rel = TimeRange::relative_to(&regions, &window);
        assert_eq!(rel, vec![TimeRange::new(0.0, 1.0), TimeRange::new(3.0, 4.0)]);
    }
}
