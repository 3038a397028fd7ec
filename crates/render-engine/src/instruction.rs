//! Immutable per-export composition parameters.
//!
//! A [`CompositionInstruction`] is built once from the recording and the
//! editor state and then shared read-only by every render worker. All
//! geometry is in output (render) pixels; all times are trim-relative.

use std::sync::Arc;

use reel_common::error::{ExportError, ExportResult};
use reel_processing_core::cursor_metadata::CursorMetadataSnapshot;
use reel_project_model::editor::{EditorState, TimeRange};
use reel_project_model::geometry::{Rect, Size};
use reel_project_model::recording::RecordingResult;
use reel_project_model::style::{
    CameraAspect, CursorStyle, FullscreenFillMode, RegionTransition, RgbaColor,
};
use reel_project_model::zoom::ZoomTimeline;

use crate::background::BackgroundFill;
use crate::frame::PixelBuffer;

/// Source track identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackId {
    Screen,
    Webcam,
}

impl TrackId {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackId::Screen => "screen",
            TrackId::Webcam => "webcam",
        }
    }
}

/// Resolved webcam layout.
#[derive(Debug, Clone)]
pub struct CameraPlacement {
    /// Picture-in-picture rect.
    pub pip_rect: Rect,
    pub corner_radius: f64,
    pub border_width: f64,
    pub border_color: RgbaColor,
    pub mirrored: bool,
    /// Drop shadow blur radius in canvas pixels; 0 when off.
    pub shadow_blur: f64,
    /// Trim-relative spans during which the camera fills the canvas.
    pub fullscreen_regions: Vec<TimeRange>,
    pub fullscreen_fill: FullscreenFillMode,
    pub fullscreen_aspect: CameraAspect,
    pub transition: RegionTransition,
    /// Native webcam frame size.
    pub source_size: Size,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorOverlay {
    pub style: CursorStyle,
    /// Glyph size in capture-area points.
    pub size: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickHighlight {
    pub color: RgbaColor,
    /// Base diameter in capture-area points.
    pub size: f64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone)]
pub struct ZoomOverlay {
    /// Keyframes in recording time.
    pub timeline: ZoomTimeline,
    pub follow_cursor: bool,
}

/// Everything the compositor needs for one export.
#[derive(Debug, Clone)]
pub struct CompositionInstruction {
    /// Trim-relative validity: `[0, trim duration)`.
    pub time_range: TimeRange,
    /// Recording time of composition time zero.
    pub trim_start: f64,
    pub screen_track: TrackId,
    pub webcam_track: Option<TrackId>,
    pub render_width: u32,
    pub render_height: u32,
    /// Where the screen recording lands on the canvas.
    pub screen_rect: Rect,
    pub screen_corner_radius: f64,
    pub background: BackgroundFill,
    pub camera: Option<CameraPlacement>,
    pub cursor: Option<CursorOverlay>,
    pub clicks: Option<ClickHighlight>,
    pub zoom: Option<ZoomOverlay>,
    pub cursor_snapshot: Option<Arc<CursorMetadataSnapshot>>,
    /// Canvas pixels per capture-area point.
    pub cursor_scale: f64,
}

/// Per-export inputs that are not part of the editor record.
#[derive(Debug, Clone, Default)]
pub struct InstructionInputs<'a> {
    pub trim: Option<TimeRange>,
    pub cursor_snapshot: Option<Arc<CursorMetadataSnapshot>>,
    pub zoom_timeline: Option<ZoomTimeline>,
    pub background_image: Option<&'a PixelBuffer>,
}

impl CompositionInstruction {
    /// Resolve the editor state against the recording.
    ///
    /// The canvas is the screen size, grown to the canvas aspect or by the
    /// padding. The output width comes from the export resolution and the
    /// height follows the canvas aspect; both are rounded to even pixels.
    pub fn build(
        recording: &RecordingResult,
        editor: &EditorState,
        inputs: InstructionInputs<'_>,
    ) -> ExportResult<Self> {
        let screen = recording.screen_size;
        if screen.is_empty() {
            return Err(ExportError::invalid(format!(
                "screen size {}x{} is empty",
                screen.width, screen.height
            )));
        }
        let padding = editor.padding.clamp(0.0, 0.5);

        let canvas = editor.canvas_aspect.size_for(screen).unwrap_or(if padding > 0.0 {
            screen.scaled(1.0 + 2.0 * padding)
        } else {
            screen
        });

        let target_width = editor
            .export
            .resolution
            .pixel_width()
            .unwrap_or(canvas.width);
        let target_height = (target_width * canvas.height / canvas.width).round();
        let (render_width, render_height) = Size::new(target_width, target_height).to_even_pixels();
        let sx = render_width as f64 / canvas.width;
        let sy = render_height as f64 / canvas.height;
        let render_rect = Rect::new(0.0, 0.0, render_width as f64, render_height as f64);

        let content = render_rect.inset(padding * screen.width * sx, padding * screen.height * sy);
        let screen_rect = content.aspect_fit(screen);

        let trim = inputs
            .trim
            .unwrap_or_else(|| TimeRange::new(0.0, f64::INFINITY));

        let camera = match (&recording.webcam_video, recording.webcam_size) {
            (Some(_), Some(webcam)) if !webcam.is_empty() => {
                let pip_rect = editor
                    .camera_layout
                    .pixel_rect(canvas, webcam, editor.camera_aspect)
                    .scaled(sx, sy);
                Some(CameraPlacement {
                    pip_rect,
                    corner_radius: pip_rect.width.min(pip_rect.height)
                        * editor.camera_corner_radius.clamp(0.0, 50.0)
                        / 100.0,
                    border_width: editor.camera_border_width.max(0.0) * sx,
                    border_color: editor.camera_border_color,
                    mirrored: editor.camera_mirrored,
                    shadow_blur: pip_rect.width.min(pip_rect.height)
                        * editor.camera_shadow.clamp(0.0, 100.0)
                        / 2000.0,
                    fullscreen_regions: TimeRange::relative_to(
                        &editor.camera_fullscreen_regions,
                        &trim,
                    ),
                    fullscreen_fill: editor.camera_fullscreen_fill_mode,
                    fullscreen_aspect: editor.camera_fullscreen_aspect,
                    transition: editor.camera_transition,
                    source_size: webcam,
                })
            }
            _ => None,
        };

        let background = BackgroundFill::prepare(
            &editor.background_style,
            editor.background_image_fill_mode,
            render_width,
            render_height,
            inputs.background_image,
        )?;

        let capture_width = inputs
            .cursor_snapshot
            .as_ref()
            .map(|s| s.capture_size().width)
            .filter(|w| *w > 0.0)
            .unwrap_or(screen.width);
        let cursor_scale = screen_rect.width / capture_width;

        let has_cursor_data = inputs
            .cursor_snapshot
            .as_ref()
            .is_some_and(|s| !s.is_empty());
        let cursor = (editor.show_cursor && has_cursor_data).then_some(CursorOverlay {
            style: editor.cursor_style,
            size: editor.cursor_size.max(0.0),
        });
        let has_clicks = inputs
            .cursor_snapshot
            .as_ref()
            .is_some_and(|s| !s.clicks().is_empty());
        let clicks = (editor.show_click_highlights
            && has_clicks
            && editor.click_highlight_duration_secs > 0.0)
            .then_some(ClickHighlight {
                color: editor.click_highlight_color,
                size: editor.click_highlight_size.max(0.0),
                duration_secs: editor.click_highlight_duration_secs,
            });

        let zoom = inputs
            .zoom_timeline
            .filter(|timeline| editor.zoom_enabled && !timeline.is_empty())
            .map(|timeline| ZoomOverlay {
                timeline,
                follow_cursor: editor.zoom_follow_cursor,
            });

        let instruction = Self {
            time_range: TimeRange::new(0.0, trim.duration()),
            trim_start: if trim.start_secs.is_finite() { trim.start_secs } else { 0.0 },
            screen_track: TrackId::Screen,
            webcam_track: camera.as_ref().map(|_| TrackId::Webcam),
            render_width,
            render_height,
            screen_rect,
            screen_corner_radius: editor.video_corner_radius.max(0.0) * sx,
            background,
            camera,
            cursor,
            clicks,
            zoom,
            cursor_snapshot: inputs.cursor_snapshot,
            cursor_scale,
        };

        tracing::debug!(
            render_width,
            render_height,
            canvas_width = canvas.width,
            canvas_height = canvas.height,
            has_camera = instruction.camera.is_some(),
            has_cursor = instruction.cursor.is_some(),
            has_zoom = instruction.zoom.is_some(),
            "Built composition instruction"
        );
        Ok(instruction)
    }

    pub fn render_size(&self) -> Size {
        Size::new(self.render_width as f64, self.render_height as f64)
    }

    pub fn canvas_rect(&self) -> Rect {
        Rect::from_size(self.render_size())
    }

    /// Map a normalized capture-area point to canvas pixels.
    pub fn capture_to_canvas(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.screen_rect.x + x * self.screen_rect.width,
            self.screen_rect.y + y * self.screen_rect.height,
        )
    }

    /// Recording time for a composition time.
    pub fn recording_time(&self, composition_time: f64) -> f64 {
        composition_time + self.trim_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_processing_core::cursor_metadata::CursorLookup;
    use reel_project_model::cursor::CursorSample;
    use reel_project_model::editor::CameraLayout;
    use reel_project_model::export::ExportResolution;
    use reel_project_model::style::CanvasAspect;

    fn recording_with_webcam() -> RecordingResult {
        let mut recording = RecordingResult::new("screen.mp4", Size::new(1920.0, 1080.0), 30.0);
        recording.webcam_video = Some("webcam.mp4".into());
        recording.webcam_size = Some(Size::new(640.0, 480.0));
        recording
    }

    #[test]
    fn test_pip_rect_at_full_hd() {
        let editor = EditorState {
            camera_layout: CameraLayout {
                relative_x: 0.7,
                relative_y: 0.7,
                relative_width: 0.25,
            },
            camera_corner_radius: 10.0,
            ..EditorState::default()
        };
        let instruction =
            CompositionInstruction::build(&recording_with_webcam(), &editor, Default::default())
                .unwrap();
        assert_eq!((instruction.render_width, instruction.render_height), (1920, 1080));
        let camera = instruction.camera.unwrap();
        let r = camera.pip_rect;
        assert!((r.x - 1344.0).abs() < 1e-9);
        assert!((r.y - 756.0).abs() < 1e-9);
        assert!((r.width - 480.0).abs() < 1e-9);
        assert!((r.height - 360.0).abs() < 1e-9);
        assert!((camera.corner_radius - 36.0).abs() < 1e-9);
        assert_eq!(camera.shadow_blur, 0.0);
        assert_eq!(instruction.webcam_track, Some(TrackId::Webcam));
    }

    #[test]
    fn test_camera_shadow_scales_with_pip_size() {
        let editor = EditorState {
            camera_layout: CameraLayout {
                relative_x: 0.7,
                relative_y: 0.7,
                relative_width: 0.25,
            },
            camera_shadow: 50.0,
            ..EditorState::default()
        };
        let instruction =
            CompositionInstruction::build(&recording_with_webcam(), &editor, Default::default())
                .unwrap();
        // 480x360 PiP: 360 * 50 / 2000.
        assert!((instruction.camera.unwrap().shadow_blur - 9.0).abs() < 1e-9);
    }

    #[test]
    fn test_padding_grows_canvas_and_insets_screen() {
        let editor = EditorState {
            padding: 0.1,
            ..EditorState::default()
        };
        let recording = RecordingResult::new("screen.mp4", Size::new(1000.0, 500.0), 30.0);
        let instruction =
            CompositionInstruction::build(&recording, &editor, Default::default()).unwrap();
        assert_eq!((instruction.render_width, instruction.render_height), (1200, 600));
        let r = instruction.screen_rect;
        assert!((r.x - 100.0).abs() < 1e-9);
        assert!((r.y - 50.0).abs() < 1e-9);
        assert!((r.width - 1000.0).abs() < 1e-9);
        assert!(instruction.camera.is_none());
    }

    #[test]
    fn test_resolution_scales_geometry() {
        let mut editor = EditorState {
            canvas_aspect: CanvasAspect::Ratio1x1,
            ..EditorState::default()
        };
        editor.export.resolution = ExportResolution::P720;
        let instruction =
            CompositionInstruction::build(&recording_with_webcam(), &editor, Default::default())
                .unwrap();
        assert_eq!((instruction.render_width, instruction.render_height), (1280, 1280));
        // 16:9 screen letterboxed into the square canvas.
        assert!((instruction.screen_rect.height - 720.0).abs() < 1e-6);
        assert!((instruction.screen_rect.y - 280.0).abs() < 1e-6);
    }

    #[test]
    fn test_fullscreen_regions_become_trim_relative() {
        let editor = EditorState {
            camera_fullscreen_regions: vec![TimeRange::new(1.0, 3.0), TimeRange::new(8.0, 9.0)],
            ..EditorState::default()
        };
        let inputs = InstructionInputs {
            trim: Some(TimeRange::new(2.0, 6.0)),
            ..Default::default()
        };
        let instruction =
            CompositionInstruction::build(&recording_with_webcam(), &editor, inputs).unwrap();
        let camera = instruction.camera.unwrap();
        assert_eq!(camera.fullscreen_regions, vec![TimeRange::new(0.0, 1.0)]);
        assert_eq!(instruction.trim_start, 2.0);
        assert_eq!(instruction.time_range.duration(), 4.0);
    }

    #[test]
    fn test_cursor_overlay_requires_samples() {
        let editor = EditorState::default();
        let recording = recording_with_webcam();
        let without =
            CompositionInstruction::build(&recording, &editor, Default::default()).unwrap();
        assert!(without.cursor.is_none());

        let snapshot = CursorMetadataSnapshot::new(
            vec![CursorSample::new(0.0, 0.5, 0.5)],
            Vec::new(),
            Size::new(960.0, 540.0),
            CursorLookup::Linear,
        );
        let inputs = InstructionInputs {
            cursor_snapshot: Some(Arc::new(snapshot)),
            ..Default::default()
        };
        let with = CompositionInstruction::build(&recording, &editor, inputs).unwrap();
        assert!(with.cursor.is_some());
        assert!(with.clicks.is_none());
        assert!((with.cursor_scale - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_screen_is_rejected() {
        let recording = RecordingResult::new("screen.mp4", Size::new(0.0, 0.0), 30.0);
        let err = CompositionInstruction::build(&recording, &EditorState::default(), Default::default())
            .unwrap_err();
        assert!(matches!(err, ExportError::InvalidRequest { .. }));
    }
}
