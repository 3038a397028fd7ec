//! Frame compositor: combines screen, webcam, cursor, and effects.
//!
//! Compositing happens in two steps. [`FrameComposition::resolve`] samples
//! everything time-dependent (zoom, cursor, clicks, camera phase) for one
//! composition time; [`render_frame`] then draws it. Both are pure: the same
//! inputs always produce the same pixels, and concurrent calls only need
//! distinct output buffers.

use reel_common::error::{ExportError, ExportResult};
use reel_processing_core::cursor_metadata::ActiveClick;
use reel_project_model::style::RgbaColor;
use reel_project_model::viewport::{Point2D, Viewport};
use reel_project_model::zoom::ZoomState;

use crate::camera::{draw_camera, CameraPhase};
use crate::frame::PixelBuffer;
use crate::instruction::CompositionInstruction;
use crate::overlay::{draw_click_highlight, draw_cursor};
use crate::raster::Canvas;

/// The time-dependent state of a single output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameComposition {
    /// Trim-relative time.
    pub time_secs: f64,

    /// Time in the source recording.
    pub recording_secs: f64,

    /// Visible canvas region, normalized; `Viewport::FULL` when not zoomed.
    pub viewport: Viewport,

    pub zoom_level: f64,

    /// Cursor hotspot in canvas pixels.
    pub cursor: Option<(f64, f64)>,

    /// Click highlights still animating.
    pub clicks: Vec<ActiveClick>,

    /// Camera phase when a webcam track is composited.
    pub camera: Option<CameraPhase>,
}

impl FrameComposition {
    pub fn resolve(instruction: &CompositionInstruction, time_secs: f64) -> Self {
        let recording_secs = instruction.recording_time(time_secs);
        let snapshot = instruction.cursor_snapshot.as_deref();

        let cursor_point = snapshot
            .filter(|s| !s.is_empty())
            .map(|s| s.position_at(recording_secs));

        let zoom = instruction
            .zoom
            .as_ref()
            .map(|z| {
                let state = z.timeline.state_at(recording_secs);
                match cursor_point {
                    Some(p) if z.follow_cursor && state.is_zoomed() => ZoomState {
                        level: state.level,
                        focus: p,
                    },
                    _ => state,
                }
            })
            .unwrap_or(ZoomState::IDENTITY);

        let viewport = if zoom.is_zoomed() {
            let (fx, fy) = instruction.capture_to_canvas(zoom.focus.x, zoom.focus.y);
            let size = instruction.render_size();
            Viewport::from_zoom(zoom.level, Point2D::new(fx / size.width, fy / size.height))
        } else {
            Viewport::FULL
        };

        let cursor = instruction
            .cursor
            .and(cursor_point)
            .map(|p| instruction.capture_to_canvas(p.x, p.y));

        let clicks = match (instruction.clicks, snapshot) {
            (Some(style), Some(snapshot)) => {
                snapshot.active_clicks(recording_secs, style.duration_secs)
            }
            _ => Vec::new(),
        };

        let camera = instruction
            .camera
            .as_ref()
            .map(|c| CameraPhase::at(&c.fullscreen_regions, c.transition, time_secs));

        Self {
            time_secs,
            recording_secs,
            viewport,
            zoom_level: if zoom.is_zoomed() { zoom.level } else { 1.0 },
            cursor,
            clicks,
            camera,
        }
    }
}

/// Composite one output frame into `out`.
///
/// `out` must already have the instruction's render size. A missing webcam
/// frame simply leaves the camera layer out.
pub fn render_frame(
    screen: &PixelBuffer,
    webcam: Option<&PixelBuffer>,
    time_secs: f64,
    instruction: &CompositionInstruction,
    out: &mut PixelBuffer,
) -> ExportResult<()> {
    if (out.width(), out.height()) != (instruction.render_width, instruction.render_height) {
        return Err(ExportError::invalid(format!(
            "output buffer is {}x{}, expected {}x{}",
            out.width(),
            out.height(),
            instruction.render_width,
            instruction.render_height
        )));
    }
    let frame = FrameComposition::resolve(instruction, time_secs);
    let mut canvas = Canvas::new(out);
    canvas.clear(RgbaColor::BLACK);

    let camera_covers = webcam.is_some() && frame.camera.is_some_and(|p| p.covers_canvas());
    if !camera_covers {
        draw_screen_layers(&mut canvas, screen, &frame, instruction);
    }

    // The camera is composited over the zoomed content, never zoomed itself.
    if let (Some(image), Some(camera), Some(phase)) =
        (webcam, instruction.camera.as_ref(), frame.camera)
    {
        draw_camera(&mut canvas, image, camera, phase, &instruction.background);
    }
    Ok(())
}

/// Allocate and composite a frame.
pub fn render(
    screen: &PixelBuffer,
    webcam: Option<&PixelBuffer>,
    time_secs: f64,
    instruction: &CompositionInstruction,
) -> ExportResult<PixelBuffer> {
    let mut out = PixelBuffer::try_new(instruction.render_width, instruction.render_height)?;
    render_frame(screen, webcam, time_secs, instruction, &mut out)?;
    Ok(out)
}

/// Background, screen, cursor, and clicks, all under the zoom transform.
fn draw_screen_layers(
    canvas: &mut Canvas<'_>,
    screen: &PixelBuffer,
    frame: &FrameComposition,
    instruction: &CompositionInstruction,
) {
    let bounds = canvas.bounds();
    canvas.save();
    if frame.zoom_level > 1.0 {
        canvas.scale(frame.zoom_level, frame.zoom_level);
        canvas.translate(-frame.viewport.x * bounds.width, -frame.viewport.y * bounds.height);
    }

    instruction.background.draw(canvas, bounds);

    canvas.save();
    if instruction.screen_corner_radius > 0.0 {
        canvas.clip_rounded_rect(instruction.screen_rect, instruction.screen_corner_radius);
    }
    canvas.draw_image(screen, instruction.screen_rect);
    canvas.restore();

    if let (Some(overlay), Some(at)) = (instruction.cursor, frame.cursor) {
        draw_cursor(canvas, overlay.style, at, overlay.size * instruction.cursor_scale);
    }

    if let Some(style) = instruction.clicks {
        for click in &frame.clicks {
            let at = instruction.capture_to_canvas(click.point.x, click.point.y);
            draw_click_highlight(
                canvas,
                at,
                click.progress,
                style.size * instruction.cursor_scale,
                instruction.cursor_scale,
                style.color,
            );
        }
    }
    canvas.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use reel_processing_core::cursor_metadata::{CursorLookup, CursorMetadataSnapshot};
    use reel_project_model::cursor::{CursorClickEvent, CursorSample};
    use reel_project_model::editor::{EditorState, TimeRange};
    use reel_project_model::geometry::Size;
    use reel_project_model::recording::RecordingResult;
    use reel_project_model::style::BackgroundStyle;
    use reel_project_model::zoom::{ZoomKeyframe, ZoomTimeline};

    use crate::instruction::InstructionInputs;

    fn screen_only(editor: &EditorState, inputs: InstructionInputs<'_>) -> CompositionInstruction {
        let recording = RecordingResult::new("screen.mp4", Size::new(64.0, 36.0), 30.0);
        CompositionInstruction::build(&recording, editor, inputs).unwrap()
    }

    fn checker(width: u32, height: u32) -> PixelBuffer {
        let mut image = PixelBuffer::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = if (x / 4 + y / 4) % 2 == 0 { 220 } else { 40 };
                image.set_pixel(x, y, [v, v / 2, 255 - v, 255]);
            }
        }
        image
    }

    #[test]
    fn test_plain_screen_is_copied() {
        let instruction = screen_only(&EditorState::default(), Default::default());
        let screen = PixelBuffer::filled(64, 36, [10, 20, 30, 255]);
        let out = render(&screen, None, 0.0, &instruction).unwrap();
        assert_eq!(out.pixel(0, 0), [10, 20, 30, 255]);
        assert_eq!(out.pixel(63, 35), [10, 20, 30, 255]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let editor = EditorState {
            padding: 0.1,
            video_corner_radius: 6.0,
            background_style: BackgroundStyle::Gradient { gradient_id: 2 },
            ..EditorState::default()
        };
        let snapshot = CursorMetadataSnapshot::new(
            vec![CursorSample::new(0.0, 0.2, 0.2), CursorSample::new(1.0, 0.8, 0.6)],
            vec![CursorClickEvent::new(0.4, 0.5, 0.5)],
            Size::new(64.0, 36.0),
            CursorLookup::Linear,
        );
        let inputs = InstructionInputs {
            cursor_snapshot: Some(Arc::new(snapshot)),
            zoom_timeline: Some(ZoomTimeline::new(vec![
                ZoomKeyframe::new(0.0, 1.0, Point2D::CENTER),
                ZoomKeyframe::new(1.0, 2.0, Point2D::new(0.3, 0.3)),
            ])),
            ..Default::default()
        };
        let instruction = screen_only(&editor, inputs);
        let screen = checker(64, 36);
        let a = render(&screen, None, 0.55, &instruction).unwrap();
        let b = render(&screen, None, 0.55, &instruction).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_padding_shows_background() {
        let editor = EditorState {
            padding: 0.25,
            background_style: BackgroundStyle::SolidColor {
                color: RgbaColor::rgb(0.0, 1.0, 0.0),
            },
            ..EditorState::default()
        };
        let instruction = screen_only(&editor, Default::default());
        let screen = PixelBuffer::filled(64, 36, [255, 0, 0, 255]);
        let out = render(&screen, None, 0.0, &instruction).unwrap();
        assert_eq!(out.pixel(1, 1), [0, 255, 0, 255]);
        let center = (out.width() / 2, out.height() / 2);
        assert_eq!(out.pixel(center.0, center.1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_zoom_magnifies_focus() {
        let editor = EditorState {
            zoom_follow_cursor: false,
            ..EditorState::default()
        };
        let inputs = InstructionInputs {
            zoom_timeline: Some(ZoomTimeline::new(vec![ZoomKeyframe::new(
                0.0,
                2.0,
                Point2D::new(0.25, 0.25),
            )])),
            ..Default::default()
        };
        let instruction = screen_only(&editor, inputs);
        let frame = FrameComposition::resolve(&instruction, 0.0);
        assert_eq!(frame.zoom_level, 2.0);
        assert!((frame.viewport.x - 0.0).abs() < 1e-9);
        assert!((frame.viewport.w - 0.5).abs() < 1e-9);

        // Top-left quadrant red, rest blue: zoomed into it, everything is red.
        let mut screen = PixelBuffer::filled(64, 36, [0, 0, 255, 255]);
        for y in 0..18 {
            for x in 0..32 {
                screen.set_pixel(x, y, [255, 0, 0, 255]);
            }
        }
        let out = render(&screen, None, 0.0, &instruction).unwrap();
        assert_eq!(out.pixel(60, 30), [255, 0, 0, 255]);
    }

    #[test]
    fn test_zoom_follows_cursor() {
        let snapshot = CursorMetadataSnapshot::new(
            vec![CursorSample::new(0.0, 0.9, 0.9)],
            Vec::new(),
            Size::new(64.0, 36.0),
            CursorLookup::Linear,
        );
        let inputs = InstructionInputs {
            cursor_snapshot: Some(Arc::new(snapshot)),
            zoom_timeline: Some(ZoomTimeline::new(vec![ZoomKeyframe::new(
                0.0,
                2.0,
                Point2D::CENTER,
            )])),
            ..Default::default()
        };
        let instruction = screen_only(&EditorState::default(), inputs);
        let frame = FrameComposition::resolve(&instruction, 0.0);
        // Clamped to the bottom-right corner.
        assert!((frame.viewport.x - 0.5).abs() < 1e-9);
        assert!((frame.viewport.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_click_window_respects_trim_offset() {
        let snapshot = CursorMetadataSnapshot::new(
            vec![CursorSample::new(0.0, 0.5, 0.5)],
            vec![CursorClickEvent::new(5.0, 0.5, 0.5)],
            Size::new(64.0, 36.0),
            CursorLookup::Linear,
        );
        let inputs = InstructionInputs {
            trim: Some(TimeRange::new(4.9, 10.0)),
            cursor_snapshot: Some(Arc::new(snapshot)),
            ..Default::default()
        };
        let instruction = screen_only(&EditorState::default(), inputs);
        assert!(FrameComposition::resolve(&instruction, 0.0).clicks.is_empty());
        let frame = FrameComposition::resolve(&instruction, 0.3);
        assert_eq!(frame.clicks.len(), 1);
        assert!((frame.clicks[0].progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_output_size_is_rejected() {
        let instruction = screen_only(&EditorState::default(), Default::default());
        let screen = PixelBuffer::new(64, 36);
        let mut out = PixelBuffer::new(10, 10);
        assert!(render_frame(&screen, None, 0.0, &instruction, &mut out).is_err());
    }

    #[test]
    fn test_fullscreen_camera_hides_screen() {
        let mut recording = RecordingResult::new("screen.mp4", Size::new(64.0, 36.0), 30.0);
        recording.webcam_video = Some("webcam.mp4".into());
        recording.webcam_size = Some(Size::new(64.0, 36.0));
        let editor = EditorState {
            camera_fullscreen_regions: vec![TimeRange::new(1.0, 2.0)],
            ..EditorState::default()
        };
        let instruction = CompositionInstruction::build(&recording, &editor, Default::default())
            .unwrap();
        let screen = PixelBuffer::filled(64, 36, [255, 0, 0, 255]);
        let webcam = PixelBuffer::filled(64, 36, [0, 255, 0, 255]);

        let pip = render(&screen, Some(&webcam), 0.5, &instruction).unwrap();
        assert_eq!(pip.pixel(40, 30), [255, 0, 0, 255]);

        let full = render(&screen, Some(&webcam), 1.5, &instruction).unwrap();
        assert_eq!(full.pixel(40, 30), [0, 255, 0, 255]);

        // No webcam frame: the screen still renders.
        let missing = render(&screen, None, 1.5, &instruction).unwrap();
        assert_eq!(missing.pixel(40, 30), [255, 0, 0, 255]);
    }
}
