//! Webcam layer: picture-in-picture, fullscreen, and the transitions between them.

use reel_project_model::editor::TimeRange;
use reel_project_model::geometry::{Rect, Size};
use reel_project_model::style::{
    CameraAspect, FullscreenFillMode, RegionTransition, RegionTransitionKind, RgbaColor,
};

use crate::background::BackgroundFill;
use crate::frame::PixelBuffer;
use crate::instruction::CameraPlacement;
use crate::raster::Canvas;

const SHADOW_COLOR: RgbaColor = RgbaColor::rgba(0.0, 0.0, 0.0, 0.6);

/// Where the camera is at one composition time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraPhase {
    Pip,
    Fullscreen,
    /// Animating between PiP (0.0) and fullscreen (1.0).
    Transition { kind: RegionTransitionKind, progress: f64 },
}

impl CameraPhase {
    /// Resolve the phase at trim-relative time `t`.
    ///
    /// Transitions play inside a region: entering over its first
    /// `duration` seconds, leaving over its last. A region shorter than
    /// two transitions splits its length between them.
    pub fn at(regions: &[TimeRange], transition: RegionTransition, t: f64) -> Self {
        let Some(region) = regions.iter().find(|r| r.contains(t)) else {
            return CameraPhase::Pip;
        };
        if transition.kind == RegionTransitionKind::None || transition.duration_secs <= 0.0 {
            return CameraPhase::Fullscreen;
        }
        let d = transition.duration_secs.min(region.duration() / 2.0);
        if d <= 0.0 {
            return CameraPhase::Fullscreen;
        }
        let entering = (t - region.start_secs) / d;
        let leaving = (region.end_secs - t) / d;
        let progress = entering.min(leaving);
        if progress >= 1.0 {
            CameraPhase::Fullscreen
        } else {
            CameraPhase::Transition {
                kind: transition.kind,
                progress: progress.clamp(0.0, 1.0),
            }
        }
    }

    /// True when the camera hides everything beneath it.
    pub fn covers_canvas(&self) -> bool {
        matches!(self, CameraPhase::Fullscreen)
    }
}

/// Draw the webcam for `phase`.
///
/// A steady fullscreen camera repaints the background under itself so the
/// screen layer never shows through fit-mode bars.
pub fn draw_camera(
    canvas: &mut Canvas<'_>,
    image: &PixelBuffer,
    camera: &CameraPlacement,
    phase: CameraPhase,
    background: &BackgroundFill,
) {
    let canvas_rect = canvas.bounds();
    match phase {
        CameraPhase::Pip => draw_framed(
            canvas,
            image,
            Frame {
                rect: camera.pip_rect,
                radius: camera.corner_radius,
                border: camera.border_width,
                shadow_blur: camera.shadow_blur,
            },
            camera,
        ),
        CameraPhase::Fullscreen => {
            canvas.save();
            background.draw(canvas, canvas_rect);
            draw_fullscreen(canvas, image, camera, canvas_rect);
            canvas.restore();
        }
        CameraPhase::Transition {
            kind: RegionTransitionKind::Scale,
            progress,
        } => {
            let full = fullscreen_frame(camera, canvas_rect);
            let rect = Rect::lerp(&camera.pip_rect, &full, progress);
            let keep = 1.0 - progress;
            draw_framed(
                canvas,
                image,
                Frame {
                    rect,
                    radius: camera.corner_radius * keep,
                    border: camera.border_width * keep,
                    shadow_blur: camera.shadow_blur * keep,
                },
                camera,
            );
        }
        CameraPhase::Transition { kind, progress } => {
            canvas.save();
            match kind {
                RegionTransitionKind::Fade => canvas.set_alpha(progress),
                RegionTransitionKind::Slide => {
                    let distance = canvas_rect.height - camera.pip_rect.y;
                    canvas.translate(0.0, (1.0 - progress) * distance);
                }
                RegionTransitionKind::None | RegionTransitionKind::Scale => {}
            }
            draw_fullscreen(canvas, image, camera, canvas_rect);
            canvas.restore();
        }
    }
}

/// Target rect of a fullscreen camera before the image is placed in it.
fn fullscreen_frame(camera: &CameraPlacement, canvas_rect: Rect) -> Rect {
    match camera.fullscreen_aspect {
        CameraAspect::Original => canvas_rect,
        aspect => canvas_rect.aspect_fit(virtual_size(aspect, camera.source_size)),
    }
}

fn virtual_size(aspect: CameraAspect, source: Size) -> Size {
    match aspect {
        CameraAspect::Original => source,
        other => Size::new(other.aspect_ratio(source) * 1000.0, 1000.0),
    }
}

fn draw_fullscreen(
    canvas: &mut Canvas<'_>,
    image: &PixelBuffer,
    camera: &CameraPlacement,
    canvas_rect: Rect,
) {
    let source = image.size();
    let frame = canvas_rect.aspect_fit(virtual_size(camera.fullscreen_aspect, source));
    canvas.save();
    canvas.clip_rounded_rect(canvas_rect, 0.0);
    if camera.mirrored {
        mirror_about(canvas, frame.mid_x());
    }
    let dest = match camera.fullscreen_aspect {
        // The frame already has the image's own aspect.
        CameraAspect::Original => frame,
        _ => {
            canvas.clip_rounded_rect(frame, 0.0);
            match camera.fullscreen_fill {
                FullscreenFillMode::Fit => frame.aspect_fit(source),
                FullscreenFillMode::Fill => frame.aspect_fill(source),
            }
        }
    };
    canvas.draw_image(image, dest);
    canvas.restore();
}

/// Geometry of one framed (non-fullscreen) camera draw.
#[derive(Debug, Clone, Copy)]
struct Frame {
    rect: Rect,
    radius: f64,
    border: f64,
    shadow_blur: f64,
}

/// PiP-style draw: optional shadow and border ring, rounded clip, optional mirror, aspect fill.
fn draw_framed(canvas: &mut Canvas<'_>, image: &PixelBuffer, frame: Frame, camera: &CameraPlacement) {
    let Frame {
        rect,
        radius,
        border,
        shadow_blur,
    } = frame;
    if rect.is_empty() {
        return;
    }
    if shadow_blur > 0.0 {
        canvas.fill_rounded_rect_shadow(rect, radius, shadow_blur, SHADOW_COLOR);
    }
    let (inner, inner_radius) = if border > 0.0 {
        canvas.fill_rounded_rect(rect, radius, camera.border_color);
        (rect.inset(border, border), (radius - border).max(0.0))
    } else {
        (rect, radius)
    };
    if inner.is_empty() {
        return;
    }
    canvas.save();
    canvas.clip_rounded_rect(inner, inner_radius);
    if camera.mirrored {
        mirror_about(canvas, inner.mid_x());
    }
    canvas.draw_image(image, inner.aspect_fill(image.size()));
    canvas.restore();
}

fn mirror_about(canvas: &mut Canvas<'_>, x: f64) {
    canvas.translate(x, 0.0);
    canvas.scale(-1.0, 1.0);
    canvas.translate(-x, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placement() -> CameraPlacement {
        CameraPlacement {
            pip_rect: Rect::new(40.0, 20.0, 16.0, 12.0),
            corner_radius: 0.0,
            border_width: 0.0,
            border_color: RgbaColor::WHITE,
            mirrored: false,
            shadow_blur: 0.0,
            fullscreen_regions: Vec::new(),
            fullscreen_fill: FullscreenFillMode::Fill,
            fullscreen_aspect: CameraAspect::Original,
            transition: RegionTransition::default(),
            source_size: Size::new(4.0, 3.0),
        }
    }

    fn fade(duration_secs: f64) -> RegionTransition {
        RegionTransition {
            kind: RegionTransitionKind::Fade,
            duration_secs,
        }
    }

    #[test]
    fn test_phase_outside_regions_is_pip() {
        let regions = [TimeRange::new(2.0, 4.0)];
        assert_eq!(CameraPhase::at(&regions, fade(0.5), 1.0), CameraPhase::Pip);
        assert_eq!(CameraPhase::at(&regions, fade(0.5), 4.0), CameraPhase::Pip);
    }

    #[test]
    fn test_phase_enters_and_leaves() {
        let regions = [TimeRange::new(2.0, 4.0)];
        let entering = CameraPhase::at(&regions, fade(0.5), 2.25);
        assert_eq!(
            entering,
            CameraPhase::Transition {
                kind: RegionTransitionKind::Fade,
                progress: 0.5
            }
        );
        assert_eq!(CameraPhase::at(&regions, fade(0.5), 3.0), CameraPhase::Fullscreen);
        let CameraPhase::Transition { progress, .. } = CameraPhase::at(&regions, fade(0.5), 3.9)
        else {
            panic!("expected exit transition");
        };
        assert!((progress - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_phase_without_transition_is_fullscreen() {
        let regions = [TimeRange::new(0.0, 1.0)];
        let phase = CameraPhase::at(&regions, RegionTransition::default(), 0.0);
        assert!(phase.covers_canvas());
    }

    #[test]
    fn test_pip_draws_inside_rect_only() {
        let image = PixelBuffer::filled(4, 3, [255, 0, 0, 255]);
        let mut buf = PixelBuffer::filled(64, 36, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &placement(), CameraPhase::Pip, &BackgroundFill::None);
        assert_eq!(buf.pixel(48, 26), [255, 0, 0, 255]);
        assert_eq!(buf.pixel(10, 10), [0, 0, 0, 255]);
    }

    #[test]
    fn test_pip_border_surrounds_image() {
        let image = PixelBuffer::filled(4, 3, [255, 0, 0, 255]);
        let camera = CameraPlacement {
            border_width: 2.0,
            border_color: RgbaColor::rgb(0.0, 1.0, 0.0),
            ..placement()
        };
        let mut buf = PixelBuffer::filled(64, 36, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &camera, CameraPhase::Pip, &BackgroundFill::None);
        assert_eq!(buf.pixel(40, 25), [0, 255, 0, 255]);
        assert_eq!(buf.pixel(48, 26), [255, 0, 0, 255]);
    }

    #[test]
    fn test_pip_shadow_darkens_around_rect() {
        let image = PixelBuffer::filled(4, 3, [255, 0, 0, 255]);
        let camera = CameraPlacement {
            shadow_blur: 4.0,
            ..placement()
        };
        let mut buf = PixelBuffer::filled(64, 36, [255, 255, 255, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &camera, CameraPhase::Pip, &BackgroundFill::None);
        // Just below and left of (40,20,16,12).
        let below = buf.pixel(48, 33);
        let left = buf.pixel(38, 26);
        assert!(below[0] < 255 && below[0] == below[1] && below[1] == below[2]);
        assert!(left[0] < 255);
        assert_eq!(buf.pixel(48, 26), [255, 0, 0, 255]);
        assert_eq!(buf.pixel(10, 10), [255, 255, 255, 255]);
    }

    #[test]
    fn test_pip_without_shadow_leaves_surroundings() {
        let image = PixelBuffer::filled(4, 3, [255, 0, 0, 255]);
        let mut buf = PixelBuffer::filled(64, 36, [255, 255, 255, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &placement(), CameraPhase::Pip, &BackgroundFill::None);
        assert_eq!(buf.pixel(48, 33), [255, 255, 255, 255]);
        assert_eq!(buf.pixel(38, 26), [255, 255, 255, 255]);
    }

    #[test]
    fn test_mirrored_pip_flips_horizontally() {
        let mut image = PixelBuffer::filled(2, 1, [0, 0, 255, 255]);
        image.set_pixel(0, 0, [255, 0, 0, 255]);
        let camera = CameraPlacement {
            pip_rect: Rect::new(0.0, 0.0, 20.0, 10.0),
            mirrored: true,
            source_size: Size::new(2.0, 1.0),
            ..placement()
        };
        let mut buf = PixelBuffer::filled(20, 10, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &camera, CameraPhase::Pip, &BackgroundFill::None);
        // Left source pixel (red) ends up on the right.
        assert_eq!(buf.pixel(18, 5), [255, 0, 0, 255]);
        assert_eq!(buf.pixel(1, 5), [0, 0, 255, 255]);
    }

    #[test]
    fn test_fullscreen_fit_shows_background_bars() {
        let image = PixelBuffer::filled(4, 4, [255, 0, 0, 255]);
        let camera = CameraPlacement {
            fullscreen_aspect: CameraAspect::Square,
            fullscreen_fill: FullscreenFillMode::Fit,
            source_size: Size::new(4.0, 4.0),
            ..placement()
        };
        let background = BackgroundFill::Solid(RgbaColor::rgb(0.0, 0.0, 1.0));
        let mut buf = PixelBuffer::filled(64, 32, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_camera(&mut canvas, &image, &camera, CameraPhase::Fullscreen, &background);
        assert_eq!(buf.pixel(2, 16), [0, 0, 255, 255]);
        assert_eq!(buf.pixel(32, 16), [255, 0, 0, 255]);
    }

    #[test]
    fn test_scale_transition_interpolates_rect() {
        let image = PixelBuffer::filled(4, 3, [255, 0, 0, 255]);
        let camera = placement();
        let mut buf = PixelBuffer::filled(64, 36, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        let phase = CameraPhase::Transition {
            kind: RegionTransitionKind::Scale,
            progress: 0.5,
        };
        draw_camera(&mut canvas, &image, &camera, phase, &BackgroundFill::None);
        // Halfway between (40,20,16,12) and (0,0,64,36) is (20,10,40,24).
        assert_eq!(buf.pixel(21, 11), [255, 0, 0, 255]);
        assert_eq!(buf.pixel(18, 8), [0, 0, 0, 255]);
    }
}
