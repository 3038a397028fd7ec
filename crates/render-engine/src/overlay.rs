//! Cursor glyphs and click highlights.
//!
//! Sizes are in canvas pixels; positions are canvas pixels with the
//! pointer hotspot at `at`.

use reel_project_model::style::{CursorStyle, RgbaColor};

use crate::raster::Canvas;

/// Draw the pointer glyph for `style` with its hotspot at `at`.
pub fn draw_cursor(canvas: &mut Canvas<'_>, style: CursorStyle, at: (f64, f64), size: f64) {
    if size <= 0.0 {
        return;
    }
    canvas.save();
    match style {
        CursorStyle::Arrow => draw_arrow(canvas, at, size),
        CursorStyle::Crosshair => draw_crosshair(canvas, at, size),
        CursorStyle::CircleDot => draw_circle_dot(canvas, at, size),
    }
    canvas.restore();
}

/// Outline of the arrow glyph on a 24-unit grid, tip at the origin.
const ARROW: [(f64, f64); 7] = [
    (0.0, 0.0),
    (0.0, 20.0),
    (5.5, 15.5),
    (9.0, 22.0),
    (12.0, 20.5),
    (8.5, 13.5),
    (15.0, 13.5),
];

fn draw_arrow(canvas: &mut Canvas<'_>, (x, y): (f64, f64), size: f64) {
    let s = size / 24.0;
    let outline: Vec<(f64, f64)> = ARROW.iter().map(|(px, py)| (x + px * s, y + py * s)).collect();
    canvas.fill_polygon(&outline, RgbaColor::WHITE);
    canvas.stroke_polygon(&outline, 1.5 * s, RgbaColor::BLACK.with_alpha(0.8));
}

fn draw_crosshair(canvas: &mut Canvas<'_>, (x, y): (f64, f64), size: f64) {
    let half = size / 2.0;
    let gap = size * 0.15;
    let line_width = (size / 16.0).max(1.5);
    let arms = [
        ((x - half, y), (x - gap, y)),
        ((x + gap, y), (x + half, y)),
        ((x, y - half), (x, y - gap)),
        ((x, y + gap), (x, y + half)),
    ];
    // White halo first so the glyph reads on dark and light content.
    for (a, b) in arms {
        canvas.stroke_line(a, b, line_width + 1.0, RgbaColor::WHITE);
    }
    for (a, b) in arms {
        canvas.stroke_line(a, b, line_width, RgbaColor::BLACK.with_alpha(0.9));
    }
}

fn draw_circle_dot(canvas: &mut Canvas<'_>, at: (f64, f64), size: f64) {
    let outer = size / 2.0;
    let inner = size * 0.15;
    let line_width = (size / 12.0).max(1.5);
    canvas.stroke_circle(at, outer, line_width + 1.0, RgbaColor::WHITE.with_alpha(0.9));
    canvas.stroke_circle(at, outer, line_width, RgbaColor::BLACK.with_alpha(0.7));
    canvas.fill_circle(at, inner, RgbaColor::WHITE);
}

/// Expanding, fading ring for a click `progress` of the way through its animation.
///
/// The diameter grows from half to twice `size`; fill and ring fade linearly.
pub fn draw_click_highlight(
    canvas: &mut Canvas<'_>,
    at: (f64, f64),
    progress: f64,
    size: f64,
    line_scale: f64,
    color: RgbaColor,
) {
    let progress = progress.clamp(0.0, 1.0);
    let diameter = size * (0.5 + 1.5 * progress);
    let fade = 1.0 - progress;
    if diameter <= 0.0 || fade <= 0.0 {
        return;
    }
    let radius = diameter / 2.0;
    canvas.save();
    canvas.fill_circle(at, radius, color.with_alpha(0.25 * fade));
    canvas.stroke_circle(at, radius, 2.0 * line_scale, color.with_alpha(0.7 * fade));
    canvas.restore();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelBuffer;

    #[test]
    fn test_arrow_tip_is_at_hotspot() {
        let mut buf = PixelBuffer::filled(64, 64, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_cursor(&mut canvas, CursorStyle::Arrow, (10.0, 10.0), 48.0);
        // Inside the arrow body, below and right of the tip.
        let body = buf.pixel(14, 30);
        assert!(body[0] > 200 && body[1] > 200);
        // Left of the tip stays untouched.
        assert_eq!(buf.pixel(5, 30), [0, 0, 0, 255]);
    }

    #[test]
    fn test_crosshair_leaves_center_gap() {
        let mut buf = PixelBuffer::filled(64, 64, [0, 0, 255, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_cursor(&mut canvas, CursorStyle::Crosshair, (32.0, 32.0), 40.0);
        assert_eq!(buf.pixel(32, 32), [0, 0, 255, 255]);
        assert_ne!(buf.pixel(32, 16), [0, 0, 255, 255]);
    }

    #[test]
    fn test_circle_dot_center_is_white() {
        let mut buf = PixelBuffer::filled(64, 64, [0, 0, 0, 255]);
        let mut canvas = Canvas::new(&mut buf);
        draw_cursor(&mut canvas, CursorStyle::CircleDot, (32.0, 32.0), 40.0);
        assert_eq!(buf.pixel(32, 32), [255, 255, 255, 255]);
    }

    #[test]
    fn test_click_highlight_fades_out() {
        let color = RgbaColor::rgb(0.2, 0.5, 1.0);
        let draw = |progress: f64| {
            let mut buf = PixelBuffer::filled(64, 64, [0, 0, 0, 255]);
            let mut canvas = Canvas::new(&mut buf);
            draw_click_highlight(&mut canvas, (32.0, 32.0), progress, 36.0, 1.0, color);
            buf.pixel(32, 32)
        };
        let early = draw(0.1);
        let late = draw(0.9);
        assert!(early[2] > late[2]);
        assert_eq!(draw(1.0), [0, 0, 0, 255]);
    }
}
