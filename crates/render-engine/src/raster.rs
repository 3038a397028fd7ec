//! Software 2D canvas over a [`PixelBuffer`].
//!
//! Mirrors the small slice of a Quartz-style drawing context the compositor
//! needs: a save/restore stack holding an axis-aligned transform (scale and
//! translate, negative scale for mirroring), a stack of rounded-rect clips
//! and a global alpha. Edges are anti-aliased from signed distances, and
//! blending is straight-alpha source-over. Everything is deterministic:
//! the same calls on the same input produce the same bytes.

use reel_project_model::geometry::Rect;
use reel_project_model::style::RgbaColor;

use crate::frame::PixelBuffer;

/// `device = user * scale + translation`, per axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub sx: f64,
    pub sy: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }

    pub fn invert(&self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.tx) / self.sx, (y - self.ty) / self.sy)
    }

    /// Device-space bounds of a user-space rect.
    pub fn map_rect(&self, r: &Rect) -> Rect {
        let (x0, y0) = self.apply(r.x, r.y);
        let (x1, y1) = self.apply(r.max_x(), r.max_y());
        Rect::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    /// Factor applied to lengths such as radii and line widths.
    pub fn length_scale(&self) -> f64 {
        self.sx.abs().min(self.sy.abs())
    }

    fn is_invertible(&self) -> bool {
        self.sx.abs() > f64::EPSILON && self.sy.abs() > f64::EPSILON
    }
}

/// A rounded rectangle in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DeviceRoundedRect {
    rect: Rect,
    radius: f64,
}

impl DeviceRoundedRect {
    fn new(rect: Rect, radius: f64) -> Self {
        let max_radius = rect.width.min(rect.height) / 2.0;
        Self {
            rect,
            radius: radius.clamp(0.0, max_radius.max(0.0)),
        }
    }

    /// Signed distance from the outline: negative inside.
    fn distance(&self, x: f64, y: f64) -> f64 {
        let hw = self.rect.width / 2.0;
        let hh = self.rect.height / 2.0;
        let qx = (x - self.rect.mid_x()).abs() - (hw - self.radius);
        let qy = (y - self.rect.mid_y()).abs() - (hh - self.radius);
        let outside = (qx.max(0.0).powi(2) + qy.max(0.0).powi(2)).sqrt();
        let inside = qx.max(qy).min(0.0);
        outside + inside - self.radius
    }

    fn coverage(&self, x: f64, y: f64) -> f64 {
        (0.5 - self.distance(x, y)).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    transform: Transform,
    clips: Vec<DeviceRoundedRect>,
    alpha: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            transform: Transform::IDENTITY,
            clips: Vec::new(),
            alpha: 1.0,
        }
    }
}

impl GraphicsState {
    fn clip_coverage(&self, x: f64, y: f64) -> f64 {
        let mut c = 1.0;
        for clip in &self.clips {
            c *= clip.coverage(x, y);
            if c <= 0.0 {
                return 0.0;
            }
        }
        c
    }
}

/// Integer pixel span `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy)]
struct PixelSpan {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

/// A drawing context targeting one pixel buffer.
pub struct Canvas<'a> {
    target: &'a mut PixelBuffer,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
}

impl<'a> Canvas<'a> {
    pub fn new(target: &'a mut PixelBuffer) -> Self {
        Self {
            target,
            state: GraphicsState::default(),
            saved: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width() as f64, self.height() as f64)
    }

    pub fn transform(&self) -> Transform {
        self.state.transform
    }

    pub fn save(&mut self) {
        self.saved.push(self.state.clone());
    }

    /// Pop the last saved state; unbalanced calls are ignored.
    pub fn restore(&mut self) {
        if let Some(state) = self.saved.pop() {
            self.state = state;
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        let t = &mut self.state.transform;
        t.tx += t.sx * dx;
        t.ty += t.sy * dy;
    }

    pub fn scale(&mut self, kx: f64, ky: f64) {
        let t = &mut self.state.transform;
        t.sx *= kx;
        t.sy *= ky;
    }

    pub fn set_alpha(&mut self, alpha: f64) {
        self.state.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Intersect the clip with a rounded rect given in user space.
    pub fn clip_rounded_rect(&mut self, rect: Rect, radius: f64) {
        let device = self.state.transform.map_rect(&rect);
        let r = radius * self.state.transform.length_scale();
        self.state.clips.push(DeviceRoundedRect::new(device, r));
    }

    /// Overwrite every pixel, ignoring transform, clip, and alpha.
    pub fn clear(&mut self, color: RgbaColor) {
        self.target.fill(color.to_rgba8());
    }

    pub fn fill_rect(&mut self, rect: Rect, color: RgbaColor) {
        self.fill_rounded_rect(rect, 0.0, color);
    }

    /// Radii above half the shorter side clamp to a capsule.
    pub fn fill_rounded_rect(&mut self, rect: Rect, radius: f64, color: RgbaColor) {
        let t = self.state.transform;
        let shape = DeviceRoundedRect::new(t.map_rect(&rect), radius * t.length_scale());
        let rgba = to_unit(color);
        self.paint(shape.rect, |x, y| Some((rgba, shape.coverage(x, y))));
    }

    /// Soft-edged fill that fades out over `blur` pixels across the outline.
    pub fn fill_rounded_rect_shadow(&mut self, rect: Rect, radius: f64, blur: f64, color: RgbaColor) {
        let t = self.state.transform;
        let blur = blur * t.length_scale();
        if blur <= 0.0 {
            return self.fill_rounded_rect(rect, radius, color);
        }
        let shape = DeviceRoundedRect::new(t.map_rect(&rect), radius * t.length_scale());
        let rgba = to_unit(color);
        self.paint(shape.rect.inset(-blur, -blur), |x, y| {
            let s = (0.5 - shape.distance(x, y) / (2.0 * blur)).clamp(0.0, 1.0);
            Some((rgba, s * s * (3.0 - 2.0 * s)))
        });
    }

    /// Fill `rect` with evenly spaced `stops` running from `start` to `end` (user space).
    pub fn fill_linear_gradient(
        &mut self,
        rect: Rect,
        stops: &[RgbaColor],
        start: (f64, f64),
        end: (f64, f64),
    ) {
        match stops {
            [] => return,
            [only] => return self.fill_rect(rect, *only),
            _ => {}
        }
        let t = self.state.transform;
        if !t.is_invertible() {
            return;
        }
        let shape = DeviceRoundedRect::new(t.map_rect(&rect), 0.0);
        let stops: Vec<[f32; 4]> = stops.iter().map(|c| to_unit(*c)).collect();
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let len_sq = dx * dx + dy * dy;
        self.paint(shape.rect, |x, y| {
            let (ux, uy) = t.invert(x, y);
            let f = if len_sq <= f64::EPSILON {
                0.0
            } else {
                (((ux - start.0) * dx + (uy - start.1) * dy) / len_sq).clamp(0.0, 1.0)
            };
            Some((gradient_color(&stops, f), shape.coverage(x, y)))
        });
    }

    /// Draw `image` stretched into `dest` (user space), bilinear-filtered.
    pub fn draw_image(&mut self, image: &PixelBuffer, dest: Rect) {
        if image.is_empty() || dest.is_empty() {
            return;
        }
        let t = self.state.transform;
        if !t.is_invertible() {
            return;
        }
        let shape = DeviceRoundedRect::new(t.map_rect(&dest), 0.0);
        let kx = image.width() as f64 / dest.width;
        let ky = image.height() as f64 / dest.height;
        self.paint(shape.rect, |x, y| {
            let (ux, uy) = t.invert(x, y);
            let ix = (ux - dest.x) * kx - 0.5;
            let iy = (uy - dest.y) * ky - 0.5;
            Some((sample_bilinear(image, ix, iy), shape.coverage(x, y)))
        });
    }

    pub fn fill_circle(&mut self, center: (f64, f64), radius: f64, color: RgbaColor) {
        let t = self.state.transform;
        let (cx, cy) = t.apply(center.0, center.1);
        let r = radius * t.length_scale();
        if r <= 0.0 {
            return;
        }
        let rgba = to_unit(color);
        let bounds = Rect::new(cx - r - 1.0, cy - r - 1.0, 2.0 * r + 2.0, 2.0 * r + 2.0);
        self.paint(bounds, |x, y| {
            let d = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt() - r;
            Some((rgba, (0.5 - d).clamp(0.0, 1.0)))
        });
    }

    pub fn stroke_circle(&mut self, center: (f64, f64), radius: f64, line_width: f64, color: RgbaColor) {
        let t = self.state.transform;
        let (cx, cy) = t.apply(center.0, center.1);
        let r = radius * t.length_scale();
        let hw = line_width * t.length_scale() / 2.0;
        if hw <= 0.0 {
            return;
        }
        let rgba = to_unit(color);
        let outer = r + hw + 1.0;
        let bounds = Rect::new(cx - outer, cy - outer, 2.0 * outer, 2.0 * outer);
        self.paint(bounds, |x, y| {
            let d = (((x - cx).powi(2) + (y - cy).powi(2)).sqrt() - r).abs() - hw;
            Some((rgba, (0.5 - d).clamp(0.0, 1.0)))
        });
    }

    /// Fill a closed polygon (even-odd rule).
    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: RgbaColor) {
        if points.len() < 3 {
            return;
        }
        let device = self.device_points(points);
        let rgba = to_unit(color);
        let bounds = points_bounds(&device, 1.0);
        self.paint(bounds, |x, y| {
            let d = distance_to_outline(&device, x, y, true);
            let signed = if point_in_polygon(&device, x, y) { -d } else { d };
            Some((rgba, (0.5 - signed).clamp(0.0, 1.0)))
        });
    }

    /// Stroke the outline of a closed polygon.
    pub fn stroke_polygon(&mut self, points: &[(f64, f64)], line_width: f64, color: RgbaColor) {
        self.stroke_path(points, true, line_width, color);
    }

    pub fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), line_width: f64, color: RgbaColor) {
        self.stroke_path(&[from, to], false, line_width, color);
    }

    fn stroke_path(&mut self, points: &[(f64, f64)], closed: bool, line_width: f64, color: RgbaColor) {
        if points.len() < 2 {
            return;
        }
        let hw = line_width * self.state.transform.length_scale() / 2.0;
        if hw <= 0.0 {
            return;
        }
        let device = self.device_points(points);
        let rgba = to_unit(color);
        let bounds = points_bounds(&device, hw + 1.0);
        self.paint(bounds, |x, y| {
            let d = distance_to_outline(&device, x, y, closed) - hw;
            Some((rgba, (0.5 - d).clamp(0.0, 1.0)))
        });
    }

    fn device_points(&self, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
        let t = self.state.transform;
        points.iter().map(|(x, y)| t.apply(*x, *y)).collect()
    }

    /// Visit every pixel whose center may be covered by a shape inside `bounds`.
    fn span_for(&self, bounds: Rect) -> Option<PixelSpan> {
        let mut area = bounds.intersection(&self.bounds())?;
        for clip in &self.state.clips {
            area = area.intersection(&clip.rect.inset(-1.0, -1.0))?;
        }
        let x0 = area.x.floor().max(0.0) as u32;
        let y0 = area.y.floor().max(0.0) as u32;
        let x1 = (area.max_x().ceil() as u32).min(self.width());
        let y1 = (area.max_y().ceil() as u32).min(self.height());
        (x1 > x0 && y1 > y0).then_some(PixelSpan { x0, y0, x1, y1 })
    }

    fn paint<F>(&mut self, bounds: Rect, mut shade: F)
    where
        F: FnMut(f64, f64) -> Option<([f32; 4], f64)>,
    {
        if self.state.alpha <= 0.0 {
            return;
        }
        let Some(span) = self.span_for(bounds) else {
            return;
        };
        let width = self.target.width() as usize;
        let alpha = self.state.alpha;
        let state = &self.state;
        let data = self.target.data_mut();
        for py in span.y0..span.y1 {
            let cy = py as f64 + 0.5;
            let row = py as usize * width;
            for px in span.x0..span.x1 {
                let cx = px as f64 + 0.5;
                let Some((color, coverage)) = shade(cx, cy) else {
                    continue;
                };
                if coverage <= 0.0 {
                    continue;
                }
                let clip = state.clip_coverage(cx, cy);
                if clip <= 0.0 {
                    continue;
                }
                let k = (coverage * clip * alpha) as f32;
                let o = (row + px as usize) * 4;
                blend_over(&mut data[o..o + 4], color, k);
            }
        }
    }
}

fn to_unit(c: RgbaColor) -> [f32; 4] {
    [
        c.r.clamp(0.0, 1.0) as f32,
        c.g.clamp(0.0, 1.0) as f32,
        c.b.clamp(0.0, 1.0) as f32,
        c.a.clamp(0.0, 1.0) as f32,
    ]
}

/// Straight-alpha source-over with extra coverage `k`.
fn blend_over(dst: &mut [u8], src: [f32; 4], k: f32) {
    let sa = src[3] * k;
    if sa <= 0.0 {
        return;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        dst.copy_from_slice(&[0, 0, 0, 0]);
        return;
    }
    for i in 0..3 {
        let dc = dst[i] as f32 / 255.0;
        let c = (src[i] * sa + dc * da * (1.0 - sa)) / out_a;
        dst[i] = (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
    dst[3] = (out_a.clamp(0.0, 1.0) * 255.0).round() as u8;
}

fn gradient_color(stops: &[[f32; 4]], f: f64) -> [f32; 4] {
    let segments = (stops.len() - 1) as f64;
    let pos = f * segments;
    let i = (pos.floor() as usize).min(stops.len() - 2);
    let local = (pos - i as f64) as f32;
    let (a, b) = (stops[i], stops[i + 1]);
    [
        a[0] + (b[0] - a[0]) * local,
        a[1] + (b[1] - a[1]) * local,
        a[2] + (b[2] - a[2]) * local,
        a[3] + (b[3] - a[3]) * local,
    ]
}

/// Bilinear sample at continuous pixel coordinates, clamped to the edges.
fn sample_bilinear(image: &PixelBuffer, x: f64, y: f64) -> [f32; 4] {
    let max_x = (image.width() - 1) as f64;
    let max_y = (image.height() - 1) as f64;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(image.width() - 1);
    let y1 = (y0 + 1).min(image.height() - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    // Interpolate premultiplied so transparent texels do not darken edges.
    let premul = |p: [u8; 4]| {
        let a = p[3] as f32 / 255.0;
        [
            p[0] as f32 / 255.0 * a,
            p[1] as f32 / 255.0 * a,
            p[2] as f32 / 255.0 * a,
            a,
        ]
    };
    let p00 = premul(image.pixel(x0, y0));
    let p10 = premul(image.pixel(x1, y0));
    let p01 = premul(image.pixel(x0, y1));
    let p11 = premul(image.pixel(x1, y1));

    let mut out = [0.0f32; 4];
    for i in 0..4 {
        let top = p00[i] + (p10[i] - p00[i]) * fx;
        let bottom = p01[i] + (p11[i] - p01[i]) * fx;
        out[i] = top + (bottom - top) * fy;
    }
    if out[3] > 0.0 {
        let alpha = out[3];
        for c in out.iter_mut().take(3) {
            *c /= alpha;
        }
    }
    out
}

fn points_bounds(points: &[(f64, f64)], pad: f64) -> Rect {
    let (mut x0, mut y0) = (f64::INFINITY, f64::INFINITY);
    let (mut x1, mut y1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (x, y) in points {
        x0 = x0.min(*x);
        y0 = y0.min(*y);
        x1 = x1.max(*x);
        y1 = y1.max(*y);
    }
    Rect::new(x0 - pad, y0 - pad, (x1 - x0) + 2.0 * pad, (y1 - y0) + 2.0 * pad)
}

fn distance_to_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq <= f64::EPSILON {
        0.0
    } else {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (a.0 + dx * t, a.1 + dy * t);
    ((p.0 - cx).powi(2) + (p.1 - cy).powi(2)).sqrt()
}

fn distance_to_outline(points: &[(f64, f64)], x: f64, y: f64, closed: bool) -> f64 {
    let n = points.len();
    let edges = if closed { n } else { n - 1 };
    (0..edges)
        .map(|i| distance_to_segment((x, y), points[i], points[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

fn point_in_polygon(points: &[(f64, f64)], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
