//! Pixel-space sizes and rectangles.
//!
//! Origin is top-left, y grows downward.

use serde::{Deserialize, Serialize};

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Width divided by height (1.0 for degenerate sizes).
    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0.0 {
            1.0
        } else {
            self.width / self.height
        }
    }

    pub fn scaled(&self, factor: f64) -> Size {
        Size::new(self.width * factor, self.height * factor)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Round to whole pixels, forcing even dimensions (required by 4:2:0 encoders).
    pub fn to_even_pixels(&self) -> (u32, u32) {
        fn even(v: f64) -> u32 {
            let px = v.round().max(2.0) as u32;
            px - (px % 2)
        }
        (even(self.width), even(self.height))
    }
}

/// An axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Self::new(0.0, 0.0, size.width, size.height)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.max_x() && py >= self.y && py < self.max_y()
    }

    /// Shrink by `dx` on the left and right and `dy` on top and bottom.
    pub fn inset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(
            self.x + dx,
            self.y + dy,
            (self.width - 2.0 * dx).max(0.0),
            (self.height - 2.0 * dy).max(0.0),
        )
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scale position and size independently on each axis.
    pub fn scaled(&self, sx: f64, sy: f64) -> Rect {
        Rect::new(self.x * sx, self.y * sy, self.width * sx, self.height * sy)
    }

    /// Component-wise linear interpolation.
    pub fn lerp(a: &Rect, b: &Rect, t: f64) -> Rect {
        let t = t.clamp(0.0, 1.0);
        Rect::new(
            a.x + (b.x - a.x) * t,
            a.y + (b.y - a.y) * t,
            a.width + (b.width - a.width) * t,
            a.height + (b.height - a.height) * t,
        )
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Largest rect with `content`'s aspect ratio that fits inside `self`, centered.
    pub fn aspect_fit(&self, content: Size) -> Rect {
        if content.is_empty() || self.is_empty() {
            return *self;
        }
        let scale = (self.width / content.width).min(self.height / content.height);
        self.centered_size(content.scaled(scale))
    }

    /// Smallest rect with `content`'s aspect ratio that covers `self`, centered.
    pub fn aspect_fill(&self, content: Size) -> Rect {
        if content.is_empty() || self.is_empty() {
            return *self;
        }
        let scale = (self.width / content.width).max(self.height / content.height);
        self.centered_size(content.scaled(scale))
    }

    fn centered_size(&self, size: Size) -> Rect {
        Rect::new(
            self.mid_x() - size.width / 2.0,
            self.mid_y() - size.height / 2.0,
            size.width,
            size.height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_fit_letterboxes() {
        let canvas = Rect::new(0.0, 0.0, 1920.0, 1080.0);
        let fit = canvas.aspect_fit(Size::new(1000.0, 1000.0));
        assert!((fit.width - 1080.0).abs() < 1e-9);
        assert!((fit.x - 420.0).abs() < 1e-9);
        assert!(fit.y.abs() < 1e-9);
    }

    #[test]
    fn test_aspect_fill_covers() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let fill = rect.aspect_fill(Size::new(200.0, 100.0));
        assert!((fill.height - 100.0).abs() < 1e-9);
        assert!((fill.width - 200.0).abs() < 1e-9);
        assert!((fill.x + 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_inset_and_intersection() {
        let r = Rect::new(10.0, 10.0, 100.0, 50.0).inset(5.0, 5.0);
        assert_eq!(r, Rect::new(15.0, 15.0, 90.0, 40.0));

        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(5.0, 5.0, 5.0, 5.0)));
        assert!(a.intersection(&Rect::new(20.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn test_even_pixels() {
        assert_eq!(Size::new(1919.6, 1080.0).to_even_pixels(), (1920, 1080));
        assert_eq!(Size::new(1081.0, 607.0).to_even_pixels(), (1080, 606));
    }
}
