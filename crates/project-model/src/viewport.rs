//! Normalized points and the zoomed viewport.
//!
//! All coordinates are normalized to `[0.0, 1.0]` range.

use serde::{Deserialize, Serialize};

/// A 2D normalized point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    /// The centre of the capture area.
    pub const CENTER: Point2D = Point2D { x: 0.5, y: 0.5 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Linear interpolation between two points.
    pub fn lerp(a: &Point2D, b: &Point2D, t: f64) -> Point2D {
        let t = t.clamp(0.0, 1.0);
        Point2D {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
        }
    }

    /// Clamp both coordinates into `[0, 1]`.
    pub fn clamped(&self) -> Point2D {
        Point2D {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

impl Default for Point2D {
    fn default() -> Self {
        Self::CENTER
    }
}

/// The visible normalized region of the screen at a given zoom.
///
/// `(0.0, 0.0)` is top-left, `(1.0, 1.0)` is bottom-right of the
/// full capture area.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Left edge (normalized).
    pub x: f64,
    /// Top edge (normalized).
    pub y: f64,
    /// Width (normalized).
    pub w: f64,
    /// Height (normalized).
    pub h: f64,
}

impl Viewport {
    /// Full-screen viewport (no zoom).
    pub const FULL: Viewport = Viewport {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Create a viewport centered at `(cx, cy)` with given dimensions,
    /// shifted as needed to stay within `[0, 1]`.
    pub fn centered(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        let w = w.clamp(0.01, 1.0);
        let h = h.clamp(0.01, 1.0);

        let x = (cx - w / 2.0).clamp(0.0, 1.0 - w);
        let y = (cy - h / 2.0).clamp(0.0, 1.0 - h);

        Self { x, y, w, h }
    }

    /// The viewport a zoom of `level` around `focus` shows.
    ///
    /// Levels at or below 1.0 show the full frame.
    pub fn from_zoom(level: f64, focus: Point2D) -> Self {
        if level <= 1.0 {
            return Self::FULL;
        }
        let size = 1.0 / level;
        Self::centered(focus.x, focus.y, size, size)
    }

    /// The center point of this viewport.
    pub fn center(&self) -> Point2D {
        Point2D::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Effective zoom factor (1.0 = no zoom, 2.0 = 200% zoom).
    pub fn zoom_factor(&self) -> f64 {
        1.0 / self.w.min(self.h)
    }

    /// Check if a normalized point is within this viewport.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px <= self.x + self.w && py >= self.y && py <= self.y + self.h
    }

    /// Map a capture-space point into viewport-local `[0, 1]` coordinates.
    ///
    /// Points outside the viewport map outside `[0, 1]`.
    pub fn to_local(&self, p: Point2D) -> Point2D {
        Point2D::new((p.x - self.x) / self.w, (p.y - self.y) / self.h)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FULL
    }
}
