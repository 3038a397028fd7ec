//! Zoom keyframes and the interpolating zoom timeline.
//!
//! Keyframes are in recording time (seconds since the screen recording
//! started). Between two keyframes the zoom level and focus point are
//! interpolated linearly; outside the keyframe span the nearest
//! keyframe's state holds.

use serde::{Deserialize, Serialize};

use crate::viewport::{Point2D, Viewport};

/// A (time, zoom level, focus point) tuple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoomKeyframe {
    /// Seconds.
    pub t: f64,
    /// 1.0 = no zoom.
    pub zoom_level: f64,
    /// Normalized focus X.
    pub center_x: f64,
    /// Normalized focus Y.
    pub center_y: f64,
    /// Whether this keyframe came from automatic detection.
    #[serde(default)]
    pub is_auto: bool,
}

impl ZoomKeyframe {
    pub fn new(t: f64, zoom_level: f64, center: Point2D) -> Self {
        Self {
            t,
            zoom_level,
            center_x: center.x,
            center_y: center.y,
            is_auto: false,
        }
    }

    pub fn auto(t: f64, zoom_level: f64, center: Point2D) -> Self {
        Self {
            is_auto: true,
            ..Self::new(t, zoom_level, center)
        }
    }

    pub fn center(&self) -> Point2D {
        Point2D::new(self.center_x, self.center_y)
    }
}

/// Interpolated zoom at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    pub level: f64,
    pub focus: Point2D,
}

impl ZoomState {
    pub const IDENTITY: ZoomState = ZoomState {
        level: 1.0,
        focus: Point2D::CENTER,
    };

    pub fn is_zoomed(&self) -> bool {
        self.level > 1.0 + 1e-9
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::from_zoom(self.level, self.focus)
    }
}

/// Time-sorted keyframes answering "what is the zoom at time t".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoomTimeline {
    keyframes: Vec<ZoomKeyframe>,
}

impl ZoomTimeline {
    /// Build from keyframes in any order (stable by time).
    pub fn new(mut keyframes: Vec<ZoomKeyframe>) -> Self {
        keyframes.retain(|k| k.t.is_finite() && k.zoom_level.is_finite());
        keyframes.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self { keyframes }
    }

    pub fn keyframes(&self) -> &[ZoomKeyframe] {
        &self.keyframes
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Combine user-placed keyframes with detected ones.
    ///
    /// When both sets have a keyframe at the same instant the manual one wins.
    pub fn merge(manual: &[ZoomKeyframe], detected: &[ZoomKeyframe]) -> Self {
        const SAME_INSTANT: f64 = 1e-3;
        let mut all: Vec<ZoomKeyframe> = manual.to_vec();
        all.extend(
            detected
                .iter()
                .filter(|d| !manual.iter().any(|m| (m.t - d.t).abs() < SAME_INSTANT))
                .copied(),
        );
        Self::new(all)
    }

    /// Shift every keyframe by `offset` seconds.
    pub fn shifted(&self, offset: f64) -> Self {
        Self {
            keyframes: self
                .keyframes
                .iter()
                .map(|k| ZoomKeyframe { t: k.t + offset, ..*k })
                .collect(),
        }
    }

    /// Interpolated zoom state at `t`.
    pub fn state_at(&self, t: f64) -> ZoomState {
        let (first, last) = match (self.keyframes.first(), self.keyframes.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return ZoomState::IDENTITY,
        };
        if t <= first.t {
            return state_of(first);
        }
        if t >= last.t {
            return state_of(last);
        }

        // Index of the first keyframe strictly after t; t is inside the span
        // so both neighbours exist.
        let next = self.keyframes.partition_point(|k| k.t <= t);
        let a = &self.keyframes[next - 1];
        let b = &self.keyframes[next];
        let span = b.t - a.t;
        if span <= f64::EPSILON {
            return state_of(b);
        }
        let f = (t - a.t) / span;
        ZoomState {
            level: a.zoom_level + (b.zoom_level - a.zoom_level) * f,
            focus: Point2D::lerp(&a.center(), &b.center(), f),
        }
    }

    /// Convenience: zoom level only.
    pub fn zoom_at(&self, t: f64) -> f64 {
        self.state_at(t).level
    }
}

fn state_of(k: &ZoomKeyframe) -> ZoomState {
    ZoomState {
        level: k.zoom_level,
        focus: k.center(),
    }
}
