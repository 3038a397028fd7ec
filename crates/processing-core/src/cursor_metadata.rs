//! Cursor metadata lookup.
//!
//! `CursorMetadataProvider` owns the parsed `cursor.json`; export takes an
//! immutable [`CursorMetadataSnapshot`] from it once and shares that across
//! all render workers behind an `Arc`. Every query on the snapshot is a
//! binary search over time-ordered samples, so lookups never lock.

use std::path::Path;
use std::sync::Arc;

use reel_common::error::{ReelError, ReelResult};
use reel_project_model::cursor::{CursorClickEvent, CursorMetadataFile, CursorSample};
use reel_project_model::editor::CursorLookupMode;
use reel_project_model::geometry::Size;
use reel_project_model::style::{CursorMovementSpeed, CursorSmoothing};
use reel_project_model::viewport::Point2D;

use crate::cursor_smooth::CursorSmoother;

/// How a position is derived from the samples around a query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorLookup {
    /// Proportional interpolation between the bracketing samples.
    Linear,
    /// Mean of the last N samples at or before the query time.
    Windowed(CursorSmoothing),
}

impl CursorLookup {
    pub fn from_editor(mode: CursorLookupMode, smoothing: CursorSmoothing) -> Self {
        match mode {
            CursorLookupMode::Linear => CursorLookup::Linear,
            CursorLookupMode::Windowed => CursorLookup::Windowed(smoothing),
        }
    }
}

impl Default for CursorLookup {
    fn default() -> Self {
        CursorLookup::Windowed(CursorSmoothing::default())
    }
}

/// A click highlight that is still animating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveClick {
    pub point: Point2D,
    /// 0.0 at the press, 1.0 when the highlight ends.
    pub progress: f64,
}

/// Loads cursor metadata and hands out read-only snapshots.
#[derive(Debug, Clone)]
pub struct CursorMetadataProvider {
    metadata: CursorMetadataFile,
}

impl CursorMetadataProvider {
    /// Parse a `cursor.json` file.
    pub fn load(path: &Path) -> ReelResult<Self> {
        if !path.exists() {
            return Err(ReelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let metadata = CursorMetadataFile::load(path).map_err(|e| ReelError::project(e.to_string()))?;
        tracing::debug!(
            path = %path.display(),
            samples = metadata.samples.len(),
            clicks = metadata.clicks.len(),
            "Loaded cursor metadata"
        );
        Ok(Self::from_file(metadata))
    }

    pub fn from_file(mut metadata: CursorMetadataFile) -> Self {
        metadata.normalize();
        Self { metadata }
    }

    pub fn metadata(&self) -> &CursorMetadataFile {
        &self.metadata
    }

    /// Freeze the metadata for export.
    ///
    /// With a movement `speed` the sample path is spring-smoothed first.
    pub fn make_snapshot(
        &self,
        speed: Option<CursorMovementSpeed>,
        lookup: CursorLookup,
    ) -> Arc<CursorMetadataSnapshot> {
        let samples = match speed {
            Some(speed) => {
                CursorSmoother::for_speed(speed).smooth(&self.metadata.samples, &self.metadata.clicks)
            }
            None => self.metadata.samples.clone(),
        };
        Arc::new(CursorMetadataSnapshot {
            samples,
            clicks: self.metadata.clicks.clone(),
            capture_size: Size::new(
                self.metadata.capture_area_width,
                self.metadata.capture_area_height,
            ),
            display_scale: self.metadata.display_scale,
            lookup,
        })
    }
}

/// Immutable, time-indexed cursor data shared by all render workers.
#[derive(Debug, Clone)]
pub struct CursorMetadataSnapshot {
    samples: Vec<CursorSample>,
    clicks: Vec<CursorClickEvent>,
    capture_size: Size,
    display_scale: f64,
    lookup: CursorLookup,
}

impl CursorMetadataSnapshot {
    /// Build directly from time-ordered samples and clicks.
    pub fn new(
        mut samples: Vec<CursorSample>,
        mut clicks: Vec<CursorClickEvent>,
        capture_size: Size,
        lookup: CursorLookup,
    ) -> Self {
        samples.sort_by(|a, b| a.t.total_cmp(&b.t));
        clicks.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self {
            samples,
            clicks,
            capture_size,
            display_scale: 1.0,
            lookup,
        }
    }

    pub fn samples(&self) -> &[CursorSample] {
        &self.samples
    }

    pub fn clicks(&self) -> &[CursorClickEvent] {
        &self.clicks
    }

    /// Capture area in points; cursor glyph sizes are relative to it.
    pub fn capture_size(&self) -> Size {
        self.capture_size
    }

    pub fn display_scale(&self) -> f64 {
        self.display_scale
    }

    pub fn lookup(&self) -> CursorLookup {
        self.lookup
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Cursor position at recording time `t` using the snapshot's lookup mode.
    pub fn position_at(&self, t: f64) -> Point2D {
        match self.lookup {
            CursorLookup::Linear => self.sample_linear(t),
            CursorLookup::Windowed(smoothing) => self.sample_windowed(t, smoothing.window()),
        }
    }

    /// Linear interpolation between the samples around `t`, clamped at both ends.
    pub fn sample_linear(&self, t: f64) -> Point2D {
        let (first, last) = match (self.samples.first(), self.samples.last()) {
            (Some(f), Some(l)) => (f, l),
            _ => return Point2D::CENTER,
        };
        if t <= first.t {
            return first.point();
        }
        if t >= last.t {
            return last.point();
        }
        let next = self.samples.partition_point(|s| s.t <= t);
        let a = &self.samples[next - 1];
        let b = &self.samples[next];
        let span = b.t - a.t;
        if span <= f64::EPSILON {
            return b.point();
        }
        Point2D::lerp(&a.point(), &b.point(), (t - a.t) / span)
    }

    /// Mean of up to `window` samples ending at the last sample with `sample.t <= t`.
    pub fn sample_windowed(&self, t: f64, window: usize) -> Point2D {
        if self.samples.is_empty() {
            return Point2D::CENTER;
        }
        let idx = self.index_at(t);
        let start = (idx + 1).saturating_sub(window.max(1));
        let slice = &self.samples[start..=idx];
        let n = slice.len() as f64;
        let (sx, sy) = slice.iter().fold((0.0, 0.0), |(x, y), s| (x + s.x, y + s.y));
        Point2D::new(sx / n, sy / n)
    }

    /// Whether a button was held at `t`.
    pub fn is_pressed(&self, t: f64) -> bool {
        if self.samples.is_empty() {
            return false;
        }
        self.samples[self.index_at(t)].p
    }

    /// Clicks whose highlight is still running at `t`.
    pub fn active_clicks(&self, t: f64, duration: f64) -> Vec<ActiveClick> {
        if duration <= 0.0 {
            return Vec::new();
        }
        // Only clicks in [t - duration, t] can be active.
        let lo = self.clicks.partition_point(|c| c.t < t - duration);
        let hi = self.clicks.partition_point(|c| c.t <= t);
        self.clicks[lo..hi]
            .iter()
            .filter_map(|c| {
                let elapsed = t - c.t;
                (0.0..=duration).contains(&elapsed).then(|| ActiveClick {
                    point: c.point(),
                    progress: elapsed / duration,
                })
            })
            .collect()
    }

    /// Time of the last sample or click.
    pub fn last_timestamp(&self) -> f64 {
        let s = self.samples.last().map(|s| s.t).unwrap_or(0.0);
        let c = self.clicks.last().map(|c| c.t).unwrap_or(0.0);
        s.max(c)
    }

    /// Index of the last sample at or before `t`; 0 when every sample is later.
    fn index_at(&self, t: f64) -> usize {
        self.samples.partition_point(|s| s.t <= t).saturating_sub(1)
    }
}
