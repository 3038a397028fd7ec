//! Automatic zoom detection.
//!
//! Clicks close together in time form a region of interest. Each region
//! becomes a four-keyframe envelope: ease in from 1.0x, hold the target
//! zoom, ease back out. Regions whose envelopes would overlap are merged
//! into one, with the focus weighted by click count.

use reel_common::config::ZoomDefaults;
use reel_project_model::cursor::{CursorClickEvent, CursorMetadataFile};
use reel_project_model::editor::AutoZoomSettings;
use reel_project_model::viewport::Point2D;
use reel_project_model::zoom::ZoomKeyframe;
use serde::{Deserialize, Serialize};

/// Detector parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomDetectorConfig {
    /// Zoom level held inside a region.
    pub zoom_level: f64,
    /// Max gap between consecutive clicks of one region (seconds).
    pub dwell_threshold_secs: f64,
    /// Ease-in / ease-out length (seconds).
    pub transition_duration_secs: f64,
    /// Shortest time the target zoom is held.
    pub min_hold_secs: f64,
}

impl Default for ZoomDetectorConfig {
    fn default() -> Self {
        Self {
            zoom_level: 2.0,
            dwell_threshold_secs: 0.5,
            transition_duration_secs: 0.4,
            min_hold_secs: 0.5,
        }
    }
}

impl From<&AutoZoomSettings> for ZoomDetectorConfig {
    fn from(s: &AutoZoomSettings) -> Self {
        Self {
            zoom_level: s.zoom_level,
            dwell_threshold_secs: s.dwell_threshold_secs,
            transition_duration_secs: s.transition_duration_secs,
            ..Self::default()
        }
    }
}

impl From<&ZoomDefaults> for ZoomDetectorConfig {
    fn from(d: &ZoomDefaults) -> Self {
        Self {
            zoom_level: d.zoom_level,
            dwell_threshold_secs: d.dwell_threshold_secs,
            transition_duration_secs: d.transition_duration_secs,
            ..Self::default()
        }
    }
}

impl ZoomDetectorConfig {
    /// How long the target zoom is held after a region's first click.
    fn hold_secs(&self) -> f64 {
        self.dwell_threshold_secs.max(self.min_hold_secs)
    }
}

/// A cluster of clicks that earns a zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClickRegion {
    /// First click time.
    pub start: f64,
    /// Last click time.
    pub end: f64,
    /// Click-weighted focus point.
    pub center: Point2D,
    pub click_count: usize,
}

impl ClickRegion {
    fn from_click(c: &CursorClickEvent) -> Self {
        Self {
            start: c.t,
            end: c.t,
            center: c.point(),
            click_count: 1,
        }
    }

    fn absorb_click(&mut self, c: &CursorClickEvent) {
        let n = self.click_count as f64;
        self.center = Point2D::new(
            (self.center.x * n + c.x) / (n + 1.0),
            (self.center.y * n + c.y) / (n + 1.0),
        );
        self.end = c.t;
        self.click_count += 1;
    }

    fn absorb_region(&mut self, other: &ClickRegion) {
        let a = self.click_count as f64;
        let b = other.click_count as f64;
        let total = a + b;
        self.center = Point2D::new(
            (self.center.x * a + other.center.x * b) / total,
            (self.center.y * a + other.center.y * b) / total,
        );
        self.end = self.end.max(other.end);
        self.click_count += other.click_count;
    }

    /// When the target zoom stops being held.
    pub fn hold_end(&self, config: &ZoomDetectorConfig) -> f64 {
        self.end.max(self.start + config.hold_secs())
    }
}

/// Click-clustering zoom detector.
#[derive(Debug, Clone, Default)]
pub struct ZoomDetector {
    config: ZoomDetectorConfig,
}

impl ZoomDetector {
    pub fn new(config: ZoomDetectorConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &ZoomDetectorConfig {
        &self.config
    }

    /// Zoom keyframes for the clicks in `metadata` over `[0, duration]`.
    pub fn detect(&self, metadata: &CursorMetadataFile, duration: f64) -> Vec<ZoomKeyframe> {
        self.detect_clicks(&metadata.clicks, duration)
    }

    pub fn detect_clicks(&self, clicks: &[CursorClickEvent], duration: f64) -> Vec<ZoomKeyframe> {
        let regions = self.regions_from_clicks(clicks, duration);
        let tr = self.config.transition_duration_secs;
        let clamp = |t: f64| t.clamp(0.0, duration.max(0.0));

        let mut keyframes = Vec::with_capacity(regions.len() * 4);
        for r in &regions {
            let hold_end = r.hold_end(&self.config);
            keyframes.push(ZoomKeyframe::auto(clamp(r.start - tr), 1.0, r.center));
            keyframes.push(ZoomKeyframe::auto(clamp(r.start), self.config.zoom_level, r.center));
            keyframes.push(ZoomKeyframe::auto(clamp(hold_end), self.config.zoom_level, r.center));
            keyframes.push(ZoomKeyframe::auto(clamp(hold_end + tr), 1.0, r.center));
        }
        // Stable: envelope order survives equal timestamps.
        keyframes.sort_by(|a, b| a.t.total_cmp(&b.t));

        tracing::debug!(
            regions = regions.len(),
            keyframes = keyframes.len(),
            "Auto-zoom detection complete"
        );
        keyframes
    }

    /// Merged click regions, for diagnostics.
    pub fn detect_regions(&self, metadata: &CursorMetadataFile, duration: f64) -> Vec<ClickRegion> {
        self.regions_from_clicks(&metadata.clicks, duration)
    }

    fn regions_from_clicks(&self, clicks: &[CursorClickEvent], duration: f64) -> Vec<ClickRegion> {
        if clicks.is_empty() || !(duration > 0.0) {
            return Vec::new();
        }

        let mut sorted: Vec<&CursorClickEvent> = clicks
            .iter()
            .filter(|c| c.t.is_finite() && c.t >= 0.0 && c.t <= duration)
            .collect();
        sorted.sort_by(|a, b| a.t.total_cmp(&b.t));

        let mut clustered: Vec<ClickRegion> = Vec::new();
        for click in sorted {
            match clustered.last_mut() {
                Some(last) if click.t - last.end < self.config.dwell_threshold_secs => {
                    last.absorb_click(click)
                }
                _ => clustered.push(ClickRegion::from_click(click)),
            }
        }

        // Merge regions whose zoom-out would run into the next zoom-in.
        let tr = self.config.transition_duration_secs;
        let mut merged: Vec<ClickRegion> = Vec::with_capacity(clustered.len());
        for region in clustered {
            match merged.last_mut() {
                Some(last) => {
                    let last_zoom_out = (last.hold_end(&self.config) + tr).min(duration);
                    let this_zoom_in = (region.start - tr).max(0.0);
                    if last_zoom_out > this_zoom_in {
                        last.absorb_region(&region);
                    } else {
                        merged.push(region);
                    }
                }
                None => merged.push(region),
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(t: f64, x: f64, y: f64) -> CursorClickEvent {
        CursorClickEvent::new(t, x, y)
    }

    #[test]
    fn test_no_clicks_no_keyframes() {
        let detector = ZoomDetector::with_defaults();
        assert!(detector.detect_clicks(&[], 10.0).is_empty());
    }

    #[test]
    fn test_single_click_envelope() {
        let detector = ZoomDetector::with_defaults();
        let kfs = detector.detect_clicks(&[click(2.0, 0.25, 0.75)], 10.0);
        assert_eq!(kfs.len(), 4);
        let times: Vec<f64> = kfs.iter().map(|k| k.t).collect();
        let expected = [1.6, 2.0, 2.5, 2.9];
        for (t, e) in times.iter().zip(expected) {
            assert!((t - e).abs() < 1e-9, "{t} vs {e}");
        }
        let levels: Vec<f64> = kfs.iter().map(|k| k.zoom_level).collect();
        assert_eq!(levels, vec![1.0, 2.0, 2.0, 1.0]);
        assert!(kfs.iter().all(|k| k.is_auto));
        assert!(kfs.iter().all(|k| k.center() == Point2D::new(0.25, 0.75)));
    }

    #[test]
    fn test_clicks_within_dwell_cluster() {
        let detector = ZoomDetector::with_defaults();
        let clicks = [click(1.0, 0.2, 0.2), click(1.3, 0.4, 0.4), click(1.6, 0.6, 0.6)];
        let regions = detector.regions_from_clicks(&clicks, 10.0);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].click_count, 3);
        assert!((regions[0].center.x - 0.4).abs() < 1e-9);
        assert!((regions[0].end - 1.6).abs() < 1e-9);
    }

    #[test]
    fn test_overlapping_envelopes_merge_weighted() {
        let detector = ZoomDetector::with_defaults();
        // Cluster A: two clicks ending at 1.2, zoom-out completes at 1.9.
        // Cluster B: one click at 2.2, zoom-in starts at 1.8.
        let clicks = [click(1.0, 0.2, 0.2), click(1.2, 0.4, 0.4), click(2.2, 0.9, 0.9)];
        let regions = detector.regions_from_clicks(&clicks, 10.0);
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        assert_eq!(r.click_count, 3);
        // (0.3 * 2 + 0.9 * 1) / 3
        assert!((r.center.x - 0.5).abs() < 1e-9);
        assert!((r.center.y - 0.5).abs() < 1e-9);
        assert!((r.start - 1.0).abs() < 1e-9);
        assert!((r.end - 2.2).abs() < 1e-9);

        let kfs = detector.detect_clicks(&clicks, 10.0);
        assert_eq!(kfs.len(), 4);
        assert!((kfs[3].t - 2.6).abs() < 1e-9);
    }

    #[test]
    fn test_distant_clusters_stay_separate() {
        let detector = ZoomDetector::with_defaults();
        let clicks = [click(1.0, 0.2, 0.2), click(5.0, 0.8, 0.8)];
        assert_eq!(detector.regions_from_clicks(&clicks, 10.0).len(), 2);
        assert_eq!(detector.detect_clicks(&clicks, 10.0).len(), 8);
    }

    #[test]
    fn test_clicks_outside_duration_ignored() {
        let detector = ZoomDetector::with_defaults();
        let clicks = [click(-1.0, 0.2, 0.2), click(12.0, 0.8, 0.8)];
        assert!(detector.detect_clicks(&clicks, 10.0).is_empty());
    }

    #[test]
    fn test_times_clamped_to_duration() {
        let detector = ZoomDetector::with_defaults();
        let kfs = detector.detect_clicks(&[click(0.1, 0.5, 0.5), click(9.9, 0.5, 0.5)], 10.0);
        assert!(kfs.iter().all(|k| k.t >= 0.0 && k.t <= 10.0));
        assert!((kfs[0].t - 0.0).abs() < 1e-9);
        assert!((kfs.last().map(|k| k.t).unwrap_or(0.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_config_from_settings() {
        let settings = AutoZoomSettings {
            zoom_level: 3.0,
            dwell_threshold_secs: 1.0,
            transition_duration_secs: 0.2,
        };
        let config = ZoomDetectorConfig::from(&settings);
        assert!((config.zoom_level - 3.0).abs() < 1e-9);
        assert!((config.hold_secs() - 1.0).abs() < 1e-9);
    }

    proptest::proptest! {
        #[test]
        fn prop_envelopes_are_monotonic(
            raw in proptest::collection::vec((0.0f64..30.0, 0.0f64..1.0, 0.0f64..1.0), 0..40),
            duration in 1.0f64..40.0,
        ) {
            let clicks: Vec<CursorClickEvent> = raw.iter().map(|(t, x, y)| click(*t, *x, *y)).collect();
            let detector = ZoomDetector::with_defaults();
            let regions = detector.regions_from_clicks(&clicks, duration);
            let kfs = detector.detect_clicks(&clicks, duration);

            proptest::prop_assert_eq!(kfs.len(), regions.len() * 4);
            for pair in kfs.windows(2) {
                proptest::prop_assert!(pair[0].t <= pair[1].t);
            }
            for k in &kfs {
                proptest::prop_assert!(k.t >= 0.0 && k.t <= duration);
            }
            // Merged regions never overlap, so envelopes stay contiguous after sorting.
            for env in kfs.chunks(4) {
                proptest::prop_assert!(env[0].t <= env[1].t && env[1].t <= env[2].t && env[2].t <= env[3].t);
                proptest::prop_assert!((env[0].zoom_level - 1.0).abs() < 1e-12);
                proptest::prop_assert!((env[1].zoom_level - 2.0).abs() < 1e-12);
                proptest::prop_assert!((env[2].zoom_level - 2.0).abs() < 1e-12);
                proptest::prop_assert!((env[3].zoom_level - 1.0).abs() < 1e-12);
            }
        }
    }
}
