//! Clock and timing utilities for export.
//!
//! Output frames are identified by an integer index derived from the
//! composition time (`floor(time * fps)`). This module provides:
//! - Frame index / frame time conversion
//! - Total frame count for a duration
//! - A monotonic export clock with ETA estimation

use std::time::Instant;

/// Tolerance used when converting between seconds and frame indices so that
/// times computed as `index / fps` map back to the same index.
const FRAME_EPSILON: f64 = 1e-6;

/// Frame index for a composition time: `floor(time * fps)`.
pub fn frame_index(time_secs: f64, fps: f64) -> u64 {
    if time_secs <= 0.0 || fps <= 0.0 {
        return 0;
    }
    (time_secs * fps + FRAME_EPSILON).floor() as u64
}

/// Presentation time of a frame index.
pub fn frame_time(index: u64, fps: f64) -> f64 {
    if fps <= 0.0 {
        return 0.0;
    }
    index as f64 / fps
}

/// Number of output frames covering `duration_secs`: `ceil(duration * fps)`.
pub fn total_frames(duration_secs: f64, fps: f64) -> u64 {
    if duration_secs <= 0.0 || fps <= 0.0 {
        return 0;
    }
    (duration_secs * fps - FRAME_EPSILON).ceil().max(0.0) as u64
}

/// A monotonic clock anchored at the start of an export.
#[derive(Debug, Clone)]
pub struct ExportClock {
    /// The instant the export started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl ExportClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the export started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at export start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Estimate remaining seconds from the observed rate so far.
    pub fn eta_secs(&self, done: u64, total: u64) -> Option<f64> {
        estimate_eta(self.elapsed_secs(), done, total)
    }
}

/// `remaining * elapsed / done`, or `None` before any work completed.
pub fn estimate_eta(elapsed_secs: f64, done: u64, total: u64) -> Option<f64> {
    if done == 0 {
        return None;
    }
    let remaining = total.saturating_sub(done) as f64;
    Some((remaining * elapsed_secs / done as f64).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_index_floor() {
        assert_eq!(frame_index(0.0, 30.0), 0);
        assert_eq!(frame_index(1.0 / 30.0, 30.0), 1);
        assert_eq!(frame_index(0.049, 30.0), 1);
        assert_eq!(frame_index(9.0, 1.0), 9);
        assert_eq!(frame_index(-1.0, 30.0), 0);
    }

    #[test]
    fn test_frame_time_round_trips_index() {
        for i in [0u64, 1, 29, 30, 1799] {
            assert_eq!(frame_index(frame_time(i, 30.0), 30.0), i);
        }
        assert!((frame_time(15, 30.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_total_frames_ceil() {
        assert_eq!(total_frames(10.0, 1.0), 10);
        assert_eq!(total_frames(10.01, 1.0), 11);
        assert_eq!(total_frames(2.0, 30.0), 60);
        assert_eq!(total_frames(0.0, 30.0), 0);
    }

    #[test]
    fn test_estimate_eta() {
        assert!(estimate_eta(5.0, 0, 10).is_none());
        let eta = estimate_eta(5.0, 5, 10).unwrap();
        assert!((eta - 5.0).abs() < 1e-9);
        assert!((estimate_eta(5.0, 10, 10).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_clock_elapsed() {
        let clock = ExportClock::start();
        assert!(clock.elapsed_secs() < 1.0);
        assert!(!clock.epoch_wall().is_empty());
    }
}
