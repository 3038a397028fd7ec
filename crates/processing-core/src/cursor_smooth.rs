//! Cursor motion smoothing.
//!
//! Replays the recorded pointer path through a damped spring so the
//! exported cursor glides instead of jittering. Clicks stay exact: the
//! cursor snaps onto a click that lands between two samples and eases
//! toward an upcoming click shortly before it happens.

use reel_project_model::cursor::{CursorClickEvent, CursorSample};
use reel_project_model::style::{CursorMovementSpeed, SpringParams};

/// Integration sub-step in seconds.
const SUBSTEP_SECS: f64 = 0.001;

/// Gaps at or above this many seconds snap straight to the next sample.
const MAX_INTEGRATED_GAP_SECS: f64 = 1.0;

/// Cursor smoothing engine.
#[derive(Debug, Clone, Copy)]
pub struct CursorSmoother {
    algorithm: SmoothingAlgorithm,
}

/// Available smoothing algorithms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmoothingAlgorithm {
    /// Damped spring toward each raw sample.
    Spring(SpringParams),

    /// No smoothing; raw samples pass through.
    None,
}

impl CursorSmoother {
    pub fn new(algorithm: SmoothingAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Spring smoothing with one of the movement speed presets.
    pub fn for_speed(speed: CursorMovementSpeed) -> Self {
        Self::new(SmoothingAlgorithm::Spring(speed.spring()))
    }

    /// Smooth `samples` (time-ordered), keeping one output sample per input.
    pub fn smooth(&self, samples: &[CursorSample], clicks: &[CursorClickEvent]) -> Vec<CursorSample> {
        match self.algorithm {
            SmoothingAlgorithm::Spring(params) => smooth_spring(samples, clicks, params),
            SmoothingAlgorithm::None => samples.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SpringState {
    x: f64,
    y: f64,
    vx: f64,
    vy: f64,
}

impl SpringState {
    fn snap(&mut self, x: f64, y: f64) {
        *self = SpringState {
            x,
            y,
            vx: 0.0,
            vy: 0.0,
        };
    }

    fn integrate(&mut self, target: &CursorSample, dt: f64, p: &SpringParams) {
        let steps = ((dt / SUBSTEP_SECS).ceil() as usize).max(1);
        let h = dt / steps as f64;
        for _ in 0..steps {
            let ax = (p.tension * (target.x - self.x) - p.friction * self.vx) / p.mass;
            let ay = (p.tension * (target.y - self.y) - p.friction * self.vy) / p.mass;
            self.vx += ax * h;
            self.vy += ay * h;
            self.x += self.vx * h;
            self.y += self.vy * h;
        }
    }
}

fn smooth_spring(
    samples: &[CursorSample],
    clicks: &[CursorClickEvent],
    params: SpringParams,
) -> Vec<CursorSample> {
    if samples.len() < 2 {
        return samples.to_vec();
    }

    let mut clicks: Vec<CursorClickEvent> = clicks.to_vec();
    clicks.sort_by(|a, b| a.t.total_cmp(&b.t));
    let mut next_click = 0usize;

    let mut out = Vec::with_capacity(samples.len());
    let mut state = SpringState::default();
    state.snap(samples[0].x, samples[0].y);
    out.push(samples[0]);

    for pair in samples.windows(2) {
        let (prev, target) = (&pair[0], &pair[1]);
        let dt = target.t - prev.t;

        if !(dt > 0.0 && dt < MAX_INTEGRATED_GAP_SECS) {
            state.snap(target.x, target.y);
            out.push(CursorSample { t: target.t, x: state.x, y: state.y, p: target.p });
            while next_click < clicks.len() && clicks[next_click].t <= target.t {
                next_click += 1;
            }
            continue;
        }

        state.integrate(target, dt, &params);

        while next_click < clicks.len() && clicks[next_click].t <= prev.t {
            next_click += 1;
        }

        // A click inside (prev.t, target.t] pins the cursor to it.
        if let Some(click) = clicks.get(next_click) {
            if click.t > prev.t && click.t <= target.t {
                state.snap(click.x, click.y);
                out.push(CursorSample { t: target.t, x: state.x, y: state.y, p: target.p });
                next_click += 1;
                continue;
            }
        }

        let (mut x, mut y) = (state.x, state.y);
        if let Some(click) = clicks.get(next_click) {
            let until_click = click.t - target.t;
            if until_click > 0.0 && until_click <= params.convergence_secs {
                let blend = smoothstep(1.0 - until_click / params.convergence_secs);
                x += (click.x - x) * blend;
                y += (click.y - y) * blend;
            }
        }
        out.push(CursorSample { t: target.t, x, y, p: target.p });
    }

    out
}

fn smoothstep(v: f64) -> f64 {
    let v = v.clamp(0.0, 1.0);
    v * v * (3.0 - 2.0 * v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize, dt: f64) -> Vec<CursorSample> {
        (0..n)
            .map(|i| {
                let f = i as f64 / (n - 1) as f64;
                CursorSample::new(i as f64 * dt, 0.1 + 0.8 * f, 0.5)
            })
            .collect()
    }

    #[test]
    fn test_short_input_passes_through() {
        let one = vec![CursorSample::new(0.0, 0.3, 0.3)];
        let smoothed = CursorSmoother::for_speed(CursorMovementSpeed::Medium).smooth(&one, &[]);
        assert_eq!(smoothed, one);
    }

    #[test]
    fn test_preserves_sample_count_and_times() {
        let raw = line(30, 1.0 / 60.0);
        let smoothed = CursorSmoother::for_speed(CursorMovementSpeed::Fast).smooth(&raw, &[]);
        assert_eq!(smoothed.len(), raw.len());
        for (a, b) in raw.iter().zip(&smoothed) {
            assert_eq!(a.t, b.t);
        }
    }

    #[test]
    fn test_spring_lags_behind_fast_motion() {
        let raw = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(0.016, 1.0, 1.0),
        ];
        let smoothed = CursorSmoother::for_speed(CursorMovementSpeed::Slow).smooth(&raw, &[]);
        assert!(smoothed[1].x > 0.0 && smoothed[1].x < 1.0);
    }

    #[test]
    fn test_long_gap_snaps_to_target() {
        let raw = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(2.0, 0.7, 0.2),
        ];
        let smoothed = CursorSmoother::for_speed(CursorMovementSpeed::Slow).smooth(&raw, &[]);
        assert!((smoothed[1].x - 0.7).abs() < 1e-12);
        assert!((smoothed[1].y - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_click_between_samples_pins_cursor() {
        let raw = vec![
            CursorSample::new(0.0, 0.1, 0.1),
            CursorSample::new(0.02, 0.9, 0.9),
        ];
        let clicks = vec![CursorClickEvent::new(0.01, 0.4, 0.6)];
        let smoothed = CursorSmoother::for_speed(CursorMovementSpeed::Medium).smooth(&raw, &clicks);
        assert!((smoothed[1].x - 0.4).abs() < 1e-12);
        assert!((smoothed[1].y - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_converges_toward_upcoming_click() {
        let raw = vec![
            CursorSample::new(0.0, 0.0, 0.0),
            CursorSample::new(0.01, 0.0, 0.0),
        ];
        let clicks = vec![CursorClickEvent::new(0.02, 1.0, 1.0)];
        let params = CursorMovementSpeed::Medium.spring();
        let smoothed = CursorSmoother::new(SmoothingAlgorithm::Spring(params)).smooth(&raw, &clicks);
        // 0.01s before a click with a 0.2s window: blend = smoothstep(0.95).
        let expected = smoothstep(0.95);
        assert!((smoothed[1].x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_none_is_identity() {
        let raw = line(5, 0.1);
        assert_eq!(CursorSmoother::new(SmoothingAlgorithm::None).smooth(&raw, &[]), raw);
    }
}
