//! Fixed-timestep frame loop.
//!
//! Effects state advances in fixed 60 Hz steps; drawing happens once per
//! frame afterwards, so every advance lands before any render call.

use std::time::Instant;
use tracing::warn;

/// Simulation step: 60 Hz.
pub const FIXED_DT: f64 = 1.0 / 60.0;

/// Longest frame fed into the accumulator. Longer stalls are dropped.
pub const MAX_FRAME_TIME: f64 = 0.25;

/// What one frame did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameSteps {
    /// Fixed steps run this frame.
    pub steps: u32,
    /// Simulated seconds covered by those steps.
    pub simulated: f64,
    /// Leftover fraction of a step, in `[0, 1)`.
    pub alpha: f64,
}

/// Accumulator-driven fixed-timestep loop.
pub struct GameLoop {
    previous_time: Instant,
    accumulator: f64,
    total_sim_time: f64,
    frame_count: u64,
    update_count: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            previous_time: Instant::now(),
            accumulator: 0.0,
            total_sim_time: 0.0,
            frame_count: 0,
            update_count: 0,
        }
    }

    /// Measure wall-clock time since the last call and run the due steps.
    ///
    /// `update_fn(fixed_dt, total_sim_time)` runs zero or more times.
    pub fn tick(&mut self, update_fn: impl FnMut(f64, f64)) -> FrameSteps {
        let now = Instant::now();
        let frame_time = now.duration_since(self.previous_time).as_secs_f64();
        self.previous_time = now;
        self.step(frame_time, update_fn)
    }

    /// Feed an explicit frame time. Headless runs drive the loop this way.
    pub fn step(&mut self, frame_time: f64, mut update_fn: impl FnMut(f64, f64)) -> FrameSteps {
        let mut frame_time = frame_time.max(0.0);
        if frame_time > MAX_FRAME_TIME {
            warn!(
                "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
                frame_time * 1000.0,
                MAX_FRAME_TIME * 1000.0
            );
            frame_time = MAX_FRAME_TIME;
        }

        self.accumulator += frame_time;
        let mut steps = 0;
        while self.accumulator >= FIXED_DT {
            update_fn(FIXED_DT, self.total_sim_time);
            self.total_sim_time += FIXED_DT;
            self.accumulator -= FIXED_DT;
            self.update_count += 1;
            steps += 1;
        }
        self.frame_count += 1;

        FrameSteps {
            steps,
            simulated: f64::from(steps) * FIXED_DT,
            alpha: self.alpha(),
        }
    }

    pub fn alpha(&self) -> f64 {
        if self.accumulator > 0.0 {
            self.accumulator / FIXED_DT
        } else {
            0.0
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn total_sim_time(&self) -> f64 {
        self.total_sim_time
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_dt_value() {
        assert!((FIXED_DT - 1.0 / 60.0).abs() < f64::EPSILON * 10.0);
    }

    #[test]
    fn test_single_step() {
        let mut game_loop = GameLoop::new();
        let mut updates = 0u32;
        let frame = game_loop.step(FIXED_DT, |_, _| updates += 1);
        assert_eq!(updates, 1);
        assert_eq!(frame.steps, 1);
        assert!(game_loop.accumulator.abs() < 1e-12);
    }

    #[test]
    fn test_multiple_steps_report_simulated_time() {
        let mut game_loop = GameLoop::new();
        let mut sim_times = Vec::new();
        let frame = game_loop.step(3.0 * FIXED_DT + 1e-9, |_, t| sim_times.push(t));
        assert_eq!(frame.steps, 3);
        assert!((frame.simulated - 3.0 * FIXED_DT).abs() < 1e-12);
        assert!(sim_times[0].abs() < 1e-12);
        assert!((sim_times[2] - 2.0 * FIXED_DT).abs() < 1e-12);
    }

    #[test]
    fn test_partial_frame_carries_over() {
        let mut game_loop = GameLoop::new();
        let mut updates = 0u32;
        let first = game_loop.step(0.5 * FIXED_DT, |_, _| updates += 1);
        assert_eq!(updates, 0);
        assert!((first.alpha - 0.5).abs() < 1e-10);
        game_loop.step(0.5 * FIXED_DT + 1e-9, |_, _| updates += 1);
        assert_eq!(updates, 1);
    }

    #[test]
    fn test_alpha_in_unit_range() {
        let mut game_loop = GameLoop::new();
        let frame = game_loop.step(0.25 * FIXED_DT, |_, _| {});
        assert!((frame.alpha - 0.25).abs() < 1e-10);
        assert!((0.0..1.0).contains(&frame.alpha));
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut game_loop = GameLoop::new();
        let mut updates = 0u32;
        game_loop.step(1.0, |_, _| updates += 1);
        let max_updates = (MAX_FRAME_TIME / FIXED_DT).ceil() as u32;
        assert!(updates <= max_updates, "{updates} > {max_updates}");
        assert!(updates > 0);
    }

    #[test]
    fn test_negative_frame_time_ignored() {
        let mut game_loop = GameLoop::new();
        let frame = game_loop.step(-1.0, |_, _| panic!("no steps expected"));
        assert_eq!(frame.steps, 0);
        assert_eq!(game_loop.frame_count(), 1);
    }

    #[test]
    fn test_total_sim_time_tracks_updates() {
        let mut game_loop = GameLoop::new();
        for _ in 0..10 {
            game_loop.step(FIXED_DT * 2.0, |_, _| {});
        }
        let expected = game_loop.update_count() as f64 * FIXED_DT;
        assert!((game_loop.total_sim_time() - expected).abs() < 1e-10);
        assert_eq!(game_loop.frame_count(), 10);
    }

    #[test]
    fn test_deterministic_sequence() {
        let frame_times = [0.017, 0.015, 0.020, 0.016, 0.033, 0.008, 0.018];
        let mut a = GameLoop::new();
        let mut b = GameLoop::new();
        for &ft in &frame_times {
            let fa = a.step(ft, |_, _| {});
            let fb = b.step(ft, |_, _| {});
            assert_eq!(fa, fb);
        }
        assert_eq!(a.update_count(), b.update_count());
    }

    #[test]
    fn test_default_is_fresh() {
        let game_loop = GameLoop::default();
        assert_eq!(game_loop.frame_count(), 0);
        assert_eq!(game_loop.update_count(), 0);
        assert_eq!(game_loop.total_sim_time(), 0.0);
    }
}
