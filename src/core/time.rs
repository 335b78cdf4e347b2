//! Frame timing utilities
//!
//! The tick driver owns a `FrameTimer` and feeds `time()` into
//! time-driven density updates. The timer is monotonic: wall-clock mode
//! accumulates real frame deltas, fixed-step mode advances by a constant
//! per tick (useful for deterministic replays and tests).

use std::time::{Duration, Instant};

/// Tracks frame timing and the accumulated simulation time
pub struct FrameTimer {
    last_frame: Instant,
    delta: Duration,
    elapsed: Duration,
    frame_count: u64,
    /// When set, every tick advances by this step instead of wall time
    fixed_step: Option<Duration>,
}

impl FrameTimer {
    /// Create a new wall-clock frame timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            fixed_step: None,
        }
    }

    /// Create a timer that advances by `step` on every tick
    pub fn fixed_step(step: Duration) -> Self {
        Self {
            fixed_step: Some(step),
            ..Self::new()
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = match self.fixed_step {
            Some(step) => step,
            None => now - self.last_frame,
        };
        self.last_frame = now;
        self.elapsed += self.delta;
        self.frame_count += 1;
    }

    /// Get delta time in seconds
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get delta time as Duration
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Simulation time in seconds since the timer was created
    pub fn time(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_step_advances() {
        let mut timer = FrameTimer::fixed_step(Duration::from_millis(500));
        assert_eq!(timer.time(), 0.0);

        timer.tick();
        timer.tick();
        assert!((timer.time() - 1.0).abs() < 1e-6);
        assert!((timer.delta_secs() - 0.5).abs() < 1e-6);
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_wall_clock_is_monotonic() {
        let mut timer = FrameTimer::new();
        timer.tick();
        let first = timer.time();
        timer.tick();
        assert!(timer.time() >= first);
    }
}
