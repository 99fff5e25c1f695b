//! Time management utilities

use std::time::{Duration, Instant};

/// Frame clock driving the fixed-timestep loop
///
/// Accumulates real elapsed time and hands it out in fixed-size simulation
/// steps. Rendering happens once per outer iteration regardless of how many
/// fixed steps were consumed.
pub struct FrameClock {
    last_frame: Instant,
    step: Duration,
    accumulator: Duration,
    total_time: f64,
    frame_count: u64,
    max_steps_per_frame: u32,
}

impl FrameClock {
    /// Create a clock with the given fixed step length in seconds
    pub fn new(step_seconds: f64) -> Self {
        Self {
            last_frame: Instant::now(),
            step: Duration::from_secs_f64(step_seconds),
            accumulator: Duration::ZERO,
            total_time: 0.0,
            frame_count: 0,
            max_steps_per_frame: 5,
        }
    }

    /// Advance the clock by the real time elapsed since the previous call
    ///
    /// Call once per outer loop iteration, before draining fixed steps.
    pub fn tick(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame);
        self.last_frame = now;
        self.accumulator += elapsed;
        self.total_time += elapsed.as_secs_f64();
        self.frame_count += 1;

        // Clamp runaway accumulation after a stall (debugger, window drag)
        let cap = self.step * self.max_steps_per_frame;
        if self.accumulator > cap {
            self.accumulator = cap;
        }
    }

    /// Consume one fixed step if enough time has accumulated
    pub fn consume_step(&mut self) -> bool {
        if self.accumulator >= self.step {
            self.accumulator -= self.step;
            true
        } else {
            false
        }
    }

    /// Fixed step length in seconds
    pub fn step_seconds(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Total wall-clock time observed by the clock in seconds
    pub fn total_time(&self) -> f64 {
        self.total_time
    }

    /// Number of outer frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Interpolation factor of the partial step left in the accumulator
    pub fn alpha(&self) -> f32 {
        (self.accumulator.as_secs_f64() / self.step.as_secs_f64()) as f32
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed += start.elapsed();
            self.start_time = None;
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let current_elapsed = if let Some(start) = self.start_time {
            start.elapsed()
        } else {
            Duration::ZERO
        };
        self.elapsed + current_elapsed
    }

    /// Get the elapsed time in seconds
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Check if the stopwatch is currently running
    pub fn is_running(&self) -> bool {
        self.start_time.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_step_length() {
        let clock = FrameClock::new(1.0 / 60.0);
        assert!((clock.step_seconds() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_frame_clock_consumes_accumulated_steps() {
        let mut clock = FrameClock::new(0.01);
        // Inject time directly rather than sleeping
        clock.accumulator = Duration::from_secs_f64(0.035);

        let mut steps = 0;
        while clock.consume_step() {
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert!(clock.alpha() < 1.0);
    }

    #[test]
    fn test_frame_clock_clamps_stalls() {
        let mut clock = FrameClock::new(0.01);
        clock.accumulator = Duration::from_secs(10);
        clock.last_frame = Instant::now();
        clock.tick();

        let mut steps = 0u32;
        while clock.consume_step() {
            steps += 1;
        }
        assert!(steps <= clock.max_steps_per_frame + 1);
    }

    #[test]
    fn test_stopwatch_starts_stopped() {
        let stopwatch = Stopwatch::new();
        assert!(!stopwatch.is_running());
        assert_eq!(stopwatch.elapsed(), Duration::ZERO);
    }
}
