//! Frame clock with fixed-step accumulator

use std::time::Instant;

/// Longest frame the clock will account for, in seconds
const MAX_FRAME_TIME: f64 = 0.25;

/// Tracks elapsed time and hands out fixed simulation steps.
///
/// The clock is the time-step source for emitters: callers either feed it
/// wall-clock frames with [`StepClock::tick`] or explicit durations with
/// [`StepClock::advance`], then drain whole steps with
/// [`StepClock::consume_step`]. Deltas handed out are never negative.
pub struct StepClock {
    /// Total elapsed time in seconds
    pub total_time: f64,
    /// Time since last frame in seconds
    pub delta_time: f64,
    /// Fixed step interval in seconds (default: 1/60 second)
    pub fixed_step: f64,
    /// Accumulated time not yet consumed as steps
    accumulator: f64,
    /// Last tick instant
    last_instant: Instant,
    /// Whether this is the first tick
    first_tick: bool,
}

impl Default for StepClock {
    fn default() -> Self {
        Self {
            total_time: 0.0,
            delta_time: 0.0,
            fixed_step: 1.0 / 60.0,
            accumulator: 0.0,
            last_instant: Instant::now(),
            first_tick: true,
        }
    }
}

impl StepClock {
    /// Create a new clock with a 60Hz fixed step
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock with a custom step rate
    pub fn with_rate(hz: f64) -> Self {
        Self {
            fixed_step: 1.0 / hz,
            ..Self::default()
        }
    }

    /// Advance the clock by wall-clock time. Call once per frame.
    pub fn tick(&mut self) {
        let now = Instant::now();

        if self.first_tick {
            self.first_tick = false;
            self.last_instant = now;
            self.delta_time = 0.0;
            return;
        }

        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed);
    }

    /// Advance the clock by an explicit duration in seconds.
    /// Negative and non-finite durations count as zero.
    pub fn advance(&mut self, elapsed: f64) {
        let elapsed = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        self.delta_time = elapsed.min(MAX_FRAME_TIME);
        self.total_time += self.delta_time;
        self.accumulator += self.delta_time;
    }

    /// Returns true if there's enough accumulated time for one fixed step
    pub fn should_step(&self) -> bool {
        self.accumulator >= self.fixed_step
    }

    /// Consume one fixed step from the accumulator, returning its length
    pub fn consume_step(&mut self) -> f32 {
        self.accumulator -= self.fixed_step;
        self.fixed_step as f32
    }
}
