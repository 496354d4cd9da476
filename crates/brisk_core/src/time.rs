//! Deterministic time system
//!
//! Fixed 60Hz tick rate driven by a wall-clock accumulator

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Frame deltas longer than this (debugger breaks, window drags) count as one tick.
pub const MAX_FRAME_DELTA: Duration = Duration::from_secs(1);

/// Simulation time tracker
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += TICK_DURATION;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

/// Converts variable wall-clock frame deltas into a whole number of fixed ticks.
pub struct FixedTimestep {
    accumulator: Duration,
    time: SimulationTime,
}

impl FixedTimestep {
    /// Starts primed with one tick so the first frame simulates immediately.
    pub fn new() -> Self {
        Self {
            accumulator: TICK_DURATION,
            time: SimulationTime::new(),
        }
    }

    /// Feed the elapsed wall-clock time since the previous frame.
    pub fn accumulate(&mut self, frame_delta: Duration) {
        let delta = if frame_delta > MAX_FRAME_DELTA {
            TICK_DURATION
        } else {
            frame_delta
        };
        self.accumulator += delta;
    }

    /// Consume one tick if enough time has accumulated.
    pub fn try_tick(&mut self) -> bool {
        if self.accumulator < TICK_DURATION {
            return false;
        }
        self.accumulator -= TICK_DURATION;
        self.time.advance_tick();
        true
    }

    /// Time left until the next tick is due.
    pub fn until_next_tick(&self) -> Duration {
        TICK_DURATION.saturating_sub(self.accumulator)
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }
}

impl Default for FixedTimestep {
    fn default() -> Self {
        Self::new()
    }
}
