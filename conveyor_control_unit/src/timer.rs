//! On-delay timer.
//!
//! While the input is true, `elapsed` grows by the cycle time each cycle
//! (unbounded, past the preset); `done` is true once `elapsed >= preset` and
//! stays true as long as the input holds. Dropping the input resets
//! `elapsed` to zero and clears `done` on the same cycle.
//!
//! The preset is passed on every call, so each owner can keep several
//! independent timers with their own presets.

use std::time::Duration;

/// Snapshot of one timer after an update.
///
/// Invariant: `done == (running && elapsed >= preset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerState {
    pub elapsed: Duration,
    pub preset: Duration,
    pub running: bool,
    pub done: bool,
}

/// On-delay timer.
#[derive(Debug, Clone, Default)]
pub struct OnDelayTimer {
    state: TimerState,
}

impl OnDelayTimer {
    pub const fn new() -> Self {
        Self {
            state: TimerState {
                elapsed: Duration::ZERO,
                preset: Duration::ZERO,
                running: false,
                done: false,
            },
        }
    }

    /// Advance the timer by one cycle of length `dt`.
    pub fn update(&mut self, input: bool, preset: Duration, dt: Duration) -> TimerState {
        let s = &mut self.state;
        s.preset = preset;
        if input {
            s.elapsed = s.elapsed.saturating_add(dt);
            s.running = true;
        } else {
            s.elapsed = Duration::ZERO;
            s.running = false;
        }
        s.done = s.running && s.elapsed >= s.preset;
        *s
    }

    /// Drop the input without advancing time (re-arm).
    #[inline]
    pub fn reset(&mut self) {
        self.state.elapsed = Duration::ZERO;
        self.state.running = false;
        self.state.done = false;
    }

    #[inline]
    pub const fn state(&self) -> TimerState {
        self.state
    }

    #[inline]
    pub const fn elapsed(&self) -> Duration {
        self.state.elapsed
    }

    #[inline]
    pub const fn done(&self) -> bool {
        self.state.done
    }

    /// `elapsed / preset`, clamped to `[0, 1]`. A zero preset counts as complete.
    pub fn ratio(&self) -> f64 {
        if self.state.preset.is_zero() {
            return 1.0;
        }
        (self.state.elapsed.as_secs_f64() / self.state.preset.as_secs_f64()).clamp(0.0, 1.0)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
