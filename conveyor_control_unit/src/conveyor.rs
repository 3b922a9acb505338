//! Conveyor control state machine.
//!
//! Reuses [`MotorState`] at a coarser granularity: a flat start delay, no
//! ramp arithmetic. Differences from the motor machine:
//!
//! - `reset` is a continuous inhibitor: while it is low the conveyor is held
//!   in `Stopped` and its fault latch is cleared, every cycle.
//! - `Stopping` is a single-cycle transient.
//! - `Fault` is cleared by `reset` alone, without any condition check.
//! - One debounce timer watches for sustained speed above the overspeed
//!   threshold while running.
//!
//! The [`ConveyorData`] record is refreshed at the end of every cycle and is
//! never read back by the control logic.

use std::time::Duration;

use conveyor_common::config::ConveyorConfig;
use conveyor_common::fault::FaultCause;
use conveyor_common::state::MotorState;
use conveyor_common::status::ConveyorData;
use tracing::{debug, warn};

use crate::edge::RisingEdge;
use crate::timer::OnDelayTimer;

/// Commands and setpoint sampled at cycle start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConveyorInputs {
    pub start: bool,
    /// Continuous permission; low holds the conveyor in `Stopped`.
    pub reset: bool,
    /// Requested speed [%].
    pub speed_setpoint: i32,
    /// Drive current measurement [A], folded into the diagnostics.
    pub measured_current: Option<f64>,
}

/// Values published after a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConveyorOutputs {
    pub state: MotorState,
    pub running: bool,
    pub fault: bool,
    pub ready: bool,
    /// Actual speed [%], within `[0, 100]`.
    pub actual_speed: i32,
    pub start_count: u32,
}

#[derive(Debug, Clone, Default)]
struct ConveyorTimers {
    start_delay: OnDelayTimer,
    /// Unbounded accumulator for the current run.
    run_time: OnDelayTimer,
    fault_debounce: OnDelayTimer,
}

/// One conveyor instance.
#[derive(Debug, Clone)]
pub struct ConveyorControl {
    params: ConveyorConfig,
    state: MotorState,

    // ── Commands ──
    start: bool,
    reset: bool,
    speed_setpoint: i32,

    // ── Outputs ──
    running: bool,
    fault: bool,
    ready: bool,
    actual_speed: i32,

    // ── Internal ──
    fault_latch: bool,
    start_count: u32,
    start_edge: RisingEdge,
    timers: ConveyorTimers,
    /// Run time of completed runs.
    completed_run_time: Duration,
    fault_cause: Option<FaultCause>,
    data: ConveyorData,
}

impl ConveyorControl {
    /// Create a conveyor in `Stopped`.
    pub fn new(params: ConveyorConfig) -> Self {
        let data = ConveyorData::new(
            params.min_speed,
            params.max_speed,
            params.maintenance_interval(),
        );
        Self {
            params,
            state: MotorState::Stopped,
            start: false,
            reset: false,
            speed_setpoint: 0,
            running: false,
            fault: false,
            ready: false,
            actual_speed: 0,
            fault_latch: false,
            start_count: 0,
            start_edge: RisingEdge::new(),
            timers: ConveyorTimers::default(),
            completed_run_time: Duration::ZERO,
            fault_cause: None,
            data,
        }
    }

    #[inline]
    pub const fn state(&self) -> MotorState {
        self.state
    }

    /// Start command seen on the last cycle.
    #[inline]
    pub const fn start_command(&self) -> bool {
        self.start
    }

    #[inline]
    pub const fn start_count(&self) -> u32 {
        self.start_count
    }

    #[inline]
    pub const fn fault_cause(&self) -> Option<FaultCause> {
        self.fault_cause
    }

    /// Elapsed time of the start-delay timer.
    #[inline]
    pub const fn start_delay_elapsed(&self) -> Duration {
        self.timers.start_delay.elapsed()
    }

    /// Total run time across all runs.
    pub fn run_time(&self) -> Duration {
        self.completed_run_time
            .saturating_add(self.timers.run_time.elapsed())
    }

    /// Reporting record as of the last cycle.
    #[inline]
    pub fn data(&self) -> &ConveyorData {
        &self.data
    }

    pub fn outputs(&self) -> ConveyorOutputs {
        ConveyorOutputs {
            state: self.state,
            running: self.running,
            fault: self.fault,
            ready: self.ready,
            actual_speed: self.actual_speed,
            start_count: self.start_count,
        }
    }

    /// Load a state value from retained memory or an operator panel.
    ///
    /// Values outside the enumeration force `Fault`.
    pub fn restore_raw_state(&mut self, raw: u8) {
        match MotorState::from_u8(raw) {
            Some(state) => self.state = state,
            None => {
                warn!(raw, "invalid conveyor state value");
                self.enter_fault(FaultCause::InvalidState(raw));
            }
        }
        self.publish_flags();
    }

    /// Run one control cycle of length `dt`.
    pub fn advance(&mut self, inputs: &ConveyorInputs, dt: Duration) -> ConveyorOutputs {
        self.start = inputs.start;
        self.reset = inputs.reset;
        self.speed_setpoint = inputs.speed_setpoint;

        if self.start_edge.update(inputs.start) {
            self.start_count = self.start_count.saturating_add(1);
        }

        if !inputs.reset {
            if self.state != MotorState::Stopped {
                self.transition(MotorState::Stopped);
            }
            self.fault_latch = false;
        }

        match self.state {
            MotorState::Stopped => self.step_stopped(),
            MotorState::Starting => self.step_starting(dt),
            MotorState::Running => self.step_running(dt),
            MotorState::Stopping => self.step_stopping(),
            MotorState::Fault => self.step_fault(),
        }
        self.publish_flags();

        let overspeed =
            self.running && self.actual_speed > self.params.overspeed_threshold;
        let debounce =
            self.timers
                .fault_debounce
                .update(overspeed, self.params.fault_debounce(), dt);
        if debounce.done && self.state != MotorState::Fault {
            self.enter_fault(FaultCause::SustainedOverspeed);
            self.publish_flags();
        }

        if let Some(amps) = inputs.measured_current {
            self.data.diagnostics.record_current(amps);
        }
        self.refresh_data();
        self.outputs()
    }

    // ─── State arms ─────────────────────────────────────────────────

    fn step_stopped(&mut self) {
        self.actual_speed = 0;
        self.stop_run_timer();
        self.timers.start_delay.reset();
        if self.start && self.reset && !self.fault_latch {
            self.transition(MotorState::Starting);
        }
    }

    fn step_starting(&mut self, dt: Duration) {
        self.actual_speed = 0;
        let delay = self
            .timers
            .start_delay
            .update(true, self.params.start_delay(), dt);

        if !self.start || !self.reset {
            self.timers.start_delay.reset();
            self.transition(MotorState::Stopping);
        } else if delay.done {
            self.timers.run_time.reset();
            self.transition(MotorState::Running);
        }
    }

    fn step_running(&mut self, dt: Duration) {
        self.actual_speed = self.speed_setpoint.clamp(0, 100);
        self.timers.run_time.update(true, Duration::MAX, dt);

        if !self.start || !self.reset || self.fault_latch {
            self.transition(MotorState::Stopping);
        }
    }

    fn step_stopping(&mut self) {
        self.actual_speed = 0;
        self.stop_run_timer();
        self.transition(MotorState::Stopped);
    }

    fn step_fault(&mut self) {
        self.actual_speed = 0;
        self.stop_run_timer();
        if self.reset {
            self.fault_latch = false;
            self.transition(MotorState::Stopped);
        }
    }

    // ─── Helpers ────────────────────────────────────────────────────

    fn transition(&mut self, next: MotorState) {
        debug!(from = self.state.name(), to = next.name(), "conveyor transition");
        self.state = next;
    }

    fn enter_fault(&mut self, cause: FaultCause) {
        warn!(
            from = self.state.name(),
            cause = cause.description(),
            "conveyor fault"
        );
        self.state = MotorState::Fault;
        self.fault_latch = true;
        self.fault_cause = Some(cause);
        self.actual_speed = 0;
        self.stop_run_timer();
        self.timers.start_delay.reset();
        self.data.diagnostics.record_fault(cause);
    }

    /// Fold the live run into the completed total and stop the accumulator.
    fn stop_run_timer(&mut self) {
        let elapsed = self.timers.run_time.elapsed();
        if !elapsed.is_zero() {
            self.completed_run_time = self.completed_run_time.saturating_add(elapsed);
        }
        self.timers.run_time.reset();
    }

    fn publish_flags(&mut self) {
        self.running = self.state == MotorState::Running;
        self.fault = self.state == MotorState::Fault;
        self.ready = self.state == MotorState::Stopped;
    }

    fn refresh_data(&mut self) {
        let run_time = self.run_time();
        let data = &mut self.data;
        data.running = self.running;
        data.speed = self.actual_speed;
        data.start_count = self.start_count;
        data.run_time = run_time;
        data.maintenance_remaining = self
            .params
            .maintenance_interval()
            .saturating_sub(run_time);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
