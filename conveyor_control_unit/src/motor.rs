//! Motor control state machine.
//!
//! `Stopped → Starting → Running → Stopping → Stopped`, with `Fault`
//! reachable from every state through the fault-debounce timer.
//!
//! Per cycle:
//! 1. Rising edge of `start`.
//! 2. Clamp the setpoint to `[0, 100]`.
//! 3. Evaluate the current state (timers, ramp, simulated feedback).
//! 4. Recompute the fault sub-flags from current/speed thresholds.
//! 5. Debounce the sub-flags; a sustained violation forces `Fault`.
//!
//! The ramp is two-stage: commanded speed follows `setpoint * elapsed/preset`
//! until the ramp-up timer is done, then holds the setpoint. Feedback slews
//! toward the command by a fixed step per cycle. Leaving `Fault` requires
//! `reset` while no sub-flag is active.
//!
//! Speed sub-flags compare the actual speed against the band between the
//! ramp command and its slew-limited reference (the command followed at the
//! feedback step). A drive that keeps up with its own slew limit never
//! leaves that band, whatever the cycle time.

use std::time::Duration;

use conveyor_common::config::MotorConfig;
use conveyor_common::consts::{SPEED_MAX, SPEED_MIN};
use conveyor_common::fault::{FaultCause, MotorFaults};
use conveyor_common::state::MotorState;
use tracing::{debug, warn};

use crate::edge::RisingEdge;
use crate::timer::OnDelayTimer;

/// Commands and setpoint sampled at cycle start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorInputs {
    pub enable: bool,
    pub start: bool,
    pub stop: bool,
    pub reset: bool,
    /// Requested speed [%], clamped to `[0, 100]`.
    pub speed_setpoint: f64,
    /// Drive current measurement [A]; replaces the simulated current.
    pub measured_current: Option<f64>,
    /// Encoder speed measurement [%]; replaces the simulated feedback.
    pub measured_speed: Option<f64>,
}

/// Values published after a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorOutputs {
    pub state: MotorState,
    pub running: bool,
    pub ready: bool,
    pub fault: bool,
    /// Actual speed [%], always within `[0, 100]`.
    pub actual_speed: f64,
    /// Motor current [A].
    pub current: f64,
    /// Torque [% of rated].
    pub torque: f64,
    /// Ramp output [%].
    pub speed_command: f64,
    pub faults: MotorFaults,
}

#[derive(Debug, Clone, Default)]
struct MotorTimers {
    startup: OnDelayTimer,
    ramp_up: OnDelayTimer,
    ramp_down: OnDelayTimer,
    fault_debounce: OnDelayTimer,
}

/// One motor instance.
#[derive(Debug, Clone)]
pub struct MotorControl {
    params: MotorConfig,
    state: MotorState,

    // ── Outputs ──
    running: bool,
    ready: bool,
    fault: bool,
    actual_speed: f64,
    current: f64,
    torque: f64,
    faults: MotorFaults,

    // ── Internal ──
    speed_command: f64,
    /// Command followed at `feedback_step` per cycle.
    reference: f64,
    feedback: f64,
    timers: MotorTimers,
    start_edge: RisingEdge,
    fault_cause: Option<FaultCause>,
}

impl MotorControl {
    /// Create a motor in `Stopped`.
    pub fn new(params: MotorConfig) -> Self {
        Self {
            params,
            state: MotorState::Stopped,
            running: false,
            ready: false,
            fault: false,
            actual_speed: 0.0,
            current: 0.0,
            torque: 0.0,
            faults: MotorFaults::empty(),
            speed_command: 0.0,
            reference: 0.0,
            feedback: 0.0,
            timers: MotorTimers::default(),
            start_edge: RisingEdge::new(),
            fault_cause: None,
        }
    }

    #[inline]
    pub const fn state(&self) -> MotorState {
        self.state
    }

    #[inline]
    pub const fn faults(&self) -> MotorFaults {
        self.faults
    }

    /// Cause of the current or most recent fault.
    #[inline]
    pub const fn fault_cause(&self) -> Option<FaultCause> {
        self.fault_cause
    }

    /// Outputs as of the last cycle.
    pub fn outputs(&self) -> MotorOutputs {
        MotorOutputs {
            state: self.state,
            running: self.running,
            ready: self.ready,
            fault: self.fault,
            actual_speed: self.actual_speed,
            current: self.current,
            torque: self.torque,
            speed_command: self.speed_command,
            faults: self.faults,
        }
    }

    /// Load a state value from retained memory or an operator panel.
    ///
    /// Values outside the enumeration force `Fault`.
    pub fn restore_raw_state(&mut self, raw: u8) {
        match MotorState::from_u8(raw) {
            Some(state) => {
                self.state = state;
                self.fault = state == MotorState::Fault;
            }
            None => {
                warn!(raw, "invalid motor state value");
                self.enter_fault(FaultCause::InvalidState(raw));
            }
        }
        self.running = self.state == MotorState::Running;
        self.ready = false;
    }

    /// Run one control cycle of length `dt`.
    pub fn advance(&mut self, inputs: &MotorInputs, dt: Duration) -> MotorOutputs {
        let start_edge = self.start_edge.update(inputs.start);
        let setpoint = clamp_speed(inputs.speed_setpoint);

        match self.state {
            MotorState::Stopped => self.step_stopped(inputs, start_edge),
            MotorState::Starting => self.step_starting(inputs, dt),
            MotorState::Running => self.step_running(inputs, setpoint, dt),
            MotorState::Stopping => self.step_stopping(dt),
            MotorState::Fault => self.step_fault(inputs),
        }

        self.refresh_faults(inputs);

        let debounce = self.timers.fault_debounce.update(
            self.faults.any(),
            self.params.fault_debounce(),
            dt,
        );
        if debounce.done && self.state != MotorState::Fault {
            self.enter_fault(FaultCause::Threshold(self.faults.bits()));
            self.apply_measurements(inputs);
        }

        self.running = self.state == MotorState::Running;
        self.fault = self.state == MotorState::Fault;
        self.ready = self.state == MotorState::Stopped && inputs.enable && !self.fault;
        self.outputs()
    }

    // ─── State arms ─────────────────────────────────────────────────

    fn step_stopped(&mut self, inputs: &MotorInputs, start_edge: bool) {
        self.zero_outputs();
        self.timers.startup.reset();
        self.timers.ramp_up.reset();
        self.timers.ramp_down.reset();

        if start_edge && inputs.enable && !self.fault {
            self.transition(MotorState::Starting);
        }
    }

    fn step_starting(&mut self, inputs: &MotorInputs, dt: Duration) {
        self.zero_outputs();
        let startup = self
            .timers
            .startup
            .update(true, self.params.startup_delay(), dt);

        if inputs.stop || !inputs.enable {
            self.timers.startup.reset();
            self.transition(MotorState::Stopping);
        } else if startup.done {
            self.timers.startup.reset();
            self.timers.ramp_up.reset();
            self.transition(MotorState::Running);
        }
    }

    fn step_running(&mut self, inputs: &MotorInputs, setpoint: f64, dt: Duration) {
        let ramp = self.timers.ramp_up.update(true, self.params.ramp_up(), dt);
        self.speed_command = if ramp.done {
            setpoint
        } else {
            setpoint * self.timers.ramp_up.ratio()
        };

        let step = self.params.feedback_step;
        self.reference = clamp_speed(
            self.reference + (self.speed_command - self.reference).clamp(-step, step),
        );
        let delta = (self.speed_command - self.feedback).clamp(-step, step);
        self.feedback = clamp_speed(self.feedback + delta);
        self.actual_speed = self.feedback;
        self.current = self.simulated_current(self.actual_speed);
        self.torque = self.params.torque_slope * self.actual_speed / 100.0;

        if inputs.stop || !inputs.enable {
            self.timers.ramp_up.reset();
            self.timers.ramp_down.reset();
            self.transition(MotorState::Stopping);
        }
    }

    fn step_stopping(&mut self, dt: Duration) {
        self.speed_command = 0.0;
        let ramp = self
            .timers
            .ramp_down
            .update(true, self.params.ramp_down(), dt);

        if ramp.done {
            self.feedback = 0.0;
            self.timers.ramp_down.reset();
            self.transition(MotorState::Stopped);
        } else {
            self.feedback = clamp_speed(self.feedback * (1.0 - self.timers.ramp_down.ratio()));
        }
        self.actual_speed = self.feedback;
        self.current *= self.params.current_decay;
        self.torque = 0.0;
    }

    fn step_fault(&mut self, inputs: &MotorInputs) {
        self.zero_outputs();
        // Reset is gated on the sub-flags as measured this cycle.
        self.refresh_faults(inputs);
        if inputs.reset && !self.faults.any() {
            self.fault = false;
            self.timers.fault_debounce.reset();
            self.transition(MotorState::Stopped);
        }
    }

    // ─── Helpers ────────────────────────────────────────────────────

    fn transition(&mut self, next: MotorState) {
        debug!(from = self.state.name(), to = next.name(), "motor transition");
        self.state = next;
    }

    fn enter_fault(&mut self, cause: FaultCause) {
        warn!(
            from = self.state.name(),
            cause = cause.description(),
            "motor fault"
        );
        self.state = MotorState::Fault;
        self.fault = true;
        self.fault_cause = Some(cause);
        self.speed_command = 0.0;
        self.reference = 0.0;
        self.feedback = 0.0;
        self.actual_speed = 0.0;
        self.current = 0.0;
        self.torque = 0.0;
        self.timers.startup.reset();
        self.timers.ramp_up.reset();
        self.timers.ramp_down.reset();
    }

    fn zero_outputs(&mut self) {
        self.speed_command = 0.0;
        self.reference = 0.0;
        self.feedback = 0.0;
        self.actual_speed = 0.0;
        self.current = 0.0;
        self.torque = 0.0;
    }

    #[inline]
    fn simulated_current(&self, speed: f64) -> f64 {
        self.params.current_base + self.params.current_slope * speed / 100.0
    }

    /// Replace simulated values with external measurements.
    fn apply_measurements(&mut self, inputs: &MotorInputs) {
        if let Some(amps) = inputs.measured_current {
            self.current = amps.max(0.0);
        }
        if let Some(speed) = inputs.measured_speed {
            self.feedback = clamp_speed(speed);
            self.actual_speed = self.feedback;
        }
    }

    /// Apply external measurements, then recompute the sub-flags.
    fn refresh_faults(&mut self, inputs: &MotorInputs) {
        self.apply_measurements(inputs);

        let running = self.state == MotorState::Running;
        let ramped_up = self.timers.ramp_up.done();
        let upper = self.speed_command.max(self.reference);
        let lower = self.speed_command.min(self.reference);
        let mut faults = MotorFaults::empty();
        faults.set(
            MotorFaults::OVERCURRENT,
            self.current > self.params.overcurrent_limit,
        );
        faults.set(
            MotorFaults::OVERSPEED,
            running && self.actual_speed > upper + self.params.overspeed_margin,
        );
        faults.set(
            MotorFaults::UNDERSPEED,
            running && ramped_up && self.actual_speed < lower - self.params.underspeed_margin,
        );
        self.faults = faults;
    }
}

/// Clamp to `[0, 100]`; NaN maps to zero.
#[inline]
fn clamp_speed(value: f64) -> f64 {
    if value.is_nan() {
        SPEED_MIN
    } else {
        value.clamp(SPEED_MIN, SPEED_MAX)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
