//! Line orchestrator: top-level cycle driver.
//!
//! Sequence `Initialize → Ready → Running → Stopping → Ready`. In `Running`
//! with auto mode on, an on-delay timer flips both conveyor start flags in
//! lock-step each time it elapses and is then re-armed. Entering `Stopping`
//! forces both start flags low; the next cycle returns to `Ready`.
//!
//! Every cycle increments the cycle counter, advances both conveyors in
//! order and republishes the process-wide [`SystemStatus`].

use std::time::Duration;

use conveyor_common::config::{ControlConfig, OrchestratorConfig};
use conveyor_common::consts::CONVEYOR_COUNT;
use conveyor_common::state::SystemState;
use conveyor_common::status::SystemStatus;
use tracing::{debug, info};

use crate::conveyor::{ConveyorControl, ConveyorInputs, ConveyorOutputs};
use crate::timer::OnDelayTimer;

/// Status text while a conveyor reports a fault, by conveyor index.
const FAULT_MESSAGES: [&str; CONVEYOR_COUNT] = [
    "Fault on conveyor 1 - reset required",
    "Fault on conveyor 2 - reset required",
];

/// Operator inputs sampled at cycle start.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrchestratorInputs {
    /// Leave `Ready` for `Running` (level).
    pub start_system: bool,
    /// Leave `Running` for `Stopping` (level, wins over start).
    pub stop_system: bool,
    /// Passed to both conveyors as their reset/inhibit input.
    pub reset: bool,
    /// Toggle conveyor starts periodically while running.
    pub auto_mode: bool,
    /// Per-conveyor drive current measurements [A].
    pub conveyor_currents: [Option<f64>; CONVEYOR_COUNT],
}

/// The line sequence and the two conveyors it drives.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    params: OrchestratorConfig,
    state: SystemState,
    conveyors: [ConveyorControl; CONVEYOR_COUNT],
    /// Start command shared by both conveyors.
    conveyor_start: bool,
    auto_timer: OnDelayTimer,
    cycle_count: u64,
}

impl Orchestrator {
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            params: config.orchestrator.clone(),
            state: SystemState::Initialize,
            conveyors: core::array::from_fn(|_| ConveyorControl::new(config.conveyor.clone())),
            conveyor_start: false,
            auto_timer: OnDelayTimer::new(),
            cycle_count: 0,
        }
    }

    #[inline]
    pub const fn state(&self) -> SystemState {
        self.state
    }

    #[inline]
    pub const fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Start flag currently commanded to both conveyors.
    #[inline]
    pub const fn conveyor_start(&self) -> bool {
        self.conveyor_start
    }

    #[inline]
    pub fn conveyors(&self) -> &[ConveyorControl; CONVEYOR_COUNT] {
        &self.conveyors
    }

    /// Whether every conveyor has come to rest (Stopped or Fault).
    pub fn conveyors_at_rest(&self) -> bool {
        self.conveyors.iter().all(|c| {
            let out = c.outputs();
            !out.running && out.actual_speed == 0
        })
    }

    /// Run one control cycle of length `dt` and publish `status`.
    pub fn advance(
        &mut self,
        inputs: &OrchestratorInputs,
        status: &mut SystemStatus,
        dt: Duration,
    ) -> [ConveyorOutputs; CONVEYOR_COUNT] {
        self.cycle_count = self.cycle_count.wrapping_add(1);

        match self.state {
            SystemState::Initialize => {
                self.conveyor_start = false;
                self.auto_timer.reset();
                self.transition(SystemState::Ready);
            }
            SystemState::Ready => {
                self.auto_timer.reset();
                if inputs.start_system && !inputs.stop_system {
                    self.transition(SystemState::Running);
                }
            }
            SystemState::Running => {
                if inputs.stop_system {
                    self.conveyor_start = false;
                    self.auto_timer.reset();
                    self.transition(SystemState::Stopping);
                } else if inputs.auto_mode {
                    let timer = self
                        .auto_timer
                        .update(true, self.params.auto_toggle(), dt);
                    if timer.done {
                        self.conveyor_start = !self.conveyor_start;
                        self.auto_timer.reset();
                        debug!(start = self.conveyor_start, "auto mode toggled conveyors");
                    }
                } else {
                    self.auto_timer.reset();
                }
            }
            SystemState::Stopping => {
                self.conveyor_start = false;
                self.auto_timer.reset();
                self.transition(SystemState::Ready);
            }
        }

        let mut outputs = [ConveyorOutputs::default(); CONVEYOR_COUNT];
        for (i, conveyor) in self.conveyors.iter_mut().enumerate() {
            let conveyor_inputs = ConveyorInputs {
                start: self.conveyor_start,
                reset: inputs.reset,
                speed_setpoint: self.params.conveyor_setpoints[i],
                measured_current: inputs.conveyor_currents[i],
            };
            outputs[i] = conveyor.advance(&conveyor_inputs, dt);
        }

        self.publish(status, &outputs);
        outputs
    }

    fn publish(&self, status: &mut SystemStatus, outputs: &[ConveyorOutputs; CONVEYOR_COUNT]) {
        let message = match outputs.iter().position(|o| o.fault) {
            Some(i) => FAULT_MESSAGES[i],
            None => self.state.status_text(),
        };
        status.publish(self.state == SystemState::Running, self.cycle_count, message);
    }

    fn transition(&mut self, next: SystemState) {
        if next == SystemState::Running || next == SystemState::Stopping {
            info!(from = ?self.state, to = ?next, "line sequence");
        } else {
            debug!(from = ?self.state, to = ?next, "line sequence");
        }
        self.state = next;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
