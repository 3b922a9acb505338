//! Integration test: orchestrator auto mode driving both conveyors.
//!
//! Validates: start flags toggle exactly once per auto period, both
//! conveyors see the same command every cycle, a stop request drains the
//! line back to Ready.

use std::time::Duration;

use conveyor_common::config::ControlConfig;
use conveyor_common::state::{MotorState, SystemState};
use conveyor_common::status::SystemStatus;

use conveyor_control_unit::orchestrator::{Orchestrator, OrchestratorInputs};

const DT: Duration = Duration::from_millis(10);

/// Auto period of 20 ticks.
const PERIOD: u64 = 20;

fn line_config() -> ControlConfig {
    let mut config = ControlConfig::default();
    config.orchestrator.auto_toggle_ms = PERIOD * 10;
    config.conveyor.start_delay_ms = 50;
    config
}

fn auto_inputs() -> OrchestratorInputs {
    OrchestratorInputs {
        start_system: true,
        reset: true,
        auto_mode: true,
        ..Default::default()
    }
}

// ── Scenario E: lock-step toggle ────────────────────────────────────

#[test]
fn start_flags_toggle_once_per_period_in_sync() {
    let mut line = Orchestrator::new(&line_config());
    let mut status = SystemStatus::new();

    // Initialize → Ready → Running.
    line.advance(&auto_inputs(), &mut status, DT);
    line.advance(&auto_inputs(), &mut status, DT);
    assert_eq!(line.state(), SystemState::Running);

    let mut previous = line.conveyor_start();
    let mut toggles = Vec::new();
    for cycle in 1..=(PERIOD * 6) {
        line.advance(&auto_inputs(), &mut status, DT);
        let [first, second] = line.conveyors();
        assert_eq!(first.start_command(), second.start_command());
        assert_eq!(first.start_command(), line.conveyor_start());
        if line.conveyor_start() != previous {
            toggles.push(cycle);
            previous = line.conveyor_start();
        }
    }

    assert_eq!(toggles, [20, 40, 60, 80, 100, 120]);
}

#[test]
fn conveyors_run_at_their_setpoints() {
    let mut config = line_config();
    config.orchestrator.conveyor_setpoints = [40, 65];
    let mut line = Orchestrator::new(&config);
    let mut status = SystemStatus::new();

    // Two sequence cycles + one period until the first toggle, then the
    // start delay and one more cycle for speed to follow.
    let mut outputs = line.advance(&auto_inputs(), &mut status, DT);
    for _ in 0..(2 + PERIOD + 6) {
        outputs = line.advance(&auto_inputs(), &mut status, DT);
    }
    assert!(outputs.iter().all(|o| o.state == MotorState::Running));
    assert_eq!(outputs[0].actual_speed, 40);
    assert_eq!(outputs[1].actual_speed, 65);
    assert!(status.system_running);
    assert_eq!(status.status_message.as_str(), "System running");
}

#[test]
fn stop_request_drains_line() {
    let mut line = Orchestrator::new(&line_config());
    let mut status = SystemStatus::new();
    for _ in 0..(2 + PERIOD + 10) {
        line.advance(&auto_inputs(), &mut status, DT);
    }
    assert!(line.conveyors().iter().all(|c| c.state() == MotorState::Running));

    let stop = OrchestratorInputs {
        stop_system: true,
        ..auto_inputs()
    };
    line.advance(&stop, &mut status, DT);
    assert_eq!(line.state(), SystemState::Stopping);
    assert!(line.conveyors().iter().all(|c| c.state() == MotorState::Stopping));

    line.advance(&stop, &mut status, DT);
    assert_eq!(line.state(), SystemState::Ready);
    assert!(line.conveyors_at_rest());
    assert!(!status.system_running);

    // Holding stop keeps the line in Ready.
    for _ in 0..PERIOD * 2 {
        line.advance(&stop, &mut status, DT);
        assert_eq!(line.state(), SystemState::Ready);
        assert!(!line.conveyor_start());
    }
}

#[test]
fn reset_low_inhibits_conveyors_but_not_sequence() {
    let mut line = Orchestrator::new(&line_config());
    let mut status = SystemStatus::new();
    let inhibited = OrchestratorInputs {
        reset: false,
        ..auto_inputs()
    };
    for _ in 0..(PERIOD * 3) {
        let outputs = line.advance(&inhibited, &mut status, DT);
        assert!(outputs.iter().all(|o| o.state == MotorState::Stopped));
    }
    assert_eq!(line.state(), SystemState::Running);
}
