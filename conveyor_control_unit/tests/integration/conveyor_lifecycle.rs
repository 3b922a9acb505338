//! Integration test: conveyor with the default line timing.
//!
//! Validates: start delay → Running, sustained overspeed → Fault on the
//! exact debounce cycle, reset as a continuous inhibitor.

use std::time::Duration;

use conveyor_common::config::ConveyorConfig;
use conveyor_common::fault::FaultCause;
use conveyor_common::state::MotorState;

use conveyor_control_unit::conveyor::{ConveyorControl, ConveyorInputs};

const DT: Duration = Duration::from_millis(10);

fn cmd(start: bool, reset: bool, speed: i32) -> ConveyorInputs {
    ConveyorInputs {
        start,
        reset,
        speed_setpoint: speed,
        measured_current: None,
    }
}

// ── Scenario B: start delay ─────────────────────────────────────────

#[test]
fn start_delay_elapses_into_running() {
    let config = ConveyorConfig::default();
    let preset = config.start_delay();
    let mut conveyor = ConveyorControl::new(config);

    let out = conveyor.advance(&cmd(true, true, 50), DT);
    assert_eq!(out.state, MotorState::Starting);
    assert_eq!(out.start_count, 1);

    let mut cycles = 0;
    loop {
        let out = conveyor.advance(&cmd(true, true, 50), DT);
        cycles += 1;
        if out.state == MotorState::Running {
            assert_eq!(conveyor.start_delay_elapsed(), preset);
            break;
        }
        assert!(conveyor.start_delay_elapsed() < preset);
        assert!(cycles < 1_000, "never reached Running");
    }
    assert_eq!(cycles, 100);
    assert_eq!(conveyor.start_count(), 1);
}

// ── Scenario C: sustained overspeed ─────────────────────────────────

#[test]
fn sustained_overspeed_faults_on_debounce_cycle() {
    let config = ConveyorConfig::default();
    let debounce_ticks = (config.fault_debounce().as_millis() / DT.as_millis()) as usize;
    let mut conveyor = ConveyorControl::new(config);

    while conveyor.state() != MotorState::Running {
        conveyor.advance(&cmd(true, true, 96), DT);
    }

    for _ in 0..debounce_ticks - 1 {
        let out = conveyor.advance(&cmd(true, true, 96), DT);
        assert_eq!(out.state, MotorState::Running);
        assert_eq!(out.actual_speed, 96);
    }
    let out = conveyor.advance(&cmd(true, true, 96), DT);
    assert_eq!(out.state, MotorState::Fault);
    assert_eq!(out.actual_speed, 0);
    assert_eq!(conveyor.fault_cause(), Some(FaultCause::SustainedOverspeed));
    assert_eq!(
        conveyor.data().diagnostics.last_fault.as_str(),
        "Sustained speed above limit"
    );

    // Reset clears the fault unconditionally.
    let out = conveyor.advance(&cmd(false, true, 96), DT);
    assert_eq!(out.state, MotorState::Stopped);
    assert!(out.ready);
}

// ── Reset inhibitor ─────────────────────────────────────────────────

#[test]
fn reset_low_holds_stopped_in_every_state() {
    let config = ConveyorConfig {
        start_delay_ms: 50,
        ..ConveyorConfig::default()
    };
    let mut conveyor = ConveyorControl::new(config);

    // Interleave: bring it up, inhibit, repeat.
    for _ in 0..3 {
        for _ in 0..10 {
            conveyor.advance(&cmd(true, true, 70), DT);
        }
        assert_eq!(conveyor.state(), MotorState::Running);
        for _ in 0..5 {
            let out = conveyor.advance(&cmd(true, false, 70), DT);
            assert_eq!(out.state, MotorState::Stopped);
            assert_eq!(out.actual_speed, 0);
            assert!(!out.running);
        }
    }
    // Start held high the whole time: a single edge.
    assert_eq!(conveyor.start_count(), 1);
    assert!(conveyor.run_time() > Duration::ZERO);
}

#[test]
fn diagnostics_follow_measured_current() {
    let config = ConveyorConfig {
        start_delay_ms: 20,
        ..ConveyorConfig::default()
    };
    let mut conveyor = ConveyorControl::new(config);
    let samples = [3.0, 5.0, 4.0, 8.0];
    for amps in samples {
        let mut input = cmd(true, true, 40);
        input.measured_current = Some(amps);
        conveyor.advance(&input, DT);
    }
    let diag = &conveyor.data().diagnostics;
    assert_eq!(diag.current_samples, 4);
    assert!((diag.average_current - 5.0).abs() < 1e-9);
    assert_eq!(diag.peak_current, 8.0);
    assert_eq!(diag.fault_count, 0);
}
