//! Integration test: motor start, ramp, fault and reset.
//!
//! 1. Enable + start edge → Starting → Running after the startup delay.
//! 2. Ramp-up to setpoint, feedback converging at the slew step.
//! 3. Sustained overcurrent → Fault; reset ignored until it clears.

use std::time::Duration;

use conveyor_common::config::MotorConfig;
use conveyor_common::fault::{FaultCause, MotorFaults};
use conveyor_common::state::MotorState;

use conveyor_control_unit::motor::{MotorControl, MotorInputs};

const DT: Duration = Duration::from_millis(10);

// ── Helpers ─────────────────────────────────────────────────────────

/// 10-tick startup, 20-tick ramp-up, 10-tick ramp-down, 50-tick debounce.
fn line_params() -> MotorConfig {
    MotorConfig {
        startup_delay_ms: 100,
        ramp_up_ms: 200,
        ramp_down_ms: 100,
        fault_debounce_ms: 500,
        ..MotorConfig::default()
    }
}

fn run_cmd(setpoint: f64) -> MotorInputs {
    MotorInputs {
        enable: true,
        start: true,
        speed_setpoint: setpoint,
        ..Default::default()
    }
}

// ── Scenario A: start to setpoint ───────────────────────────────────

#[test]
fn start_edge_reaches_setpoint() {
    let mut motor = MotorControl::new(line_params());

    let out = motor.advance(&run_cmd(80.0), DT);
    assert_eq!(out.state, MotorState::Starting);

    // Startup delay: 10 ticks in Starting, Running on the 10th.
    for _ in 0..9 {
        assert_eq!(motor.advance(&run_cmd(80.0), DT).state, MotorState::Starting);
    }
    let out = motor.advance(&run_cmd(80.0), DT);
    assert_eq!(out.state, MotorState::Running);
    assert!(out.running && !out.ready);

    // Ramp until the command reaches the setpoint.
    let mut ramp_cycles = 0;
    loop {
        let out = motor.advance(&run_cmd(80.0), DT);
        ramp_cycles += 1;
        assert!(out.actual_speed <= out.speed_command + 1e-9);
        if (out.speed_command - 80.0).abs() < 1e-9 {
            break;
        }
        assert!(ramp_cycles < 100, "ramp never completed");
    }
    assert_eq!(ramp_cycles, 20);

    // Feedback converges within ceil(80 / 2) cycles.
    let mut converged = None;
    for n in 0..40 {
        let out = motor.advance(&run_cmd(80.0), DT);
        assert_eq!(out.state, MotorState::Running);
        if (out.actual_speed - 80.0).abs() < 1e-9 {
            converged = Some(n);
            break;
        }
    }
    assert!(converged.is_some(), "actual speed did not converge");
    assert!(motor.faults().is_empty());
    assert!(motor.outputs().current < line_params().overcurrent_limit);
}

/// Scenario A with the default motor timing at a given tick.
fn converges_at_tick(dt: Duration) {
    let mut motor = MotorControl::new(MotorConfig::default());
    let mut cycles = 0u64;

    // Startup and ramp: no sub-flag while feedback lags the command.
    loop {
        let out = motor.advance(&run_cmd(80.0), dt);
        cycles += 1;
        assert!(out.faults.is_empty(), "{dt:?}: flags {:?} in {:?}", out.faults, out.state);
        if out.state == MotorState::Running && (out.speed_command - 80.0).abs() < 1e-9 {
            break;
        }
        assert!(cycles < 10_000, "{dt:?}: ramp never completed");
    }

    let mut converged = false;
    for _ in 0..40 {
        let out = motor.advance(&run_cmd(80.0), dt);
        assert_eq!(out.state, MotorState::Running, "{dt:?}: left Running");
        assert!(out.faults.is_empty(), "{dt:?}: flags {:?}", out.faults);
        if (out.actual_speed - 80.0).abs() < 1e-9 {
            converged = true;
            break;
        }
    }
    assert!(converged, "{dt:?}: actual speed did not converge");
}

#[test]
fn converges_at_cycle_time_extremes() {
    use conveyor_common::consts::{CYCLE_TIME_MS_MAX, CYCLE_TIME_MS_MIN};
    for ms in [CYCLE_TIME_MS_MIN, 125, 250, 500, CYCLE_TIME_MS_MAX] {
        converges_at_tick(Duration::from_millis(ms));
    }
}

#[test]
fn actual_speed_bounded_over_full_cycle() {
    let mut motor = MotorControl::new(line_params());
    let sequence = [(true, 150.0, 120), (false, 150.0, 30), (true, -40.0, 60)];
    for (start, setpoint, cycles) in sequence {
        let cmd = MotorInputs {
            enable: true,
            start,
            stop: !start,
            speed_setpoint: setpoint,
            ..Default::default()
        };
        for _ in 0..cycles {
            let out = motor.advance(&cmd, DT);
            assert!((0.0..=100.0).contains(&out.actual_speed));
            assert!((0.0..=100.0).contains(&out.speed_command));
        }
    }
}

#[test]
fn stop_ramps_down_then_ready() {
    let mut motor = MotorControl::new(line_params());
    for _ in 0..80 {
        motor.advance(&run_cmd(50.0), DT);
    }
    assert_eq!(motor.state(), MotorState::Running);

    let stop = MotorInputs {
        stop: true,
        ..run_cmd(50.0)
    };
    let out = motor.advance(&stop, DT);
    assert_eq!(out.state, MotorState::Stopping);

    let mut previous = out.actual_speed;
    let mut stopped = false;
    for _ in 0..20 {
        let out = motor.advance(&stop, DT);
        assert!(out.actual_speed <= previous);
        previous = out.actual_speed;
        if out.state == MotorState::Stopped {
            stopped = true;
            assert_eq!(out.actual_speed, 0.0);
            assert!(out.ready);
            break;
        }
    }
    assert!(stopped);
}

// ── Scenario D: gated reset ─────────────────────────────────────────

#[test]
fn overcurrent_fault_requires_clear_before_reset() {
    let mut motor = MotorControl::new(line_params());
    for _ in 0..40 {
        motor.advance(&run_cmd(60.0), DT);
    }
    assert_eq!(motor.state(), MotorState::Running);

    let overloaded = MotorInputs {
        measured_current: Some(18.0),
        ..run_cmd(60.0)
    };
    let mut trip_cycle = None;
    for n in 1..=60 {
        let out = motor.advance(&overloaded, DT);
        assert!(out.faults.contains(MotorFaults::OVERCURRENT));
        if out.fault {
            trip_cycle = Some(n);
            break;
        }
    }
    // 500 ms debounce at 10 ms per tick.
    assert_eq!(trip_cycle, Some(50));
    assert_eq!(
        motor.fault_cause(),
        Some(FaultCause::Threshold(MotorFaults::OVERCURRENT.bits()))
    );

    let reset_while_over = MotorInputs {
        reset: true,
        ..overloaded
    };
    for _ in 0..5 {
        let out = motor.advance(&reset_while_over, DT);
        assert_eq!(out.state, MotorState::Fault);
        assert_eq!(out.actual_speed, 0.0);
    }

    let reset_clear = MotorInputs {
        enable: true,
        reset: true,
        ..Default::default()
    };
    let out = motor.advance(&reset_clear, DT);
    assert_eq!(out.state, MotorState::Stopped);
    assert!(!out.fault);
    assert!(out.ready);

    // Start again needs a fresh edge.
    let out = motor.advance(&run_cmd(60.0), DT);
    assert_eq!(out.state, MotorState::Starting);
}
