//! Integration test: configuration file → runner → report.

use std::io::Write;
use std::sync::atomic::AtomicBool;

use conveyor_common::config::{ConfigError, ControlConfig};
use conveyor_common::state::{MotorState, SystemState};

use conveyor_control_unit::cycle::CycleRunner;

const LINE_TOML: &str = r#"
[shared]
service_name = "line-7"
log_level = "debug"

[cycle]
cycle_time_ms = 1
log_interval = 0

[conveyor]
start_delay_ms = 3

[orchestrator]
auto_toggle_ms = 10
conveyor_setpoints = [30, 90]
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn runner_uses_file_configuration() {
    let file = write_config(LINE_TOML);
    let config = ControlConfig::load_validated(file.path()).expect("load");
    assert_eq!(config.shared.service_name, "line-7");

    let mut runner = CycleRunner::new(config);
    assert_eq!(runner.cycle_time().as_millis(), 1);

    // Sequence (2) + auto period (10) + start delay (3) + speed (1).
    let mut outputs = runner.run_cycle();
    for _ in 0..15 {
        outputs = runner.run_cycle();
    }
    assert!(outputs.iter().all(|o| o.state == MotorState::Running));
    assert_eq!(outputs[0].actual_speed, 30);
    assert_eq!(outputs[1].actual_speed, 90);

    let report = serde_json::to_value(runner.report()).expect("serialize");
    assert_eq!(report["service_name"], "line-7");
    assert_eq!(report["state"], "Running");
    assert_eq!(report["conveyors"][1]["speed"], 90);
    assert_eq!(report["conveyors"][0]["start_count"], 1);
}

#[test]
fn paced_run_then_drain() {
    let file = write_config(LINE_TOML);
    let config = ControlConfig::load_validated(file.path()).expect("load");
    let mut runner = CycleRunner::new(config);

    let running = AtomicBool::new(true);
    let executed = runner.run(25, &running).expect("run");
    assert_eq!(executed, 25);
    assert_eq!(runner.stats().cycle_count, 25);
    assert!(runner.stats().max_cycle_ns >= runner.stats().min_cycle_ns);

    runner.drain(100);
    assert_eq!(runner.orchestrator().state(), SystemState::Ready);
    assert!(runner.orchestrator().conveyors_at_rest());
    assert_eq!(runner.status().status_message.as_str(), "System ready");
}

#[test]
fn manual_mode_keeps_conveyors_stopped() {
    let mut config = ControlConfig::from_toml_str(LINE_TOML).expect("parse");
    config.orchestrator.auto_mode = false;
    let mut runner = CycleRunner::new(config);
    assert!(!runner.inputs().auto_mode);

    for _ in 0..50 {
        runner.run_cycle();
    }
    assert_eq!(runner.orchestrator().state(), SystemState::Running);
    assert!(
        runner
            .orchestrator()
            .conveyors()
            .iter()
            .all(|c| c.state() == MotorState::Stopped)
    );

    // Operator switches auto mode on at runtime.
    runner.inputs_mut().auto_mode = true;
    for _ in 0..10 {
        runner.run_cycle();
    }
    assert!(runner.orchestrator().conveyor_start());
}

#[test]
fn invalid_setpoint_rejected() {
    let toml = LINE_TOML.replace("[30, 90]", "[30, 190]");
    let file = write_config(&toml);
    let err = ControlConfig::load_validated(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError(_)));
}

#[test]
fn unknown_key_rejected() {
    let toml = format!("{LINE_TOML}\n[motor]\nturbo = true\n");
    let err = ControlConfig::from_toml_str(&toml).unwrap_err();
    assert!(matches!(err, ConfigError::ParseError(_)));
}

#[test]
fn motor_section_does_not_change_line_outputs() {
    let baseline = ControlConfig::from_toml_str(LINE_TOML).expect("parse");
    let toml = format!(
        "{LINE_TOML}\n[motor]\nstartup_delay_ms = 10\nramp_up_ms = 20\noverspeed_margin = 1.0\n"
    );
    let tuned = ControlConfig::from_toml_str(&toml).expect("parse");
    assert_ne!(baseline.motor, tuned.motor);

    let mut a = CycleRunner::new(baseline);
    let mut b = CycleRunner::new(tuned);
    for _ in 0..60 {
        assert_eq!(a.run_cycle(), b.run_cycle());
    }
    assert_eq!(
        a.status().status_message.as_str(),
        b.status().status_message.as_str()
    );
}
