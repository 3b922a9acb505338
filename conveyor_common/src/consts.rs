//! Workspace-wide constants.
//!
//! Single source of truth for default timings, simulation coefficients and
//! parameter bounds. Durations are in milliseconds unless the name says
//! otherwise.

// ─── Cycle ──────────────────────────────────────────────────────────

/// Default control cycle time [ms].
pub const CYCLE_TIME_MS: u64 = 10;
pub const CYCLE_TIME_MS_MIN: u64 = 1;
pub const CYCLE_TIME_MS_MAX: u64 = 1000;

/// Default status log interval [cycles].
pub const LOG_INTERVAL_DEFAULT: u64 = 100;

/// Number of conveyor instances driven by the orchestrator.
pub const CONVEYOR_COUNT: usize = 2;

/// Capacity of fixed-size status/fault text.
pub const STATUS_TEXT_CAPACITY: usize = 64;

// ─── Speed ──────────────────────────────────────────────────────────

/// Lower bound of every speed figure [%].
pub const SPEED_MIN: f64 = 0.0;
/// Upper bound of every speed figure [%].
pub const SPEED_MAX: f64 = 100.0;

// ─── Motor ──────────────────────────────────────────────────────────

pub const MOTOR_STARTUP_DELAY_MS: u64 = 2000;
pub const MOTOR_RAMP_UP_MS: u64 = 5000;
pub const MOTOR_RAMP_DOWN_MS: u64 = 3000;
pub const MOTOR_FAULT_DEBOUNCE_MS: u64 = 500;

/// Feedback slew per cycle [% points].
pub const MOTOR_FEEDBACK_STEP: f64 = 2.0;
/// Simulated no-load current [A].
pub const MOTOR_CURRENT_BASE: f64 = 2.0;
/// Simulated current gain at 100 % speed [A].
pub const MOTOR_CURRENT_SLOPE: f64 = 8.0;
/// Simulated torque at 100 % speed [% of rated].
pub const MOTOR_TORQUE_SLOPE: f64 = 100.0;
/// Per-cycle current decay factor while stopping.
pub const MOTOR_CURRENT_DECAY: f64 = 0.9;

pub const MOTOR_OVERCURRENT_LIMIT: f64 = 12.0;
pub const MOTOR_OVERSPEED_MARGIN: f64 = 10.0;
pub const MOTOR_UNDERSPEED_MARGIN: f64 = 10.0;

// ─── Conveyor ───────────────────────────────────────────────────────

pub const CONVEYOR_START_DELAY_MS: u64 = 1000;
pub const CONVEYOR_FAULT_DEBOUNCE_MS: u64 = 10_000;
/// Sustained speed above this value trips the conveyor fault [%].
pub const CONVEYOR_OVERSPEED_THRESHOLD: i32 = 95;
pub const CONVEYOR_MAX_SPEED: i32 = 100;
pub const CONVEYOR_MIN_SPEED: i32 = 0;
/// Run hours between maintenance.
pub const CONVEYOR_MAINTENANCE_INTERVAL_H: u64 = 2000;
pub const CONVEYOR_MAINTENANCE_INTERVAL_H_MAX: u64 = 100_000;

// ─── Orchestrator ───────────────────────────────────────────────────

pub const AUTO_TOGGLE_MS: u64 = 10_000;
pub const CONVEYOR_SETPOINTS: [i32; CONVEYOR_COUNT] = [50, 75];

// ─── Timer bounds (all presets) ─────────────────────────────────────

pub const PRESET_MS_MIN: u64 = 1;
pub const PRESET_MS_MAX: u64 = 3_600_000;
