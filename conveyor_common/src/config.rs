//! Configuration loading traits and types.
//!
//! All sections are optional in TOML; missing fields take the defaults from
//! [`crate::consts`]. Unknown fields are rejected. Numeric parameters carry
//! MIN/MAX bounds checked by [`ControlConfig::validate`].
//!
//! # TOML Example
//!
//! ```toml
//! [shared]
//! service_name = "line-1"
//! log_level = "debug"
//!
//! [cycle]
//! cycle_time_ms = 10
//!
//! [motor]
//! ramp_up_ms = 4000
//!
//! [orchestrator]
//! conveyor_setpoints = [40, 60]
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::*;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// File exists but could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(String),

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common fields shared by every application of the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "conveyor-line".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax or schema is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::Io(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Sections ───────────────────────────────────────────────────────

/// Cycle pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    /// Control cycle time [ms].
    pub cycle_time_ms: u64,
    /// Status log interval [cycles], 0 disables periodic status lines.
    pub log_interval: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: CYCLE_TIME_MS,
            log_interval: LOG_INTERVAL_DEFAULT,
        }
    }
}

impl CycleConfig {
    #[inline]
    pub fn cycle_time(&self) -> Duration {
        Duration::from_millis(self.cycle_time_ms)
    }
}

/// Motor timing, simulation and threshold parameters.
///
/// Configures the standalone `MotorControl` machine only. Conveyors do not
/// embed a motor, so the line runner parses and validates this section but
/// builds nothing from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorConfig {
    pub startup_delay_ms: u64,
    pub ramp_up_ms: u64,
    pub ramp_down_ms: u64,
    pub fault_debounce_ms: u64,
    /// Feedback slew per cycle [% points].
    pub feedback_step: f64,
    /// Simulated current at standstill [A].
    pub current_base: f64,
    /// Simulated current added at 100 % speed [A].
    pub current_slope: f64,
    /// Simulated torque at 100 % speed [% of rated].
    pub torque_slope: f64,
    /// Per-cycle current decay factor while stopping, in (0, 1].
    pub current_decay: f64,
    /// Overcurrent trip level [A].
    pub overcurrent_limit: f64,
    /// Allowed overshoot above command [% points].
    pub overspeed_margin: f64,
    /// Allowed shortfall below command once ramped up [% points].
    pub underspeed_margin: f64,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            startup_delay_ms: MOTOR_STARTUP_DELAY_MS,
            ramp_up_ms: MOTOR_RAMP_UP_MS,
            ramp_down_ms: MOTOR_RAMP_DOWN_MS,
            fault_debounce_ms: MOTOR_FAULT_DEBOUNCE_MS,
            feedback_step: MOTOR_FEEDBACK_STEP,
            current_base: MOTOR_CURRENT_BASE,
            current_slope: MOTOR_CURRENT_SLOPE,
            torque_slope: MOTOR_TORQUE_SLOPE,
            current_decay: MOTOR_CURRENT_DECAY,
            overcurrent_limit: MOTOR_OVERCURRENT_LIMIT,
            overspeed_margin: MOTOR_OVERSPEED_MARGIN,
            underspeed_margin: MOTOR_UNDERSPEED_MARGIN,
        }
    }
}

impl MotorConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
    pub fn ramp_up(&self) -> Duration {
        Duration::from_millis(self.ramp_up_ms)
    }
    pub fn ramp_down(&self) -> Duration {
        Duration::from_millis(self.ramp_down_ms)
    }
    pub fn fault_debounce(&self) -> Duration {
        Duration::from_millis(self.fault_debounce_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_preset("motor.startup_delay_ms", self.startup_delay_ms)?;
        check_preset("motor.ramp_up_ms", self.ramp_up_ms)?;
        check_preset("motor.ramp_down_ms", self.ramp_down_ms)?;
        check_preset("motor.fault_debounce_ms", self.fault_debounce_ms)?;
        check_range("motor.feedback_step", self.feedback_step, 0.1, SPEED_MAX)?;
        check_range("motor.current_base", self.current_base, 0.0, 1000.0)?;
        check_range("motor.current_slope", self.current_slope, 0.0, 1000.0)?;
        check_range("motor.torque_slope", self.torque_slope, 0.0, 1000.0)?;
        check_range("motor.overcurrent_limit", self.overcurrent_limit, 0.1, 10_000.0)?;
        check_range("motor.overspeed_margin", self.overspeed_margin, 0.0, SPEED_MAX)?;
        check_range("motor.underspeed_margin", self.underspeed_margin, 0.0, SPEED_MAX)?;
        if !(self.current_decay > 0.0 && self.current_decay <= 1.0) {
            return Err(ConfigError::ValidationError(format!(
                "motor.current_decay {} out of range (0, 1]",
                self.current_decay
            )));
        }
        Ok(())
    }
}

/// Conveyor timing and reporting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConveyorConfig {
    pub start_delay_ms: u64,
    pub fault_debounce_ms: u64,
    /// Sustained speed above this trips the fault [%].
    pub overspeed_threshold: i32,
    /// Reported speed bounds [%].
    pub max_speed: i32,
    pub min_speed: i32,
    /// Run hours between maintenance.
    pub maintenance_interval_h: u64,
}

impl Default for ConveyorConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: CONVEYOR_START_DELAY_MS,
            fault_debounce_ms: CONVEYOR_FAULT_DEBOUNCE_MS,
            overspeed_threshold: CONVEYOR_OVERSPEED_THRESHOLD,
            max_speed: CONVEYOR_MAX_SPEED,
            min_speed: CONVEYOR_MIN_SPEED,
            maintenance_interval_h: CONVEYOR_MAINTENANCE_INTERVAL_H,
        }
    }
}

impl ConveyorConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
    pub fn fault_debounce(&self) -> Duration {
        Duration::from_millis(self.fault_debounce_ms)
    }
    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_h * 3600)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_preset("conveyor.start_delay_ms", self.start_delay_ms)?;
        check_preset("conveyor.fault_debounce_ms", self.fault_debounce_ms)?;
        check_speed("conveyor.overspeed_threshold", self.overspeed_threshold)?;
        check_speed("conveyor.max_speed", self.max_speed)?;
        check_speed("conveyor.min_speed", self.min_speed)?;
        if self.min_speed > self.max_speed {
            return Err(ConfigError::ValidationError(format!(
                "conveyor.min_speed {} greater than max_speed {}",
                self.min_speed, self.max_speed
            )));
        }
        if self.maintenance_interval_h == 0
            || self.maintenance_interval_h > CONVEYOR_MAINTENANCE_INTERVAL_H_MAX
        {
            return Err(ConfigError::ValidationError(format!(
                "conveyor.maintenance_interval_h {} out of range [1, {}]",
                self.maintenance_interval_h, CONVEYOR_MAINTENANCE_INTERVAL_H_MAX
            )));
        }
        Ok(())
    }
}

/// Line sequence parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Toggle conveyor starts periodically while running.
    pub auto_mode: bool,
    /// Auto-mode toggle period [ms].
    pub auto_toggle_ms: u64,
    /// Speed setpoint per conveyor [%].
    pub conveyor_setpoints: [i32; CONVEYOR_COUNT],
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            auto_mode: true,
            auto_toggle_ms: AUTO_TOGGLE_MS,
            conveyor_setpoints: CONVEYOR_SETPOINTS,
        }
    }
}

impl OrchestratorConfig {
    pub fn auto_toggle(&self) -> Duration {
        Duration::from_millis(self.auto_toggle_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_preset("orchestrator.auto_toggle_ms", self.auto_toggle_ms)?;
        for sp in self.conveyor_setpoints {
            check_speed("orchestrator.conveyor_setpoints", sp)?;
        }
        Ok(())
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete configuration of the control application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    pub shared: SharedConfig,
    pub cycle: CycleConfig,
    /// Standalone motor machine; unused by the line runner.
    pub motor: MotorConfig,
    pub conveyor: ConveyorConfig,
    pub orchestrator: OrchestratorConfig,
}

impl ControlConfig {
    /// Load from a TOML file and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        if !(CYCLE_TIME_MS_MIN..=CYCLE_TIME_MS_MAX).contains(&self.cycle.cycle_time_ms) {
            return Err(ConfigError::ValidationError(format!(
                "cycle.cycle_time_ms {} out of range [{}, {}]",
                self.cycle.cycle_time_ms, CYCLE_TIME_MS_MIN, CYCLE_TIME_MS_MAX
            )));
        }
        self.motor.validate()?;
        self.conveyor.validate()?;
        self.orchestrator.validate()?;
        Ok(())
    }
}

fn check_preset(name: &str, value: u64) -> Result<(), ConfigError> {
    if !(PRESET_MS_MIN..=PRESET_MS_MAX).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} {value} out of range [{PRESET_MS_MIN}, {PRESET_MS_MAX}]"
        )));
    }
    Ok(())
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min..=max).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} {value} out of range [{min}, {max}]"
        )));
    }
    Ok(())
}

fn check_speed(name: &str, value: i32) -> Result<(), ConfigError> {
    if !(0..=100).contains(&value) {
        return Err(ConfigError::ValidationError(format!(
            "{name} {value} out of range [0, 100]"
        )));
    }
    Ok(())
}
