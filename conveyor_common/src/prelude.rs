//! Prelude module for common re-exports.
//!
//! ```rust
//! use conveyor_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControlConfig, ConveyorConfig, CycleConfig, LogLevel, MotorConfig,
    OrchestratorConfig, SharedConfig,
};

// ─── State & Faults ─────────────────────────────────────────────────
pub use crate::fault::{FaultCause, MotorFaults};
pub use crate::state::{MotorState, SystemState};

// ─── Reporting ──────────────────────────────────────────────────────
pub use crate::status::{ConveyorData, ConveyorDiagnostics, StatusText, SystemStatus};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{CONVEYOR_COUNT, SPEED_MAX, SPEED_MIN};
