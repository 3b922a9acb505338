//! State enumerations shared across the workspace.
//!
//! `MotorState` is the single state type used by both the motor and the
//! conveyor state machines; each owner keeps its own transition function.
//! All enums are `#[repr(u8)]` so they can be retained or exchanged as raw
//! bytes; `from_u8` returns `None` for values outside the enumeration.

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Drive sequence state (motor and conveyor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum MotorState {
    /// Idle, outputs zero.
    #[default]
    Stopped = 0,
    /// Start delay running.
    Starting = 1,
    /// Producing speed.
    Running = 2,
    /// Decelerating towards standstill.
    Stopping = 3,
    /// Latched fault, waits for reset.
    Fault = 4,
}

impl MotorState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Stopped),
            1 => Some(Self::Starting),
            2 => Some(Self::Running),
            3 => Some(Self::Stopping),
            4 => Some(Self::Fault),
            _ => None,
        }
    }

    /// Short display name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Stopping => "Stopping",
            Self::Fault => "Fault",
        }
    }
}

/// Orchestrator sequence state.
///
/// Discriminants follow the step numbering of the line sequence
/// (`Initialize → Ready → Running → Stopping → Ready`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum SystemState {
    #[default]
    Initialize = 0,
    Ready = 10,
    Running = 20,
    Stopping = 30,
}

impl SystemState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Initialize),
            10 => Some(Self::Ready),
            20 => Some(Self::Running),
            30 => Some(Self::Stopping),
            _ => None,
        }
    }

    /// Status text published while in this state.
    pub const fn status_text(&self) -> &'static str {
        match self {
            Self::Initialize => "Initializing",
            Self::Ready => "System ready",
            Self::Running => "System running",
            Self::Stopping => "System stopping",
        }
    }
}

const_assert_eq!(core::mem::size_of::<MotorState>(), 1);
const_assert_eq!(core::mem::size_of::<SystemState>(), 1);
