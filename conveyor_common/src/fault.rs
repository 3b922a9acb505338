//! Fault flags and fault causes.
//!
//! Motor sub-flags are recomputed every cycle from current and speed
//! thresholds; they are inputs to debounce logic, not errors themselves.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Motor threshold violations, recomputed every cycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotorFaults: u8 {
        /// Current above the overcurrent limit.
        const OVERCURRENT = 0x01;
        /// Actual speed above command plus margin.
        const OVERSPEED   = 0x02;
        /// Actual speed below command minus margin after ramp-up.
        const UNDERSPEED  = 0x04;
    }
}

impl MotorFaults {
    /// Returns true if any sub-flag is set.
    #[inline]
    pub const fn any(&self) -> bool {
        !self.is_empty()
    }
}

/// Reason an instance entered the Fault state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FaultCause {
    /// Debounced motor threshold violation.
    Threshold(u8),
    /// Conveyor ran above the overspeed threshold for the debounce window.
    SustainedOverspeed,
    /// A raw state value outside the state enumeration was loaded.
    InvalidState(u8),
}

impl FaultCause {
    /// Human readable description for the data record.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Threshold(bits) => {
                let flags = MotorFaults::from_bits_truncate(*bits);
                if flags.contains(MotorFaults::OVERCURRENT) {
                    "Overcurrent"
                } else if flags.contains(MotorFaults::OVERSPEED) {
                    "Overspeed"
                } else {
                    "Underspeed"
                }
            }
            Self::SustainedOverspeed => "Sustained speed above limit",
            Self::InvalidState(_) => "Invalid state value",
        }
    }
}
