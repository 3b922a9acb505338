//! Status and reporting records.
//!
//! Both records are write-only sinks for the control logic: they are
//! refreshed from live instance fields at the end of a cycle and read by
//! reporting collaborators. Nothing in the control path reads them back.

use std::time::Duration;

use serde::Serialize;

use crate::consts::STATUS_TEXT_CAPACITY;
use crate::fault::FaultCause;

/// Fixed-capacity text used for status and fault messages.
pub type StatusText = heapless::String<STATUS_TEXT_CAPACITY>;

/// Replace the contents of `buf` with `text`, truncated to capacity.
pub fn set_text(buf: &mut StatusText, text: &str) {
    buf.clear();
    for ch in text.chars() {
        if buf.push(ch).is_err() {
            break;
        }
    }
}

// ─── Process-wide Status ────────────────────────────────────────────

/// Process-wide status block.
///
/// Single writer (the orchestrator, once per cycle), any number of readers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SystemStatus {
    /// Orchestrator is in its Running state.
    pub system_running: bool,
    /// Cycles executed since start.
    pub cycle_count: u64,
    /// Human readable summary.
    pub status_message: StatusText,
}

impl SystemStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish one cycle's worth of status.
    pub fn publish(&mut self, system_running: bool, cycle_count: u64, message: &str) {
        self.system_running = system_running;
        self.cycle_count = cycle_count;
        set_text(&mut self.status_message, message);
    }
}

// ─── Conveyor Data Record ───────────────────────────────────────────

/// Diagnostic aggregates of one conveyor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConveyorDiagnostics {
    /// Mean of all current samples [A].
    pub average_current: f64,
    /// Highest current sample [A].
    pub peak_current: f64,
    /// Number of current samples folded into the mean.
    pub current_samples: u64,
    /// Faults since start.
    pub fault_count: u32,
    /// Description of the most recent fault (empty if none).
    pub last_fault: StatusText,
}

impl ConveyorDiagnostics {
    /// Fold one current sample into average and peak.
    pub fn record_current(&mut self, amps: f64) {
        self.current_samples += 1;
        self.average_current += (amps - self.average_current) / self.current_samples as f64;
        if amps > self.peak_current {
            self.peak_current = amps;
        }
    }

    /// Count a fault and remember its description.
    pub fn record_fault(&mut self, cause: FaultCause) {
        self.fault_count = self.fault_count.saturating_add(1);
        set_text(&mut self.last_fault, cause.description());
    }
}

/// Denormalized per-conveyor snapshot for reporting.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConveyorData {
    pub running: bool,
    /// Actual speed [%].
    pub speed: i32,
    pub start_count: u32,
    /// Total run time across all runs.
    pub run_time: Duration,
    /// Configured speed bounds [%].
    pub max_speed: i32,
    pub min_speed: i32,
    /// Run time left until the next maintenance (saturates at zero).
    pub maintenance_remaining: Duration,
    pub diagnostics: ConveyorDiagnostics,
}

impl ConveyorData {
    /// Empty record carrying the configured bounds.
    pub fn new(min_speed: i32, max_speed: i32, maintenance_interval: Duration) -> Self {
        Self {
            min_speed,
            max_speed,
            maintenance_remaining: maintenance_interval,
            ..Self::default()
        }
    }
}
