//! Cycle runner: paces the orchestrator at the configured cycle time.
//!
//! ## RT Setup
//! 1. `mlockall(MCL_CURRENT | MCL_FUTURE)` to lock all pages.
//! 2. Prefault stack pages.
//! 3. `sched_setaffinity` to pin to an isolated CPU core.
//! 4. `sched_setscheduler(SCHED_FIFO, prio)`.
//!
//! All of it is a no-op without the `rt` feature.
//!
//! ## Cycle Loop
//! Simulation: `std::thread::sleep` for the remainder of the cycle budget,
//! overruns are counted and logged. With `rt`: absolute-time sleep on
//! `CLOCK_MONOTONIC` for drift-free pacing, and an overrun aborts the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use conveyor_common::config::ControlConfig;
use conveyor_common::consts::CONVEYOR_COUNT;
use conveyor_common::state::SystemState;
use conveyor_common::status::{ConveyorData, SystemStatus};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::conveyor::ConveyorOutputs;
use crate::orchestrator::{Orchestrator, OrchestratorInputs};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-cycle timing statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    /// Total cycles executed.
    pub cycle_count: u64,
    /// Last cycle duration [ns].
    pub last_cycle_ns: i64,
    /// Minimum cycle duration [ns].
    pub min_cycle_ns: i64,
    /// Maximum cycle duration [ns].
    pub max_cycle_ns: i64,
    /// Running sum for average computation.
    pub sum_cycle_ns: i64,
    /// Number of overruns detected.
    pub overruns: u64,
    /// Maximum wake-up latency [ns].
    pub max_latency_ns: i64,
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            max_latency_ns: 0,
        }
    }

    /// Record a cycle duration. O(1), no allocation.
    #[inline]
    pub fn record(&mut self, duration_ns: i64, latency_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        self.min_cycle_ns = self.min_cycle_ns.min(duration_ns);
        self.max_cycle_ns = self.max_cycle_ns.max(duration_ns);
        self.sum_cycle_ns = self.sum_cycle_ns.saturating_add(duration_ns);
        self.max_latency_ns = self.max_latency_ns.max(latency_ns);
    }

    /// Average cycle time [ns] (0 if no cycles).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors during RT setup or cycle execution.
#[derive(Debug, Error)]
pub enum CycleError {
    /// RT system call failed.
    #[error("RT setup error: {0}")]
    RtSetup(String),

    /// Cycle exceeded its budget (fatal only with the `rt` feature).
    #[error("cycle overrun: {actual_ns}ns > {budget_ns}ns budget")]
    CycleOverrun {
        /// Actual cycle duration [ns].
        actual_ns: i64,
        /// Configured cycle budget [ns].
        budget_ns: i64,
    },
}

// ─── RT Setup ───────────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn rt_mlockall() -> Result<(), CycleError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| CycleError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_mlockall() -> Result<(), CycleError> {
    Ok(())
}

/// Touch 256 KiB of stack so the loop never page-faults on it.
#[cfg(feature = "rt")]
fn prefault_stack() {
    let mut buf = [0u8; 256 * 1024];
    for byte in buf.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `buf`.
        unsafe { core::ptr::write_volatile(byte, 0xFF) };
    }
    core::hint::black_box(&buf);
}

#[cfg(not(feature = "rt"))]
fn prefault_stack() {}

#[cfg(feature = "rt")]
fn rt_set_affinity(cpu: usize) -> Result<(), CycleError> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    let mut cpuset = CpuSet::new();
    cpuset
        .set(cpu)
        .map_err(|e| CycleError::RtSetup(format!("CpuSet::set({cpu}) failed: {e}")))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset)
        .map_err(|e| CycleError::RtSetup(format!("sched_setaffinity failed: {e}")))
}

#[cfg(not(feature = "rt"))]
fn rt_set_affinity(_cpu: usize) -> Result<(), CycleError> {
    Ok(())
}

#[cfg(feature = "rt")]
fn rt_set_scheduler(priority: i32) -> Result<(), CycleError> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // SAFETY: `param` outlives the call; pid 0 is the calling thread.
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(CycleError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
fn rt_set_scheduler(_priority: i32) -> Result<(), CycleError> {
    Ok(())
}

/// Perform the RT setup sequence. Call once before [`CycleRunner::run`].
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), CycleError> {
    rt_mlockall()?;
    prefault_stack();
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Report ─────────────────────────────────────────────────────────

/// Snapshot handed to the reporting side (serialized by the binary).
#[derive(Debug, Serialize)]
pub struct LineReport<'a> {
    pub service_name: &'a str,
    pub state: SystemState,
    pub status: &'a SystemStatus,
    pub conveyors: [&'a ConveyorData; CONVEYOR_COUNT],
    pub stats: &'a CycleStats,
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Owns the orchestrator, the process-wide status and the timing stats.
pub struct CycleRunner {
    config: ControlConfig,
    orchestrator: Orchestrator,
    status: SystemStatus,
    stats: CycleStats,
    inputs: OrchestratorInputs,
    cycle_time: Duration,
}

impl CycleRunner {
    /// Build a runner with the line commanded to start.
    pub fn new(config: ControlConfig) -> Self {
        let inputs = OrchestratorInputs {
            start_system: true,
            stop_system: false,
            reset: true,
            auto_mode: config.orchestrator.auto_mode,
            conveyor_currents: [None; CONVEYOR_COUNT],
        };
        Self {
            orchestrator: Orchestrator::new(&config),
            status: SystemStatus::new(),
            stats: CycleStats::new(),
            inputs,
            cycle_time: config.cycle.cycle_time(),
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    #[inline]
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    #[inline]
    pub fn status(&self) -> &SystemStatus {
        &self.status
    }

    #[inline]
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    #[inline]
    pub fn inputs(&self) -> &OrchestratorInputs {
        &self.inputs
    }

    /// Operator inputs applied from the next cycle on.
    #[inline]
    pub fn inputs_mut(&mut self) -> &mut OrchestratorInputs {
        &mut self.inputs
    }

    #[inline]
    pub fn cycle_time(&self) -> Duration {
        self.cycle_time
    }

    /// Execute one control pass with the current inputs.
    pub fn run_cycle(&mut self) -> [ConveyorOutputs; CONVEYOR_COUNT] {
        let outputs = self
            .orchestrator
            .advance(&self.inputs, &mut self.status, self.cycle_time);

        let interval = self.config.cycle.log_interval;
        if interval != 0 && self.status.cycle_count % interval == 0 {
            info!(
                cycle = self.status.cycle_count,
                state = ?self.orchestrator.state(),
                message = self.status.status_message.as_str(),
                speed_1 = outputs[0].actual_speed,
                speed_2 = outputs[1].actual_speed,
                "line status"
            );
        }
        outputs
    }

    /// Run paced cycles until `max_cycles` have executed (0 = unbounded) or
    /// `running` clears. Returns the number of cycles executed.
    pub fn run(&mut self, max_cycles: u64, running: &AtomicBool) -> Result<u64, CycleError> {
        info!(
            cycle_time_ms = self.cycle_time.as_millis() as u64,
            max_cycles, "entering cycle loop"
        );

        #[cfg(feature = "rt")]
        {
            self.run_rt_loop(max_cycles, running)
        }

        #[cfg(not(feature = "rt"))]
        {
            self.run_sim_loop(max_cycles, running)
        }
    }

    #[cfg(not(feature = "rt"))]
    fn run_sim_loop(&mut self, max_cycles: u64, running: &AtomicBool) -> Result<u64, CycleError> {
        use std::time::Instant;

        let mut executed = 0u64;
        while running.load(Ordering::SeqCst) && (max_cycles == 0 || executed < max_cycles) {
            let cycle_start = Instant::now();
            self.run_cycle();
            let elapsed = cycle_start.elapsed();
            executed += 1;

            let duration_ns = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
            if self.record(duration_ns, 0) {
                warn!(
                    actual_ns = duration_ns,
                    budget_ns = self.budget_ns(),
                    "cycle overrun"
                );
            }

            if let Some(remaining) = self.cycle_time.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
        Ok(executed)
    }

    #[cfg(feature = "rt")]
    fn run_rt_loop(&mut self, max_cycles: u64, running: &AtomicBool) -> Result<u64, CycleError> {
        use nix::time::{ClockId, ClockNanosleepFlags, clock_gettime, clock_nanosleep};

        let clock = ClockId::CLOCK_MONOTONIC;
        let now = || clock_gettime(clock).map_err(|e| CycleError::RtSetup(format!("clock_gettime: {e}")));
        let budget_ns = self.budget_ns();
        let mut wake = now()?;
        let mut executed = 0u64;

        while running.load(Ordering::SeqCst) && (max_cycles == 0 || executed < max_cycles) {
            let next_wake = timespec_add_ns(wake, budget_ns);

            let cycle_start = now()?;
            let latency_ns = timespec_diff_ns(&cycle_start, &wake).max(0);
            self.run_cycle();
            let cycle_end = now()?;
            executed += 1;

            let duration_ns = timespec_diff_ns(&cycle_end, &cycle_start);
            if self.record(duration_ns, latency_ns) {
                return Err(CycleError::CycleOverrun {
                    actual_ns: duration_ns,
                    budget_ns,
                });
            }

            let _ = clock_nanosleep(clock, ClockNanosleepFlags::TIMER_ABSTIME, &next_wake);
            wake = next_wake;
        }
        Ok(executed)
    }

    /// Command the line to stop and run unpaced cycles until the sequence is
    /// back in `Ready` with both conveyors at rest, at most `max_cycles`.
    pub fn drain(&mut self, max_cycles: u64) -> u64 {
        self.inputs.start_system = false;
        self.inputs.stop_system = true;

        let mut executed = 0u64;
        while executed < max_cycles {
            self.run_cycle();
            executed += 1;
            if self.orchestrator.state() == SystemState::Ready
                && self.orchestrator.conveyors_at_rest()
            {
                break;
            }
        }
        debug!(cycles = executed, "line drained");
        executed
    }

    pub fn report(&self) -> LineReport<'_> {
        let conveyors = self.orchestrator.conveyors();
        LineReport {
            service_name: &self.config.shared.service_name,
            state: self.orchestrator.state(),
            status: &self.status,
            conveyors: [conveyors[0].data(), conveyors[1].data()],
            stats: &self.stats,
        }
    }

    fn budget_ns(&self) -> i64 {
        i64::try_from(self.cycle_time.as_nanos()).unwrap_or(i64::MAX)
    }

    /// Record timing; returns `true` on overrun.
    fn record(&mut self, duration_ns: i64, latency_ns: i64) -> bool {
        self.stats.record(duration_ns, latency_ns);
        let overrun = duration_ns > self.budget_ns();
        if overrun {
            self.stats.overruns += 1;
        }
        overrun
    }
}

// ─── Time Helpers ───────────────────────────────────────────────────

#[cfg(feature = "rt")]
fn timespec_add_ns(ts: nix::sys::time::TimeSpec, ns: i64) -> nix::sys::time::TimeSpec {
    use nix::sys::time::TimeSpec;
    let mut secs = ts.tv_sec();
    let mut nanos = ts.tv_nsec() + ns;
    while nanos >= 1_000_000_000 {
        secs += 1;
        nanos -= 1_000_000_000;
    }
    TimeSpec::new(secs, nanos)
}

/// `a - b` in nanoseconds.
#[cfg(feature = "rt")]
fn timespec_diff_ns(a: &nix::sys::time::TimeSpec, b: &nix::sys::time::TimeSpec) -> i64 {
    (a.tv_sec() - b.tv_sec()) * 1_000_000_000 + (a.tv_nsec() - b.tv_nsec())
}

// ─── Tests ──────────────────────────────────────────────────────────
