//! # Conveyor Control Unit Library
//!
//! Scan-based control engine for a two-conveyor line. Every component
//! re-evaluates its whole logic once per control cycle: read inputs, advance
//! its state machine and timers, publish outputs.
//!
//! ## Components (leaves first)
//!
//! 1. [`edge`] — rising-edge detection of command levels
//! 2. [`timer`] — on-delay timer, the shared timing primitive
//! 3. [`motor`] — motor start/ramp/run/stop/fault sequencing with simulated feedback
//! 4. [`conveyor`] — conveyor start/stop/fault supervision and data record
//! 5. [`orchestrator`] — line sequence driving two conveyors, publishes status
//! 6. [`cycle`] — cycle pacing, statistics and optional RT setup
//!
//! ## Determinism
//!
//! One pass per component per cycle, no blocking, no allocation in the
//! cycle path. Outputs are the instance state right after this cycle's
//! transition and are consumed by callers on the next cycle.

pub mod conveyor;
pub mod cycle;
pub mod edge;
pub mod motor;
pub mod orchestrator;
pub mod timer;
