//! Conveyor Common Library
//!
//! Shared definitions for the conveyor line control workspace: the state
//! enumerations used by every state machine, fault flags, configuration
//! loading and the status/data records published for reporting.
//!
//! # Module Structure
//!
//! - [`consts`] - Default timing constants and parameter bounds
//! - [`config`] - TOML configuration types and the [`config::ConfigLoader`] trait
//! - [`state`] - `MotorState` (shared by motor and conveyor) and `SystemState`
//! - [`fault`] - Motor fault sub-flags and fault causes
//! - [`status`] - Process-wide status and the conveyor data record
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod fault;
pub mod prelude;
pub mod state;
pub mod status;
