//! # Conveyor Control Unit
//!
//! Cyclic control of a two-conveyor line. Loads an optional TOML
//! configuration, performs RT setup, runs the cycle loop until the cycle
//! limit or Ctrl-C, then drains the line through its stop sequence.

use clap::Parser;
use conveyor_common::config::{ConfigError, ControlConfig, LogLevel};
use conveyor_control_unit::cycle::{CycleRunner, rt_setup};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// Upper bound on cycles spent stopping the line on shutdown.
const DRAIN_CYCLES_MAX: u64 = 1_000;

/// Conveyor Control Unit — cyclic two-conveyor line control
#[derive(Parser, Debug)]
#[command(name = "conveyor_control_unit")]
#[command(version)]
#[command(about = "Cyclic control engine for a two-conveyor line")]
struct Args {
    /// Path to the TOML configuration. Built-in defaults when omitted.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after N cycles (0 = run until Ctrl-C).
    #[arg(long, default_value_t = 0)]
    cycles: u64,

    /// Override `cycle.cycle_time_ms`.
    #[arg(long, value_name = "MS")]
    cycle_time_ms: Option<u64>,

    /// Disable the periodic auto-mode toggle.
    #[arg(long)]
    no_auto: bool,

    /// CPU core to pin the cycle thread to (`rt` feature only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (`rt` feature only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,

    /// Print the final line report as JSON on exit.
    #[arg(long)]
    report: bool,
}

fn main() {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("FATAL: {e}");
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!(
        "Conveyor Control Unit v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("Conveyor Control Unit shutdown complete");
}

fn run(args: &Args, config: ControlConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!(
        "Config OK: service={}, cycle_time={}ms, auto_mode={}",
        config.shared.service_name, config.cycle.cycle_time_ms, config.orchestrator.auto_mode,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let mut runner = CycleRunner::new(config);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    let executed = runner.run(args.cycles, &running)?;
    info!(
        cycles = executed,
        overruns = runner.stats().overruns,
        avg_cycle_ns = runner.stats().avg_cycle_ns(),
        "cycle loop finished"
    );

    let drained = runner.drain(DRAIN_CYCLES_MAX);
    info!(cycles = drained, "line stopped");

    if args.report {
        println!("{}", serde_json::to_string_pretty(&runner.report())?);
    }

    Ok(())
}

/// Load the file (if any), apply CLI overrides and validate.
fn load_config(args: &Args) -> Result<ControlConfig, ConfigError> {
    let mut config = match args.config {
        Some(ref path) => ControlConfig::load_validated(path)?,
        None => ControlConfig::default(),
    };
    if let Some(ms) = args.cycle_time_ms {
        config.cycle.cycle_time_ms = ms;
    }
    if args.no_auto {
        config.orchestrator.auto_mode = false;
    }
    config.validate()?;
    Ok(config)
}

/// Setup tracing subscriber from CLI flags and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::from(configured)
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .init();
    }
}
