//! # CNC
//!
//! Loads `machine.toml` and a G-code program, attaches a machine driver and
//! hands control to the operator menu. Tick records go to stdout; logs and
//! the menu go to stderr.

use clap::Parser;
use cnc_common::config::{ConfigError, ConfigLoader, LogLevel};
use cnc_common::consts::DEFAULT_CONFIG_PATH;
use cnc_common::machine::config::MachineConfig;
use cnc_control::cycle::{TickWriter, rt_setup};
use cnc_control::operator::ConsoleOperator;
use cnc_control::{MachineSource, ProgramSource, Session};
use cnc_hal::drivers::builtin_registry;
use std::path::PathBuf;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// CNC trajectory planner and executor
#[derive(Parser, Debug)]
#[command(name = "cnc")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Executes G-code programs against a real or simulated machine")]
struct Args {
    /// G-code program to execute.
    program: PathBuf,

    /// Machine configuration TOML.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Machine driver name.
    #[arg(long, default_value = "simulation")]
    driver: String,

    /// CPU core to pin the tick loop to (rt builds only).
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority (rt builds only).
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();
    let config = MachineConfig::load(&args.config);
    setup_tracing(&args, config.as_ref().map_or(LogLevel::default(), |c| c.shared.log_level));

    info!("CNC v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("CNC shutdown complete");
}

fn run(
    args: &Args,
    config: Result<MachineConfig, ConfigError>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.map_err(|e| format!("{}: {e}", args.config.display()))?;
    config.validate()?;
    info!(
        "Config OK: A={} D={} feed_max={} tq={}",
        config.kinematics.acceleration,
        config.kinematics.deceleration,
        config.kinematics.feed_max,
        config.kinematics.tq,
    );

    rt_setup(args.cpu_core, args.rt_priority)?;

    let ticks = TickWriter::stdout(config.run.tick_format);
    let mut session = Session::new(
        config,
        ProgramSource::File(args.program.clone()),
        MachineSource::Registry {
            registry: builtin_registry(),
            driver: args.driver.clone(),
        },
        ConsoleOperator::stdio(),
    )
    .with_tick_output(ticks);

    session.run()?;
    Ok(())
}

/// Setup tracing subscriber on stderr.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        configured.as_tracing()
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
