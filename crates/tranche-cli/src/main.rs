//! # tranche CLI entry point
//!
//! Parses command-line arguments, installs logging, and dispatches to
//! subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tranche_cli::replay::{ReplayArgs, run_replay};
use tranche_cli::schedule::{ScheduleArgs, run_schedule};
use tranche_types::constants;

/// Tranche — vesting escrow settlement engine.
///
/// Prints vesting schedules and replays scripted escrow sessions.
#[derive(Parser, Debug)]
#[command(name = "tranche", version, about, long_about = None)]
struct Cli {
    /// Log filter (e.g. `info`, `debug`, `tranche_engine=trace`). Overrides
    /// `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the per-interval vesting table for escrow terms.
    Schedule(ScheduleArgs),

    /// Replay a scripted escrow session against in-memory custody.
    Replay(ReplayArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // Logs go to stderr so stdout stays machine-readable.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.json {
        builder.json().init();
    } else {
        builder.init();
    }

    tracing::debug!(
        engine = constants::ENGINE_NAME,
        version = constants::VERSION,
        "CLI starting"
    );

    let result = match cli.command {
        Commands::Schedule(args) => run_schedule(&args),
        Commands::Replay(args) => run_replay(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
