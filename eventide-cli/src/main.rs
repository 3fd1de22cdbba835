//! Eventide CLI - Command-line interface
//!
//! Runs the chained resource workload from the command line.

mod commands;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use eventide_core::tracing_setup::{CliLogLevel, DEFAULT_LOGS_DIR, RunLogging};

#[derive(Parser)]
#[command(name = "eventide")]
#[command(about = "Discrete-event simulation of chained resource contention")]
#[command(version)]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info, global = true)]
    log_level: CliLogLevel,

    /// Directory for the per-seed run log
    #[arg(long, global = true, default_value = DEFAULT_LOGS_DIR)]
    logs_dir: PathBuf,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    RunLogging::new(cli.log_level.as_tracing_level(), cli.command.seed())
        .with_logs_dir(&cli.logs_dir)
        .init()
        .map_err(|error| anyhow!("failed to initialize tracing: {error}"))?;

    commands::handle_command(cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Commands;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::try_parse_from(["eventide", "run"]).unwrap();

        assert_eq!(cli.log_level, CliLogLevel::Info);
        assert_eq!(cli.logs_dir, PathBuf::from("logs"));
        assert_eq!(cli.command.seed(), 42);
        let Commands::Run { trace_limit, items, .. } = cli.command;
        assert_eq!(trace_limit, eventide_core::config::DEFAULT_TRACE_LIMIT);
        assert_eq!(items, 5);
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::try_parse_from([
            "eventide",
            "run",
            "--seed",
            "9",
            "--trace-limit",
            "50000",
            "--hold-a",
            "2",
            "3",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, CliLogLevel::Debug);
        assert_eq!(cli.command.seed(), 9);
        let Commands::Run {
            trace_limit, hold_a, ..
        } = cli.command;
        assert_eq!(trace_limit, 50_000);
        assert_eq!(hold_a, vec![2.0, 3.0]);
    }

    #[test]
    fn test_hold_range_needs_two_values() {
        assert!(Cli::try_parse_from(["eventide", "run", "--hold-b", "2"]).is_err());
    }
}
