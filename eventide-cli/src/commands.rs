//! CLI command implementations

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use eventide_core::SimulationConfig;
use eventide_core::config::DEFAULT_TRACE_LIMIT;
use eventide_core::kernel::write_json_lines;
use eventide_sim::{ChainConfig, ChainReport, HoldRange, run_chain_with};
use tracing::{info, warn};

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run the two-stage resource chain
    Run {
        /// Number of generated items
        #[arg(short, long, default_value = "5")]
        items: u32,
        /// Seed for the random hold durations
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Time between generated items
        #[arg(long, default_value = "1.0")]
        interval: f64,
        /// Capacity of resource A
        #[arg(long, default_value = "1")]
        capacity_a: usize,
        /// Capacity of resource B
        #[arg(long, default_value = "1")]
        capacity_b: usize,
        /// Hold range at resource A, as MIN MAX
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values = ["1.0", "5.0"])]
        hold_a: Vec<f64>,
        /// Hold range at resource B, as MIN MAX
        #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], default_values = ["2.0", "6.0"])]
        hold_b: Vec<f64>,
        /// Stop at this simulation time
        #[arg(long)]
        until: Option<f64>,
        /// Maximum number of trace entries kept; the chain report needs all of them
        #[arg(long, default_value_t = DEFAULT_TRACE_LIMIT)]
        trace_limit: usize,
        /// Write the action trace as JSON Lines
        #[arg(long)]
        trace_out: Option<PathBuf>,
        /// Write the per-stage chain report as JSON
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
}

impl Commands {
    /// Seed of the run, also used to name its log.
    pub fn seed(&self) -> u64 {
        match self {
            Commands::Run { seed, .. } => *seed,
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            items,
            seed,
            interval,
            capacity_a,
            capacity_b,
            hold_a,
            hold_b,
            until,
            trace_limit,
            trace_out,
            report_json,
        } => {
            let chain = ChainConfig {
                items,
                spawn_interval: interval,
                capacity_a,
                capacity_b,
                hold_a: parse_hold_range(&hold_a)?,
                hold_b: parse_hold_range(&hold_b)?,
            };
            let mut simulation = SimulationConfig::seeded(seed).with_trace_limit(trace_limit);
            simulation.horizon = until;

            run_chain_command(simulation, &chain, trace_out, report_json)
        }
    }
}

fn parse_hold_range(bounds: &[f64]) -> anyhow::Result<HoldRange> {
    let [min, max] = bounds else {
        anyhow::bail!("hold range needs exactly two values, got {}", bounds.len());
    };
    Ok(HoldRange::new(*min, *max)?)
}

/// Warning printed when the trace limit cut the chain report short.
fn truncation_warning(chain: &ChainReport, trace_limit: usize) -> Option<String> {
    if chain.is_complete() {
        return None;
    }
    Some(format!(
        "trace limit {trace_limit} reached, {} entries dropped: the chain report and \
         trace file are incomplete, rerun with a larger --trace-limit",
        chain.trace_dropped()
    ))
}

/// Run the chain workload and print its report
///
/// # Errors
/// - `WorkloadError` - Invalid configuration or aborted run
/// - I/O errors writing the trace or report files
pub fn run_chain_command(
    simulation: SimulationConfig,
    chain: &ChainConfig,
    trace_out: Option<PathBuf>,
    report_json: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!(
        "Running chain with {} items (seed {})",
        chain.items,
        simulation.deterministic_seed.unwrap_or_default()
    );
    let trace_limit = simulation.trace_limit;

    let (report, chain_report) = run_chain_with(simulation, chain)?;

    println!("{}", report.summary());
    println!("{}", chain_report.summary());

    for failure in report.failures().filter_map(|outcome| outcome.as_failure()) {
        eprintln!("{failure}");
    }

    let warning = truncation_warning(&chain_report, trace_limit);
    if let Some(warning) = &warning {
        warn!(dropped = chain_report.trace_dropped(), trace_limit, "Trace truncated");
        eprintln!("warning: {warning}");
    }

    if let Some(path) = trace_out {
        let file = File::create(&path)
            .with_context(|| format!("cannot create trace file {}", path.display()))?;
        write_json_lines(&report.trace, BufWriter::new(file))?;
        info!(path = %path.display(), entries = report.trace.len(), "Wrote trace");
        println!("Trace written to {}", path.display());
    }

    if let Some(path) = report_json {
        let file = File::create(&path)
            .with_context(|| format!("cannot create report file {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &chain_report)?;
        println!("Chain report written to {}", path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use eventide_sim::run_chain;

    use super::*;

    #[test]
    fn test_truncation_warning_only_for_cut_traces() {
        let (_, complete) = run_chain(1, &ChainConfig::default()).unwrap();
        assert!(truncation_warning(&complete, DEFAULT_TRACE_LIMIT).is_none());

        let simulation = SimulationConfig::seeded(1).with_trace_limit(20);
        let (_, cut) = run_chain_with(simulation, &ChainConfig::default()).unwrap();
        let warning = truncation_warning(&cut, 20).unwrap();
        assert!(warning.contains("trace limit 20 reached"));
        assert!(warning.contains("--trace-limit"));
    }

    #[test]
    fn test_run_writes_trace_and_report() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let report_path = temp_dir.path().join("chain.json");

        run_chain_command(
            SimulationConfig::seeded(3).with_trace_limit(30),
            &ChainConfig::default(),
            Some(trace_path.clone()),
            Some(report_path.clone()),
        )
        .unwrap();

        assert_eq!(fs::read_to_string(&trace_path).unwrap().lines().count(), 30);
        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
        assert_eq!(report["complete"], false);
        assert!(report["trace_dropped"].as_u64().unwrap() > 0);
    }
}
