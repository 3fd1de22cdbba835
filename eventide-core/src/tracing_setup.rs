//! Logging for simulation runs
//!
//! Console output goes to stderr at the chosen level. Each run also writes a
//! trace-level log named after its seed, so runs with different seeds keep
//! separate logs and replaying a seed replaces its own log.
//!
//! Wall-clock timestamps are left out of both outputs. The environment
//! enters a `sim` span around every dispatched event, carrying the simulated
//! time as `t`, so log lines line up with the action trace.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

/// Directory used when no logs directory is given.
pub const DEFAULT_LOGS_DIR: &str = "logs";

/// Where and how much one simulation run logs.
#[derive(Debug, Clone)]
pub struct RunLogging {
    /// Level for console output; `RUST_LOG` overrides it when set
    pub console_level: Level,
    /// Directory receiving the run log
    pub logs_dir: PathBuf,
    /// Seed of the run, used to name the log
    pub seed: u64,
}

impl RunLogging {
    /// Logs for a run with `seed` into `./logs`.
    pub fn new(console_level: Level, seed: u64) -> Self {
        Self {
            console_level,
            logs_dir: PathBuf::from(DEFAULT_LOGS_DIR),
            seed,
        }
    }

    /// Uses `logs_dir` instead of `./logs`.
    pub fn with_logs_dir(mut self, logs_dir: impl Into<PathBuf>) -> Self {
        self.logs_dir = logs_dir.into();
        self
    }

    /// Path of the run log, e.g. `logs/eventide-seed-42.log`.
    pub fn log_path(&self) -> PathBuf {
        run_log_path(&self.logs_dir, self.seed)
    }

    /// Installs the global subscriber and returns the run log path.
    ///
    /// # Errors
    ///
    /// - `Box<dyn std::error::Error>` - Logs directory or log file cannot be
    ///   created, or a global subscriber is already installed
    pub fn init(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        create_dir_all(&self.logs_dir)?;
        let log_path = self.log_path();
        let log_file = File::create(&log_path)?;

        let console_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.console_level.to_string()));
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .compact()
            .with_filter(console_filter);

        let file_layer = fmt::layer()
            .with_writer(log_file)
            .without_time()
            .with_ansi(false)
            .with_filter(EnvFilter::new("trace"));

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        tracing::info!(
            seed = self.seed,
            console = %self.console_level,
            log = %log_path.display(),
            "Logging initialized"
        );
        Ok(log_path)
    }
}

/// Log file of the run with `seed` inside `logs_dir`.
pub fn run_log_path(logs_dir: &Path, seed: u64) -> PathBuf {
    logs_dir.join(format!("eventide-seed-{seed}.log"))
}

/// Console verbosity selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Aborted runs and I/O problems
    Error,
    /// Also process failures and invariant violations
    Warn,
    /// Also run start, finish and workload setup
    Info,
    /// Also every resumption, grant and release
    Debug,
    /// Everything
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use eventide_core::tracing_setup::CliLogLevel;
    ///
    /// assert_eq!(CliLogLevel::Debug.as_tracing_level(), tracing::Level::DEBUG);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::SimulationConfig;
    use crate::kernel::{Environment, Step, Wakeup, from_fn};

    #[test]
    fn test_run_log_named_after_seed() {
        let logging = RunLogging::new(Level::INFO, 42);
        assert_eq!(logging.log_path(), PathBuf::from("logs/eventide-seed-42.log"));

        let logging = logging.with_logs_dir("/tmp/runs");
        assert_eq!(
            logging.log_path(),
            PathBuf::from("/tmp/runs/eventide-seed-42.log")
        );
    }

    #[test]
    fn test_cli_levels_map_to_tracing_levels() {
        assert_eq!(CliLogLevel::Error.as_tracing_level(), Level::ERROR);
        assert_eq!(CliLogLevel::Warn.as_tracing_level(), Level::WARN);
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
    }

    // Only test in this crate that installs the global subscriber.
    #[test]
    fn test_run_log_carries_simulated_time() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let logging = RunLogging::new(Level::WARN, 7).with_logs_dir(temp_dir.path());

        let log_path = logging.init().unwrap();
        assert_eq!(log_path, temp_dir.path().join("eventide-seed-7.log"));

        let mut env = Environment::new(SimulationConfig::seeded(7)).unwrap();
        env.spawn(
            "sleeper",
            from_fn(|_ctx, wakeup| match wakeup {
                Wakeup::Start => Ok(Step::timeout(2.5)?),
                _ => Ok(Step::Done),
            }),
        )
        .unwrap();
        env.run().unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("sim{t=2.500}"), "{content}");
        assert!(content.contains("Resuming process"));

        assert!(logging.init().is_err());
    }
}
