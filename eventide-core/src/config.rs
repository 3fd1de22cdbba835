//! Centralized configuration for the simulation kernel.
//!
//! All tunable kernel parameters are defined here to avoid
//! hard-coded values scattered throughout the codebase.

/// Default number of trace entries retained per run.
pub const DEFAULT_TRACE_LIMIT: usize = 10_000;

/// Simulation kernel configuration.
///
/// Controls seeding, the optional stop horizon, trace retention and
/// built-in invariant checking for an [`Environment`](crate::Environment).
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Deterministic seed for reproducible simulations
    pub deterministic_seed: Option<u64>,
    /// Simulation time at which `run()` stops, `None` runs until the queue drains
    pub horizon: Option<f64>,
    /// Maximum number of trace entries kept for the report
    pub trace_limit: usize,
    /// Install the built-in capacity and work-conserving invariants
    pub check_invariants: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            horizon: None,
            trace_limit: DEFAULT_TRACE_LIMIT,
            check_invariants: true,
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration seeded with `seed` and default settings otherwise.
    pub fn seeded(seed: u64) -> Self {
        Self {
            deterministic_seed: Some(seed),
            ..Default::default()
        }
    }

    /// Sets the stop horizon.
    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = Some(horizon);
        self
    }

    /// Sets the trace retention limit.
    pub fn with_trace_limit(mut self, trace_limit: usize) -> Self {
        self.trace_limit = trace_limit;
        self
    }
}
