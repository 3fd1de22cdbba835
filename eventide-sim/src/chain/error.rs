//! Errors raised while building or running a workload.

use eventide_core::SimulationError;
use thiserror::Error;

/// Workload construction and execution errors.
#[derive(Debug, Error)]
pub enum WorkloadError {
    /// Hold range bounds are unusable
    #[error("Invalid hold range: [{min}, {max})")]
    InvalidHoldRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Kernel rejected an operation
    #[error("Simulation error: {0}")]
    Simulation(#[from] SimulationError),
}
