//! Error types for the simulation kernel.

use thiserror::Error;

use super::process::ProcessId;
use super::resource::ResourceId;

/// Errors that can occur during simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Time value is invalid or lies before the current clock
    #[error("Invalid simulation time: {reason}")]
    InvalidTime {
        /// Why the time was rejected
        reason: String,
    },

    /// Delay is negative or not finite
    #[error("Invalid duration: {duration}")]
    InvalidDuration {
        /// The rejected delay
        duration: f64,
    },

    /// Resource constructed with zero capacity
    #[error("Invalid capacity for resource '{resource}': {capacity} (must be at least 1)")]
    InvalidCapacity {
        /// Name of the resource being created
        resource: String,
        /// The rejected capacity
        capacity: usize,
    },

    /// Process body returned an error
    #[error("Process {process} ('{name}') failed: {reason}")]
    ProcessFailure {
        /// Failing process
        process: ProcessId,
        /// Name given at spawn
        name: String,
        /// Error message produced by the process body
        reason: String,
    },

    /// Resource id does not belong to this environment
    #[error("Unknown resource: {resource}")]
    UnknownResource {
        /// The id that was not found
        resource: ResourceId,
    },

    /// Process released a slot it does not hold
    #[error("Process {process} does not hold a slot of resource '{resource}'")]
    NotHolder {
        /// Name of the resource
        resource: String,
        /// Process that attempted the release
        process: ProcessId,
    },

    /// Deterministic seed required but not provided
    #[error("No deterministic seed provided")]
    NoDeterministicSeed,

    /// Too many invariant violations occurred
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },

    /// Trace export failed to write
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Trace export failed to serialize
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
