//! Eventide Core - discrete-event simulation kernel
//!
//! This crate provides the building blocks for deterministic discrete-event
//! simulations: a time-ordered event queue, cooperative processes,
//! capacity-limited FIFO resources and the environment that drives them.

pub mod config;
pub mod kernel;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::SimulationConfig;
pub use kernel::{
    Context, Environment, Outcome, Process, ProcessHandle, ProcessId, ProcessOutcome, ResourceId,
    SimTime, SimulationError, SimulationReport, Step, Wakeup, from_fn,
};
