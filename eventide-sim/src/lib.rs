//! Eventide Simulation Workloads - resource contention models for the kernel.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! This crate builds concrete workloads on top of `eventide-core`. The
//! chain workload streams generated data items through a sequence of
//! capacity-limited resources; each stage is requested only after the
//! previous one has been fully released.
//!
//! # Example
//!
//! ```rust
//! use eventide_sim::{ChainConfig, run_chain};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let (report, chain) = run_chain(42, &ChainConfig::default())?;
//! assert!(report.success);
//! assert_eq!(chain.final_values().len(), 5);
//! # Ok(())
//! # }
//! ```

pub mod chain;

pub use chain::{
    ChainConfig, ChainHandles, ChainReport, ChainWorkload, DataItem, HoldRange, Stage,
    StageRecord, WorkloadError, run_chain, run_chain_with,
};
