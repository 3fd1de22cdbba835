//! Two-stage resource chain workload.
//!
//! A generator emits data items at a fixed interval. Each item acquires
//! resource A, bumps its counter, holds A for a random time and releases
//! it; only then is a stage-B process spawned that does the same with
//! resource B.

mod data_item;
mod error;
mod report;
mod stages;

use std::collections::VecDeque;

use eventide_core::kernel::{Delay, Environment, ProcessHandle, ResourceId};
use eventide_core::{SimulationConfig, SimulationReport};
use tracing::{info, warn};

pub use data_item::DataItem;
pub use error::WorkloadError;
pub use report::{ChainReport, StageRecord};
pub use stages::{
    ENTER_LABEL, EXIT_LABEL, Generator, HoldRange, Stage, StageProcess,
    parse_stage_process_name, stage_process_name,
};

/// Parameters of the chain workload.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Number of generated items
    pub items: u32,
    /// Time between two generated items
    pub spawn_interval: f64,
    /// Capacity of resource A
    pub capacity_a: usize,
    /// Capacity of resource B
    pub capacity_b: usize,
    /// Hold duration range at resource A
    pub hold_a: HoldRange,
    /// Hold duration range at resource B
    pub hold_b: HoldRange,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            items: 5,
            spawn_interval: 1.0,
            capacity_a: 1,
            capacity_b: 1,
            hold_a: HoldRange { min: 1.0, max: 5.0 },
            hold_b: HoldRange { min: 2.0, max: 6.0 },
        }
    }
}

/// Ids of what `ChainWorkload::install` created.
#[derive(Debug, Clone)]
pub struct ChainHandles {
    /// First-stage resource
    pub resource_a: ResourceId,
    /// Second-stage resource
    pub resource_b: ResourceId,
    /// Item generator process
    pub generator: ProcessHandle,
}

/// Installs the chain workload into an environment.
pub struct ChainWorkload;

impl ChainWorkload {
    /// Creates resources A and B and spawns the generator.
    ///
    /// # Errors
    ///
    /// - `WorkloadError::Simulation` - Zero capacity or negative spawn interval
    pub fn install(
        env: &mut Environment,
        config: &ChainConfig,
    ) -> Result<ChainHandles, WorkloadError> {
        let interval = Delay::new(config.spawn_interval)?;
        let resource_a = env.add_resource("A", config.capacity_a)?;
        let resource_b = env.add_resource("B", config.capacity_b)?;

        let stages = VecDeque::from([
            Stage {
                label: "A".to_string(),
                resource: resource_a,
                hold: config.hold_a,
            },
            Stage {
                label: "B".to_string(),
                resource: resource_b,
                hold: config.hold_b,
            },
        ]);

        let generator = env.spawn(
            "generator",
            Generator::new(config.items, interval, stages),
        )?;

        info!(
            items = config.items,
            capacity_a = config.capacity_a,
            capacity_b = config.capacity_b,
            "Installed chain workload"
        );

        Ok(ChainHandles {
            resource_a,
            resource_b,
            generator,
        })
    }
}

/// Builds a seeded environment, runs the chain workload and analyzes it.
///
/// The analysis comes from the trace; check [`ChainReport::is_complete`]
/// for long runs, or raise the trace limit with [`run_chain_with`].
///
/// # Errors
///
/// - `WorkloadError::Simulation` - Invalid configuration or aborted run
pub fn run_chain(
    seed: u64,
    config: &ChainConfig,
) -> Result<(SimulationReport, ChainReport), WorkloadError> {
    run_chain_with(SimulationConfig::seeded(seed), config)
}

/// Like [`run_chain`] with full kernel configuration.
///
/// # Errors
///
/// - `WorkloadError::Simulation` - Invalid configuration or aborted run
pub fn run_chain_with(
    simulation: SimulationConfig,
    config: &ChainConfig,
) -> Result<(SimulationReport, ChainReport), WorkloadError> {
    let mut env = Environment::new(simulation)?;
    ChainWorkload::install(&mut env, config)?;
    let report = env.run()?;
    let chain = ChainReport::from_report(&report);
    if !chain.is_complete() {
        warn!(
            dropped = report.trace_dropped,
            kept = report.trace.len(),
            "Trace limit reached, chain report is incomplete"
        );
    }
    Ok((report, chain))
}

#[cfg(test)]
mod tests;
