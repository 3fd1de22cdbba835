//! Integration tests for Eventide
//!
//! These tests drive the kernel and the chain workload through their public
//! APIs only: scheduling scenarios, trace export and randomized properties.

#[path = "integration/processes.rs"]
mod processes;

#[path = "integration/kernel_scenarios.rs"]
mod kernel_scenarios;

#[path = "integration/chain_workload.rs"]
mod chain_workload;

#[path = "integration/trace_export.rs"]
mod trace_export;

#[path = "integration/kernel_properties.rs"]
mod kernel_properties;
