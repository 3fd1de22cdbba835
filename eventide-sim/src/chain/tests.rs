//! Tests for the chain workload.

use eventide_core::kernel::{Environment, Outcome};
use eventide_core::{SimulationConfig, SimulationError};

use super::*;

const ITEMS: [&str; 5] = ["item-0", "item-1", "item-2", "item-3", "item-4"];

#[test]
fn test_default_chain_completes_every_item() {
    let (report, chain) = run_chain(42, &ChainConfig::default()).unwrap();

    assert!(report.success);
    // generator + 5 stage-A + 5 stage-B processes
    assert_eq!(report.outcomes.len(), 11);
    assert!(report.outcomes.iter().all(|outcome| outcome.is_completed()));

    let values = chain.final_values();
    assert_eq!(values.len(), 5);
    assert!(values.values().all(|value| *value == 2));
}

#[test]
fn test_items_spawn_at_unit_intervals() {
    let (report, _) = run_chain(7, &ChainConfig::default()).unwrap();

    let spawn_times: Vec<f64> = report
        .trace
        .iter()
        .filter_map(|entry| match &entry.kind {
            eventide_core::kernel::TraceKind::Spawned { name } if name.ends_with("/A") => {
                Some(entry.time.as_f64())
            }
            _ => None,
        })
        .collect();

    assert_eq!(spawn_times, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_stage_a_in_arrival_order_and_stage_b_follows_a() {
    for seed in [1, 2, 3, 42, 1234] {
        let (_, chain) = run_chain(seed, &ChainConfig::default()).unwrap();

        assert_eq!(chain.entry_order("A"), ITEMS.to_vec(), "seed {seed}");
        assert_eq!(chain.exit_order("A"), ITEMS.to_vec(), "seed {seed}");
        assert_eq!(chain.entry_order("B"), chain.exit_order("A"), "seed {seed}");
    }
}

#[test]
fn test_stage_b_never_overlaps_stage_a_of_same_item() {
    let (_, chain) = run_chain(99, &ChainConfig::default()).unwrap();

    for item in ITEMS {
        let a = chain
            .records()
            .iter()
            .find(|record| record.item == item && record.stage == "A")
            .unwrap();
        let b = chain
            .records()
            .iter()
            .find(|record| record.item == item && record.stage == "B")
            .unwrap();
        assert!(b.entered.unwrap() >= a.exited.unwrap());
        assert_eq!(a.value, 1);
        assert_eq!(b.value, 2);
    }
}

#[test]
fn test_hold_durations_stay_in_range() {
    let config = ChainConfig::default();
    let (_, chain) = run_chain(5, &config).unwrap();

    for record in chain.records() {
        let held = record.exited.unwrap().as_f64() - record.entered.unwrap().as_f64();
        let range = if record.stage == "A" {
            config.hold_a
        } else {
            config.hold_b
        };
        assert!(held >= range.min() - 1e-9 && held < range.max() + 1e-9);
    }
}

#[test]
fn test_same_seed_same_trace() {
    let (first, _) = run_chain(2024, &ChainConfig::default()).unwrap();
    let (second, _) = run_chain(2024, &ChainConfig::default()).unwrap();

    assert_eq!(first.trace, second.trace);
    assert_eq!(first.final_time, second.final_time);
}

#[test]
fn test_wider_resources_allow_overlap() {
    let config = ChainConfig {
        items: 8,
        capacity_a: 3,
        capacity_b: 3,
        ..Default::default()
    };
    let (report, chain) = run_chain(11, &config).unwrap();

    assert!(report.success);
    assert_eq!(chain.final_values().len(), 8);
    assert!(report.resources[0].usage().peak_holders > 1);
    assert!(report.resources[0].usage().peak_holders <= 3);
}

#[test]
fn test_zero_items() {
    let config = ChainConfig {
        items: 0,
        ..Default::default()
    };
    let (report, chain) = run_chain(1, &config).unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert!(chain.records().is_empty());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    let config = ChainConfig {
        capacity_b: 0,
        ..Default::default()
    };
    let result = ChainWorkload::install(&mut env, &config);
    assert!(matches!(
        result,
        Err(WorkloadError::Simulation(SimulationError::InvalidCapacity { .. }))
    ));

    let config = ChainConfig {
        spawn_interval: -1.0,
        ..Default::default()
    };
    let result = run_chain(1, &config);
    assert!(matches!(
        result,
        Err(WorkloadError::Simulation(SimulationError::InvalidDuration { .. }))
    ));
}

#[test]
fn test_horizon_leaves_items_in_flight() {
    let config = ChainConfig::default();
    let (report, _) = run_chain_with(SimulationConfig::seeded(3).with_horizon(2.5), &config).unwrap();

    assert_eq!(report.final_time.as_f64(), 2.5);
    assert!(
        report
            .outcomes
            .iter()
            .any(|outcome| matches!(outcome.outcome, Outcome::Unfinished { .. }))
    );
}

#[test]
fn test_install_reports_handles() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    let handles = ChainWorkload::install(&mut env, &ChainConfig::default()).unwrap();

    assert_eq!(env.resource(handles.resource_a).unwrap().name(), "A");
    assert_eq!(env.resource(handles.resource_b).unwrap().name(), "B");
    assert_eq!(handles.generator.name(), "generator");
}

#[test]
fn test_long_run_past_trace_limit_is_flagged() {
    let config = ChainConfig {
        items: 1_000,
        ..Default::default()
    };

    let (report, chain) = run_chain(42, &config).unwrap();
    assert!(report.success);
    assert!(report.trace_dropped > 0);
    assert!(!chain.is_complete());
    assert!(chain.final_values().len() < 1_000);
    assert!(report.summary().contains("trace limit reached"));

    let (report, chain) =
        run_chain_with(SimulationConfig::seeded(42).with_trace_limit(100_000), &config).unwrap();
    assert_eq!(report.trace_dropped, 0);
    assert!(chain.is_complete());
    assert_eq!(chain.final_values().len(), 1_000);
    assert!(chain.final_values().values().all(|value| *value == 2));
}
