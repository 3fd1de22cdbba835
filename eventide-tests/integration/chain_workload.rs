//! End-to-end runs of the two-resource chain.

use eventide_core::kernel::TraceKind;
use eventide_core::{Environment, Outcome, SimulationConfig};
use eventide_sim::{ChainConfig, ChainReport, ChainWorkload, HoldRange, run_chain, run_chain_with};

#[test]
fn test_five_items_through_two_single_slot_resources() {
    let (report, chain) = run_chain(42, &ChainConfig::default()).unwrap();

    assert!(report.success, "{}", report.summary());
    let items: Vec<String> = (0..5).map(|id| format!("item-{id}")).collect();
    assert_eq!(chain.entry_order("A"), items);
    assert_eq!(chain.exit_order("A"), items);
    assert_eq!(chain.entry_order("B"), chain.exit_order("A"));

    for value in chain.final_values().values() {
        assert_eq!(*value, 2);
    }
    assert_eq!(report.resources[0].usage().grants, 5);
    assert_eq!(report.resources[1].usage().grants, 5);
    assert!(report.resources.iter().all(|resource| resource.in_use() == 0));
}

#[test]
fn test_stage_b_waits_for_stage_a_release() {
    let (report, _) = run_chain(8, &ChainConfig::default()).unwrap();

    // every B request comes after the A release of the same item
    let mut released_a = Vec::new();
    for entry in &report.trace {
        match &entry.kind {
            TraceKind::Released { resource } if resource.index() == 0 => {
                released_a.push(entry.time);
            }
            TraceKind::Requested { resource } if resource.index() == 1 => {
                assert!(!released_a.is_empty());
                assert!(entry.time >= *released_a.last().unwrap());
            }
            _ => {}
        }
    }
    assert_eq!(released_a.len(), 5);
}

#[test]
fn test_identical_seeds_replay_identically() {
    let config = ChainConfig {
        items: 20,
        capacity_a: 2,
        ..Default::default()
    };

    let (first, first_chain) = run_chain(77, &config).unwrap();
    let (second, second_chain) = run_chain(77, &config).unwrap();
    let (other, _) = run_chain(78, &config).unwrap();

    assert_eq!(first.trace, second.trace);
    assert_eq!(first_chain.records(), second_chain.records());
    assert_ne!(first.trace, other.trace);
}

#[test]
fn test_fixed_holds_give_exact_schedule() {
    let config = ChainConfig {
        items: 3,
        hold_a: HoldRange::new(2.0, 2.0).unwrap(),
        hold_b: HoldRange::new(3.0, 3.0).unwrap(),
        ..Default::default()
    };
    let (report, chain) = run_chain(1, &config).unwrap();

    let times = |stage: &str| -> Vec<(f64, f64)> {
        chain
            .records()
            .iter()
            .filter(|record| record.stage == stage)
            .map(|record| {
                (
                    record.entered.unwrap().as_f64(),
                    record.exited.unwrap().as_f64(),
                )
            })
            .collect()
    };

    assert_eq!(times("A"), vec![(0.0, 2.0), (2.0, 4.0), (4.0, 6.0)]);
    assert_eq!(times("B"), vec![(2.0, 5.0), (5.0, 8.0), (8.0, 11.0)]);
    assert_eq!(report.final_time.as_f64(), 11.0);
}

#[test]
fn test_horizon_then_resume_matches_full_run() {
    let config = ChainConfig::default();
    let (full, _) = run_chain(5, &config).unwrap();

    let mut env = Environment::new(SimulationConfig::seeded(5)).unwrap();
    ChainWorkload::install(&mut env, &config).unwrap();
    let partial = env.run_until(eventide_core::SimTime::new(4.0).unwrap()).unwrap();
    assert_eq!(partial.final_time.as_f64(), 4.0);
    assert!(
        partial
            .outcomes
            .iter()
            .any(|outcome| matches!(outcome.outcome, Outcome::Unfinished { .. }))
    );

    let resumed = env.run().unwrap();
    assert!(resumed.success);
    assert_eq!(resumed.trace, full.trace);
    assert_eq!(resumed.final_time, full.final_time);
}

#[test]
fn test_chain_report_rebuilt_from_exported_trace() {
    let config = ChainConfig {
        items: 4,
        ..Default::default()
    };
    let (report, chain) = run_chain_with(SimulationConfig::seeded(3), &config).unwrap();

    let rebuilt = ChainReport::from_trace(&report.trace);
    assert_eq!(rebuilt.records(), chain.records());
    assert_eq!(rebuilt.final_values().len(), 4);
}
