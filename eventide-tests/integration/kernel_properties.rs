//! Randomized properties of the kernel and the chain workload.

use std::collections::HashMap;

use eventide_core::kernel::{TraceEntry, TraceKind};
use eventide_core::{Environment, ResourceId, SimulationConfig};
use eventide_sim::{ChainConfig, run_chain};
use proptest::prelude::*;

use super::processes::FixedHold;

/// Largest number of simultaneous holders seen per resource, replayed from the trace.
fn peak_holders(trace: &[TraceEntry]) -> HashMap<ResourceId, usize> {
    let mut holding: HashMap<ResourceId, usize> = HashMap::new();
    let mut peak: HashMap<ResourceId, usize> = HashMap::new();
    for entry in trace {
        match entry.kind {
            TraceKind::Granted { resource } => {
                let count = holding.entry(resource).or_default();
                *count += 1;
                let max = peak.entry(resource).or_default();
                *max = (*max).max(*count);
            }
            TraceKind::Released { resource } => {
                if let Some(count) = holding.get_mut(&resource) {
                    *count -= 1;
                }
            }
            _ => {}
        }
    }
    peak
}

fn order_of(trace: &[TraceEntry], pick: impl Fn(&TraceKind) -> bool) -> Vec<u64> {
    trace
        .iter()
        .filter(|entry| pick(&entry.kind))
        .map(|entry| entry.process.as_u64())
        .collect()
}

proptest! {
    #[test]
    fn grants_follow_request_order(
        capacity in 1usize..4,
        jobs in prop::collection::vec((0.0f64..10.0, 0.0f64..5.0), 1..30),
    ) {
        let mut env = Environment::new(SimulationConfig::seeded(0)).unwrap();
        let resource = env.add_resource("shared", capacity).unwrap();
        for (index, (arrival, hold)) in jobs.iter().enumerate() {
            env.spawn(format!("job-{index}"), FixedHold::arriving_after(resource, *arrival, *hold))
                .unwrap();
        }

        let report = env.run().unwrap();

        prop_assert!(report.success);
        let requested = order_of(&report.trace, |kind| matches!(kind, TraceKind::Requested { .. }));
        let granted = order_of(&report.trace, |kind| matches!(kind, TraceKind::Granted { .. }));
        prop_assert_eq!(requested.len(), jobs.len());
        prop_assert_eq!(granted, requested);
    }

    #[test]
    fn holders_never_exceed_capacity(
        seed in any::<u64>(),
        items in 1u32..25,
        capacity_a in 1usize..4,
        capacity_b in 1usize..4,
    ) {
        let config = ChainConfig { items, capacity_a, capacity_b, ..Default::default() };
        let (report, _) = run_chain(seed, &config).unwrap();

        prop_assert!(report.success);
        prop_assert!(report.metrics.invariant_violations.is_empty());
        let peaks = peak_holders(&report.trace);
        for resource in &report.resources {
            let peak = peaks.get(&resource.id()).copied().unwrap_or(0);
            prop_assert!(peak <= resource.capacity());
            prop_assert_eq!(peak, resource.usage().peak_holders);
        }
    }

    #[test]
    fn clock_never_moves_backwards(seed in any::<u64>(), items in 0u32..25) {
        let config = ChainConfig { items, ..Default::default() };
        let (report, chain) = run_chain(seed, &config).unwrap();

        for pair in report.trace.windows(2) {
            prop_assert!(pair[0].time <= pair[1].time);
        }
        if let Some(last) = report.trace.last() {
            prop_assert_eq!(last.time, report.final_time);
        }
        prop_assert_eq!(chain.final_values().len(), items as usize);
    }

    #[test]
    fn replays_are_deterministic(seed in any::<u64>(), items in 1u32..15) {
        let config = ChainConfig { items, capacity_b: 2, ..Default::default() };
        let (first, _) = run_chain(seed, &config).unwrap();
        let (second, _) = run_chain(seed, &config).unwrap();

        prop_assert_eq!(first.trace, second.trace);
        prop_assert_eq!(first.final_time, second.final_time);
    }
}
