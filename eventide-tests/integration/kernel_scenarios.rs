//! Scheduling scenarios run through the public kernel API.

use eventide_core::kernel::{ProcessState, TraceEntry, TraceKind};
use eventide_core::{
    Environment, Outcome, ProcessId, SimulationConfig, SimulationError, Step, Wakeup, from_fn,
};

use super::processes::FixedHold;

fn grant_times(trace: &[TraceEntry]) -> Vec<(ProcessId, f64)> {
    trace
        .iter()
        .filter(|entry| matches!(entry.kind, TraceKind::Granted { .. }))
        .map(|entry| (entry.process, entry.time.as_f64()))
        .collect()
}

#[test]
fn test_second_requester_waits_for_release() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    let resource = env.add_resource("machine", 1).unwrap();
    let a = env.spawn("a", FixedHold::new(resource, 5.0)).unwrap();
    let b = env.spawn("b", FixedHold::new(resource, 1.0)).unwrap();

    let report = env.run().unwrap();

    assert!(report.success);
    assert_eq!(
        grant_times(&report.trace),
        vec![(a.id(), 0.0), (b.id(), 5.0)]
    );
    assert_eq!(report.final_time.as_f64(), 6.0);
}

#[test]
fn test_waiters_are_granted_in_request_order() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    let resource = env.add_resource("machine", 1).unwrap();
    let holder = env.spawn("holder", FixedHold::new(resource, 10.0)).unwrap();
    // p3 is spawned first but asks last
    let p3 = env
        .spawn("p3", FixedHold::arriving_after(resource, 3.0, 1.0))
        .unwrap();
    let p1 = env
        .spawn("p1", FixedHold::arriving_after(resource, 1.0, 1.0))
        .unwrap();
    let p2 = env
        .spawn("p2", FixedHold::arriving_after(resource, 2.0, 1.0))
        .unwrap();

    let report = env.run().unwrap();

    assert_eq!(
        grant_times(&report.trace),
        vec![
            (holder.id(), 0.0),
            (p1.id(), 10.0),
            (p2.id(), 11.0),
            (p3.id(), 12.0),
        ]
    );
}

#[test]
fn test_failure_does_not_stop_other_processes() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    let resource = env.add_resource("machine", 1).unwrap();

    let mut started = false;
    let broken = env
        .spawn(
            "broken",
            from_fn(move |_ctx, _wakeup| {
                if started {
                    anyhow::bail!("lost connection");
                }
                started = true;
                Ok(Step::Request(resource))
            }),
        )
        .unwrap();
    let healthy = env.spawn("healthy", FixedHold::new(resource, 2.0)).unwrap();

    let report = env.run().unwrap();

    assert!(!report.success);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].process, broken.id());
    match &failures[0].outcome {
        Outcome::Failed { at, reason } => {
            assert_eq!(at.as_f64(), 0.0);
            assert!(reason.contains("lost connection"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(matches!(
        failures[0].as_failure(),
        Some(SimulationError::ProcessFailure { .. })
    ));

    // the slot the broken process held went to the healthy one
    assert_eq!(
        grant_times(&report.trace),
        vec![(broken.id(), 0.0), (healthy.id(), 0.0)]
    );
    assert_eq!(env.process_state(healthy.id()), Some(ProcessState::Completed));
    assert_eq!(report.final_time.as_f64(), 2.0);
}

#[test]
fn test_same_instant_events_run_in_scheduling_order() {
    let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
    for name in ["first", "second", "third"] {
        env.spawn(
            name,
            from_fn(move |ctx, wakeup| match wakeup {
                Wakeup::Start => Ok(Step::timeout(1.0)?),
                _ => {
                    ctx.record(name, 0);
                    Ok(Step::Done)
                }
            }),
        )
        .unwrap();
    }

    let report = env.run().unwrap();

    let marks: Vec<&str> = report
        .trace
        .iter()
        .filter_map(|entry| match &entry.kind {
            TraceKind::Mark { label, .. } => Some(label.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(marks, vec!["first", "second", "third"]);
}

#[test]
fn test_empty_environment_finishes_at_zero() {
    let mut env = Environment::new(SimulationConfig::seeded(9)).unwrap();
    let report = env.run().unwrap();

    assert!(report.success);
    assert!(report.outcomes.is_empty());
    assert_eq!(report.final_time.as_f64(), 0.0);
    assert_eq!(report.metrics.events_processed, 0);
}

#[test]
fn test_unseeded_environment_is_rejected() {
    let result = Environment::new(SimulationConfig::default());
    assert!(matches!(result, Err(SimulationError::NoDeterministicSeed)));
}
