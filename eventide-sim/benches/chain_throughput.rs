use criterion::{Criterion, criterion_group, criterion_main};
use eventide_core::SimulationConfig;
use eventide_sim::{ChainConfig, run_chain, run_chain_with};

fn bench_default_chain(c: &mut Criterion) {
    let config = ChainConfig::default();
    c.bench_function("chain_default_5_items", |b| {
        b.iter(|| run_chain(42, &config).expect("chain run failed"));
    });
}

fn bench_contended_chain(c: &mut Criterion) {
    let config = ChainConfig {
        items: 1_000,
        spawn_interval: 0.5,
        ..Default::default()
    };
    c.bench_function("chain_contended_1000_items", |b| {
        b.iter(|| {
            let simulation = SimulationConfig::seeded(42).with_trace_limit(100_000);
            run_chain_with(simulation, &config).expect("chain run failed")
        });
    });
}

criterion_group!(benches, bench_default_chain, bench_contended_chain);
criterion_main!(benches);
