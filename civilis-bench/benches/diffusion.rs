//! Civilis Benchmark Suite
//!
//! Hot paths of a diffusion run:
//!   insight_insert_new ............... embed + append
//!   insight_reinforce ................ exact-content hit, no embedding
//!   insight_insert_evict_at_200 ...... insert into a full memory
//!   query_top1_from_200 .............. the per-learn mastery check
//!   network_build_small_world_1000
//!   network_build_random_1000
//!   simulation_50_agents_20_rounds ... construction + full run

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use civilis_core::config::{CivilisConfig, SimulationConfig};
use civilis_core::embedding::{EmbeddingProvider, HashEmbeddingProvider};
use civilis_core::memory::VectorMemory;
use civilis_core::network::{NetworkType, SocialNetwork};
use civilis_core::simulation::DiffusionSimulation;

fn embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashEmbeddingProvider::default())
}

fn full_memory(cap: usize) -> VectorMemory {
    let mut mem = VectorMemory::new(embedder(), cap);
    for i in 0..cap {
        mem.add_insight(&format!("Statement number {i} about the river crossing"), "bench")
            .expect("add");
    }
    mem
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insight_insert_new", |b| {
        b.iter_batched(
            || VectorMemory::new(embedder(), 200),
            |mut mem| {
                mem.add_insight(black_box("Fire is dangerous."), "bench")
                    .expect("add");
                mem
            },
            BatchSize::SmallInput,
        );
    });

    let mut mem = full_memory(200);
    c.bench_function("insight_reinforce", |b| {
        b.iter(|| {
            mem.add_insight(black_box("Statement number 100 about the river crossing"), "bench")
                .expect("add")
        });
    });

    c.bench_function("insight_insert_evict_at_200", |b| {
        b.iter_batched(
            || full_memory(200),
            |mut mem| {
                mem.add_insight(black_box("The stars may guide travelers across the sea."), "bench")
                    .expect("add");
                mem
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_query(c: &mut Criterion) {
    let mem = full_memory(200);
    c.bench_function("query_top1_from_200", |b| {
        b.iter(|| {
            let hits = mem
                .query(black_box("Statement number 42 about the river crossing"), 1, 0.95)
                .expect("query");
            black_box(hits.len())
        });
    });
}

fn bench_network(c: &mut Criterion) {
    c.bench_function("network_build_small_world_1000", |b| {
        b.iter(|| SocialNetwork::build(black_box(1000), NetworkType::SmallWorld, 42).expect("build"));
    });
    c.bench_function("network_build_random_1000", |b| {
        b.iter(|| SocialNetwork::build(black_box(1000), NetworkType::Random, 42).expect("build"));
    });
}

fn bench_simulation(c: &mut Criterion) {
    let config = CivilisConfig {
        simulation: SimulationConfig::new(50, 20, 7),
        ..CivilisConfig::default()
    };
    c.bench_function("simulation_50_agents_20_rounds", |b| {
        b.iter(|| {
            let mut sim = DiffusionSimulation::new(&config, embedder()).expect("new");
            black_box(sim.run().expect("run"))
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_query,
    bench_network,
    bench_simulation,
);
criterion_main!(benches);
