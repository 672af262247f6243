//! townsim Benchmark Suite
//!
//! Rough targets on a laptop:
//!   tick_50_agents ........... < 200μs
//!   tick_200_agents .......... < 2ms
//!   clean_response_noisy ..... < 5μs
//!   status_snapshot_50 ....... < 100μs

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use townsim_core::{Archetype, Position, SimTime, SimulationWorld, TownConfig, clean_response};

fn populated_world(agents: u32) -> SimulationWorld {
    let mut config = TownConfig::default();
    config.general.seed = Some(7);
    config.world.width = 2000.0;
    config.world.height = 2000.0;
    let mut world = SimulationWorld::new(config).expect("valid config");
    let archetypes = [
        Archetype::Baker,
        Archetype::Scholar,
        Archetype::Merchant,
        Archetype::Wanderer,
        Archetype::Recluse,
    ];
    for i in 0..agents {
        let x = (i % 20) as f32 * 95.0 + 10.0;
        let y = (i / 20) as f32 * 95.0 + 10.0;
        world.spawn_npc(
            &format!("Villager{i}"),
            "A resident who likes to chat and explore.",
            archetypes[i as usize % archetypes.len()],
            Position::new(x, y),
            &["explore the market"],
        );
    }
    world
}

/// Benchmark: one full tick at different population sizes.
fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for agents in [50_u32, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(agents), &agents, |b, &agents| {
            let mut world = populated_world(agents);
            let mut now = 0_u64;
            b.iter(|| {
                now += 500;
                let report = world.tick(SimTime::from_millis(now));
                black_box(report);
            });
        });
    }
    group.finish();
}

/// Benchmark: cleaning a noisy generated line.
fn bench_clean_response(c: &mut Criterion) {
    let raw = "\"Rosa: Finn: Good morning! The bread is still warm, would you like a loaf or two for the road? I also have\"\nFinn: yes please";
    c.bench_function("clean_response_noisy", |b| {
        b.iter(|| {
            let line = clean_response(black_box(raw), "Rosa", "Finn", 150);
            black_box(line);
        });
    });
}

/// Benchmark: status snapshots for every NPC.
fn bench_status_snapshot(c: &mut Criterion) {
    let mut world = populated_world(50);
    for step in 1..=20 {
        world.tick(SimTime::from_millis(step * 500));
    }
    c.bench_function("status_snapshot_50", |b| {
        b.iter(|| {
            let statuses = world.npc_statuses(SimTime::from_secs(10));
            black_box(statuses);
        });
    });
}

criterion_group!(
    benches,
    bench_tick,
    bench_clean_response,
    bench_status_snapshot,
);
criterion_main!(benches);
