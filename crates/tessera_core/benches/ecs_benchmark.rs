//! # ECS Performance Benchmark
//!
//! Spawn, iteration and structural-change costs of the archetype store.
//!
//! Run with: `cargo bench --package tessera_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tessera_core::{component, ComponentDefinition, World};

const ENTITY_COUNT: usize = 100_000;

#[derive(Clone, Copy)]
struct Position(f32, f32, f32);

#[derive(Clone, Copy)]
struct Velocity(f32, f32, f32);

struct Components {
    position: ComponentDefinition<Position>,
    velocity: ComponentDefinition<Velocity>,
}

impl Components {
    fn new() -> Self {
        Self {
            position: component("Position"),
            velocity: component("Velocity"),
        }
    }
}

fn populated_world(c: &Components, count: usize) -> World {
    let mut world = World::new();
    for i in 0..count {
        let f = i as f32;
        world
            .spawn((
                c.position.with(Position(f, f, f)),
                c.velocity.with(Velocity(0.1, 0.2, 0.3)),
            ))
            .unwrap();
    }
    world
}

/// Benchmark: Spawn entities with two components.
fn bench_spawn_entities(c: &mut Criterion) {
    let components = Components::new();
    let mut group = c.benchmark_group("spawn_entities");

    for count in [1_000, 10_000, ENTITY_COUNT] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated_world(&components, count).entity_count()));
        });
    }

    group.finish();
}

/// Benchmark: Mutable iteration over position and velocity.
fn bench_update_positions(c: &mut Criterion) {
    let components = Components::new();
    let mut world = populated_world(&components, ENTITY_COUNT);
    let mut query = world.query((components.position, components.velocity));

    c.bench_function("update_positions_100K", |b| {
        b.iter(|| {
            query
                .for_each_mut(&mut world, |(p, v)| {
                    p.0 += v.0 * 0.016;
                    p.1 += v.1 * 0.016;
                    p.2 += v.2 * 0.016;
                })
                .unwrap();
        });
    });
}

/// Benchmark: Shared iteration.
fn bench_read_positions(c: &mut Criterion) {
    let components = Components::new();
    let world = populated_world(&components, ENTITY_COUNT);
    let mut query = world.query(components.position);

    c.bench_function("sum_positions_100K", |b| {
        b.iter(|| {
            let sum: f32 = query.iter(&world).map(|p| p.0).sum();
            black_box(sum)
        });
    });
}

/// Benchmark: Random component lookups.
fn bench_random_get(c: &mut Criterion) {
    let components = Components::new();
    let world = populated_world(&components, ENTITY_COUNT);
    let entities = world.query(tessera_core::ENTITY).entities(&world);

    let mut state = 0xDEAD_BEEF_u64;
    let picks: Vec<_> = (0..10_000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            entities[(state as usize) % entities.len()]
        })
        .collect();

    c.bench_function("random_get_10K", |b| {
        b.iter(|| {
            let mut sum = 0.0_f32;
            for &e in &picks {
                if let Ok(Some(p)) = world.get(e, &components.position) {
                    sum += p.0;
                }
            }
            black_box(sum)
        });
    });
}

/// Benchmark: Despawn everything, then respawn.
fn bench_spawn_despawn_cycle(c: &mut Criterion) {
    let components = Components::new();

    c.bench_function("spawn_despawn_cycle_10K", |b| {
        b.iter(|| {
            let mut world = populated_world(&components, 10_000);
            let entities = world.query(tessera_core::ENTITY).entities(&world);
            for e in entities {
                world.despawn(e).unwrap();
            }
            black_box(world.entity_count())
        });
    });
}

criterion_group!(
    benches,
    bench_spawn_entities,
    bench_update_positions,
    bench_read_positions,
    bench_random_get,
    bench_spawn_despawn_cycle,
);

criterion_main!(benches);
