// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(dead_code)]

use archetype_ecs::filter::{Filter, InOutMode, Operator, Source, Term};
use archetype_ecs::World;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

#[derive(Debug, Clone, Copy)]
struct Position(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Velocity(f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Health(u32);

fn and_term(id: archetype_ecs::EntityId) -> Term {
    Term {
        id,
        operator: Operator::And,
        source: Source::This,
        inout: InOutMode::InOut,
    }
}

fn build_world(entity_count: usize) -> (World, usize, archetype_ecs::EntityId) {
    let mut world = World::new();
    let pos = world.register_component::<Position>("Position");
    let vel = world.register_component::<Velocity>("Velocity");
    world.register_component::<Health>("Health");

    for i in 0..entity_count {
        let e = world.spawn();
        world.add(e, Position(1.0, 2.0, 3.0)).unwrap();
        world.add(e, Velocity(0.0, 0.0, 0.0)).unwrap();
        if i % 3 == 0 {
            world.add(e, Health(100)).unwrap();
        }
    }

    let filter = Filter::new(vec![and_term(pos), and_term(vel)]);
    let query = world.register_query(filter);
    (world, query, pos)
}

fn query_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_bench");

    group.bench_function("iterate_1000_two_archetypes", |b| {
        let (mut world, query, _pos) = build_world(1000);
        b.iter(|| {
            let mut total = 0.0f32;
            world
                .run_query(query, |_w, batch| {
                    for row in 0..batch.len() {
                        if let Some(p) = batch.get::<Position>(0, row) {
                            total += p.0;
                        }
                    }
                })
                .unwrap();
            black_box(total);
        });
    });

    group.bench_function("iterate_10000_two_archetypes", |b| {
        let (mut world, query, _pos) = build_world(10_000);
        b.iter(|| {
            let mut total = 0.0f32;
            world
                .run_query(query, |_w, batch| {
                    for row in 0..batch.len() {
                        if let Some(p) = batch.get::<Position>(0, row) {
                            total += p.0;
                        }
                    }
                })
                .unwrap();
            black_box(total);
        });
    });

    group.bench_function("register_query_cold", |b| {
        let (mut world, _query, pos) = build_world(1000);
        b.iter(|| {
            let filter = Filter::new(vec![and_term(pos)]);
            black_box(world.register_query(filter));
        });
    });

    group.finish();
}

criterion_group!(benches, query_benchmark);
criterion_main!(benches);
