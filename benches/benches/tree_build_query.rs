// Copyright 2025 the MD Box Tree Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::sync::Arc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mdbox_geom::{Extents, MAX_DIMENSIONS};
use mdbox_tree::{BoxController, EventTree, LeanEvent, SplitPolicy, TraversalFilter};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

fn gen_uniform_events(nd: usize, count: usize, seed: u64) -> Vec<LeanEvent> {
    let mut rng = Rng::new(seed);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let mut p = [0.0_f32; MAX_DIMENSIONS];
        for v in &mut p[..nd] {
            *v = rng.next_f32();
        }
        out.push(LeanEvent::from_slice(&p[..nd], 1.0, 1.0).unwrap());
    }
    out
}

fn gen_clustered_events(
    nd: usize,
    n_clusters: usize,
    per_cluster: usize,
    spread: f32,
) -> Vec<LeanEvent> {
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    let mut out = Vec::with_capacity(n_clusters * per_cluster);
    for _ in 0..n_clusters {
        let mut center = [0.0_f32; MAX_DIMENSIONS];
        for c in &mut center[..nd] {
            *c = 0.1 + rng.next_f32() * 0.8;
        }
        for _ in 0..per_cluster {
            let mut p = center;
            for v in &mut p[..nd] {
                *v = (*v + (rng.next_f32() - 0.5) * spread).clamp(0.0, 0.999);
            }
            out.push(LeanEvent::from_slice(&p[..nd], 1.0, 1.0).unwrap());
        }
    }
    out
}

fn build_tree(nd: usize, policy: &SplitPolicy, events: &[LeanEvent]) -> EventTree<LeanEvent> {
    let controller = Arc::new(BoxController::new(policy.clone()));
    let mut tree = EventTree::new(controller, Extents::cube(nd, 0.0, 1.0).unwrap()).unwrap();
    tree.insert_many(events.iter().copied()).unwrap();
    tree
}

fn bench_insert_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_split");
    let policy = SplitPolicy::uniform(1000, 8, 2);
    for &nd in &[2usize, 3, 4] {
        let events = gen_uniform_events(nd, 200_000, 0xFACE_FEED_CAFE_BABE);
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_function(format!("uniform_nd{nd}"), |b| {
            b.iter_batched(
                || events.clone(),
                |events| {
                    let controller = Arc::new(BoxController::new(policy.clone()));
                    let mut tree =
                        EventTree::new(controller, Extents::cube(nd, 0.0, 1.0).unwrap()).unwrap();
                    tree.insert_many(events).unwrap();
                    black_box(tree.split_all().unwrap());
                },
                BatchSize::LargeInput,
            );
        });
    }
    let events = gen_clustered_events(3, 20, 10_000, 0.05);
    group.throughput(Throughput::Elements(events.len() as u64));
    group.bench_function("clustered_nd3", |b| {
        b.iter_batched(
            || events.clone(),
            |events| {
                let controller = Arc::new(BoxController::new(policy.clone()));
                let mut tree =
                    EventTree::new(controller, Extents::cube(3, 0.0, 1.0).unwrap()).unwrap();
                tree.insert_many(events).unwrap();
                black_box(tree.split_all().unwrap());
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_insert_into_split_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_split_tree");
    let policy = SplitPolicy::uniform(100, 6, 2);
    let seed = gen_uniform_events(3, 100_000, 0x0123_4567_89AB_CDEF);
    let batch = gen_uniform_events(3, 10_000, 0xBADC_F00D_1234_5678);
    group.throughput(Throughput::Elements(batch.len() as u64));
    group.bench_function("route_10k_nd3", |b| {
        b.iter(|| {
            let mut tree = build_tree(3, &policy, &[]);
            tree.insert_many(batch.iter().copied()).unwrap();
            black_box(tree.n_points());
        });
    });
    group.bench_function("route_10k_nd3_deep", |b| {
        b.iter_batched(
            || build_tree(3, &policy, &seed),
            |mut tree| {
                tree.split_all().unwrap();
                tree.insert_many(batch.iter().copied()).unwrap();
                black_box(tree.signal());
            },
            BatchSize::LargeInput,
        );
    });
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let policy = SplitPolicy::uniform(200, 8, 2);
    let events = gen_uniform_events(3, 200_000, 0xDEAD_BEEF_CAFE_F00D);
    let mut tree = build_tree(3, &policy, &events);
    tree.split_all().unwrap();

    let small = Extents::cube(3, 0.4, 0.5).unwrap();
    let large = Extents::cube(3, 0.1, 0.9).unwrap();
    group.bench_function("events_in_region_small", |b| {
        b.iter(|| black_box(tree.events_in_region(&small).unwrap().len()));
    });
    group.bench_function("integrate_small", |b| {
        b.iter(|| black_box(tree.integrate(&small).unwrap()));
    });
    group.bench_function("events_in_region_large", |b| {
        b.iter(|| black_box(tree.events_in_region(&large).unwrap().len()));
    });
    group.bench_function("integrate_large", |b| {
        b.iter(|| black_box(tree.integrate(&large).unwrap()));
    });
    group.bench_function("signal_cached", |b| {
        b.iter(|| black_box(tree.signal()));
    });
    group.bench_function("leaves_depth3", |b| {
        b.iter(|| {
            black_box(
                tree.boxes(TraversalFilter::leaves().with_max_depth(3))
                    .count(),
            )
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_insert_split,
    bench_insert_into_split_tree,
    bench_queries,
);
criterion_main!(benches);
