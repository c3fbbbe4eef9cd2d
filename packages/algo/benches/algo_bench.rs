//! Benchmark suite for mastery-algo
//!
//! Run with: cargo bench

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mastery_algo::{
    update, BktParams, Catalog, CurriculumScope, InterventionScorer, KnowledgeComponent,
    PathSequencer, Priority, StudentPerformance, DAY_MS,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NOW: i64 = 1_700_000_000_000;

/// Layered DAG: each KC requires up to two KCs from earlier positions
fn random_catalog(size: usize, seed: u64) -> Catalog {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let kcs = (0..size).map(|i| {
        let mut prereqs = Vec::new();
        if i > 0 {
            for _ in 0..rng.gen_range(0..=2) {
                prereqs.push(format!("kc-{}", rng.gen_range(0..i)));
            }
        }
        KnowledgeComponent::new(format!("kc-{i}"), i as i64).requires(prereqs)
    });
    Catalog::from_components(kcs.collect::<Vec<_>>())
}

fn random_roster(size: usize, seed: u64) -> Vec<StudentPerformance> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..size)
        .map(|i| StudentPerformance {
            student_id: format!("s{i}"),
            name: format!("Student {i}"),
            p_mastery: rng.gen_bool(0.9).then(|| rng.gen_range(0.0..1.0)),
            last_response_at: rng
                .gen_bool(0.8)
                .then(|| NOW - rng.gen_range(0..14 * DAY_MS)),
            response_count: rng.gen_range(0..500),
            declared_priority: rng.gen_bool(0.1).then_some(Priority::High),
        })
        .collect()
}

fn bench_bkt_update(c: &mut Criterion) {
    let params = BktParams::default();
    c.bench_function("bkt::update x100", |b| {
        b.iter(|| {
            let mut p = params.p_init;
            for i in 0..100 {
                p = update(black_box(p), i % 3 != 0, &params);
            }
            p
        })
    });
}

fn bench_build_path(c: &mut Criterion) {
    let sequencer = PathSequencer::default();
    let mut group = c.benchmark_group("sequencer::build_path");
    for size in [100usize, 1_000] {
        let catalog = random_catalog(size, 7);
        group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
            b.iter(|| sequencer.build_path("s1", catalog, &CurriculumScope::all()))
        });
    }
    group.finish();
}

fn bench_advance(c: &mut Criterion) {
    let sequencer = PathSequencer::default();
    let catalog = random_catalog(1_000, 11);
    let path = sequencer
        .build_path("s1", &catalog, &CurriculumScope::all())
        .path;
    let states = HashMap::new();

    c.bench_function("sequencer::advance 1000", |b| {
        b.iter(|| sequencer.advance(&catalog, black_box(&path), &states))
    });
}

fn bench_rank(c: &mut Criterion) {
    let scorer = InterventionScorer::default();
    let mut group = c.benchmark_group("intervention::rank");
    for size in [100usize, 10_000] {
        let roster = random_roster(size, 42);
        group.bench_with_input(BenchmarkId::from_parameter(size), &roster, |b, roster| {
            b.iter(|| scorer.rank(roster, NOW))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_bkt_update, bench_build_path, bench_advance, bench_rank);
criterion_main!(benches);
