//! Benchmarks for batch expansion and suggestion aggregation.

use std::collections::{HashMap, HashSet};

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use vnest_graph::engine::{Engine, EngineConfig};
use vnest_graph::graph::expand::{existing_pairs, plan_batch};
use vnest_graph::graph::suggest::aggregate;
use vnest_graph::graph::{Combination, CombinationId, TripleKey};
use vnest_graph::word::{Word, WordId, WordRole};

fn ids(range: std::ops::Range<u64>) -> Vec<WordId> {
    range.filter_map(WordId::new).collect()
}

fn bench_plan_batch(c: &mut Criterion) {
    let verb = WordId::new(1).unwrap();
    let subjects = ids(2..52);
    let objects = ids(100..150);
    let resolved: HashMap<WordId, Word> = subjects
        .iter()
        .map(|id| (*id, Word::new(*id, "s", WordRole::Subject)))
        .chain(objects.iter().map(|id| (*id, Word::new(*id, "o", WordRole::Object))))
        .collect();
    // Diagonal pairs already present.
    let existing: HashSet<(WordId, WordId)> = subjects
        .iter()
        .zip(objects.iter())
        .map(|(s, o)| (*s, *o))
        .collect();

    c.bench_function("plan_batch_50x50", |bench| {
        bench.iter(|| {
            black_box(plan_batch(
                verb,
                black_box(&subjects),
                black_box(&objects),
                &resolved,
                &existing,
            ))
        })
    });
}

fn bench_aggregate(c: &mut Criterion) {
    let edges: Vec<Combination> = (0..10_000u64)
        .filter_map(|i| {
            let key = TripleKey::new(
                WordId::new(1 + i % 100)?,
                WordId::new(1_000 + i % 20)?,
                WordId::new(2_000 + i % 300)?,
            );
            Some(Combination::new(CombinationId::new(i + 1)?, key))
        })
        .collect();

    c.bench_function("existing_pairs_10k", |bench| {
        bench.iter(|| black_box(existing_pairs(black_box(&edges))))
    });
    c.bench_function("aggregate_10k", |bench| {
        bench.iter(|| black_box(aggregate(black_box(&edges))))
    });
}

fn bench_engine_batch(c: &mut Criterion) {
    c.bench_function("engine_batch_20x20_mem", |bench| {
        bench.iter_with_setup(
            || {
                let engine = Engine::new(EngineConfig::default()).unwrap();
                let verb = engine.create_word("v", WordRole::Verb).unwrap().id;
                let s: Vec<WordId> = (0..20)
                    .map(|i| engine.create_word(&format!("s{i}"), WordRole::Subject).unwrap().id)
                    .collect();
                let o: Vec<WordId> = (0..20)
                    .map(|i| engine.create_word(&format!("o{i}"), WordRole::Object).unwrap().id)
                    .collect();
                (engine, verb, s, o)
            },
            |(engine, verb, s, o)| black_box(engine.create_batch(verb, &s, &o).unwrap()),
        )
    });
}

criterion_group!(benches, bench_plan_batch, bench_aggregate, bench_engine_batch);
criterion_main!(benches);
