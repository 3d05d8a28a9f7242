//! Criterion benchmarks for the aggregator over synthetic judgment
//! matrices.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use deme_governance::{canonical, Aggregator};
use deme_types::{Judgment, OptionId};

const JUDGES: [&str; 4] = ["consequences", "fairness", "rights_and_duties", "universal_floor"];

fn matrix(options: usize) -> (Vec<OptionId>, Vec<Judgment>) {
    let ids: Vec<OptionId> = (0..options).map(|i| OptionId::new(format!("opt-{i:04}"))).collect();
    let judgments = ids
        .iter()
        .enumerate()
        .flat_map(|(i, id)| {
            JUDGES.iter().enumerate().map(move |(k, judge)| {
                let score = ((i * 37 + k * 11) % 100) as f64 / 100.0;
                Judgment::scored(id.clone(), (*judge).into(), score, vec![])
            })
        })
        .collect();
    (ids, judgments)
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    for profile in canonical::builtin_profiles() {
        for options in [10usize, 100, 1000] {
            let (ids, judgments) = matrix(options);
            group.bench_with_input(
                BenchmarkId::new(profile.profile_id.to_string(), options),
                &options,
                |b, _| {
                    b.iter(|| {
                        Aggregator::decide_judgments(
                            black_box(&profile),
                            black_box(&ids),
                            black_box(&judgments),
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
