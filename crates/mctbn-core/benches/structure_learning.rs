//! Benchmarks for feature-subgraph structure learning.
//!
//! Run with:
//! - `cargo bench --bench structure_learning --features test-utils`
//! - `cargo bench --bench structure_learning --no-default-features --features test-utils`
//!   (sequential)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mctbn_core::learning::{Ctpc, CtpcConfig, MbCtpc, StructureLearning};
use mctbn_core::model::{Dataset, Pgm, Variable};
use mctbn_core::testing::CtbnSampler;

/// One class variable and a chain of binary features, each feature pulled
/// towards its predecessor; the first feature's rate depends on the class.
fn make_dataset(features: usize, sequences: usize, seed: u64) -> Dataset {
    let mut variables = vec![Variable::class("C", 2)];
    variables.extend((0..features).map(|i| Variable::feature(format!("X{}", i), 2)));
    let n = variables.len();

    let mut sampler =
        CtbnSampler::new(variables).rate(1, |row| if row[0] == 0 { 0.5 } else { 2.0 });
    for v in 2..n {
        sampler = sampler.rate(v, move |row| if row[v] != row[v - 1] { 3.0 } else { 0.3 });
    }
    sampler.sample(seed, sequences, 10.0)
}

fn bench_feature_learning(c: &mut Criterion) {
    let config = CtpcConfig {
        significance_time_to_transition: 1e-3,
        significance_state_to_state: 1e-3,
    };
    let algorithms: Vec<Box<dyn StructureLearning>> = vec![
        Box::new(Ctpc::new(config).expect("valid config")),
        Box::new(MbCtpc::new(config).expect("valid config")),
    ];

    let mut group = c.benchmark_group("feature_subgraph");
    group.sample_size(10);
    for features in [3_usize, 5, 8] {
        let dataset = Arc::new(make_dataset(features, 200, features as u64));
        for algorithm in &algorithms {
            group.bench_with_input(
                BenchmarkId::new(algorithm.identifier(), features),
                &dataset,
                |b, data| {
                    b.iter(|| {
                        let mut pgm = Pgm::new(Arc::clone(data));
                        black_box(algorithm.learn(&mut pgm).expect("learning succeeds"))
                    });
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_feature_learning);
criterion_main!(benches);
