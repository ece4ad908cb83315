//! Shared helpers for the integration tests: seeded samplers for class
//! variables, and continuous-time feature models built on `CtbnSampler`.

#![allow(dead_code)]

use std::sync::Arc;

use mctbn::model::{Dataset, Pgm, Sequence, Variable};
pub use mctbn_core::testing::CtbnSampler;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Static class-variable data: one single-row sequence per sample.
pub fn class_pgm(
    names: &[&str],
    seed: u64,
    samples: usize,
    draw: impl Fn(&mut StdRng) -> Vec<usize>,
) -> Pgm {
    let mut rng = StdRng::seed_from_u64(seed);
    let variables = names.iter().map(|n| Variable::class(*n, 2)).collect();
    let sequences = (0..samples)
        .map(|_| Sequence::new(vec![0.0], vec![draw(&mut rng)]))
        .collect();
    Pgm::new(Arc::new(
        Dataset::new(variables, sequences).expect("sampled dataset is valid"),
    ))
}

/// `value` with probability `keep`, its complement otherwise.
pub fn noisy(rng: &mut StdRng, value: usize, keep: f64) -> usize {
    if rng.gen_bool(keep) {
        value
    } else {
        1 - value
    }
}

/// X1 flips at a constant rate, X2 is pulled towards X1 and X3 towards X2.
/// The class variable influences nothing.
pub fn feature_chain() -> CtbnSampler {
    CtbnSampler::new(vec![
        Variable::class("C", 2),
        Variable::feature("X1", 2),
        Variable::feature("X2", 2),
        Variable::feature("X3", 2),
    ])
    .rate(1, |_| 1.0)
    .rate(2, |row| if row[2] != row[1] { 4.0 } else { 0.4 })
    .rate(3, |row| if row[3] != row[2] { 4.0 } else { 0.4 })
}
