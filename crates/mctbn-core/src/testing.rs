//! Seeded forward sampling of small classifiers.
//!
//! Shared by the unit tests, the integration tests and the benchmarks.
//! Enabled outside this crate's own tests with the `test-utils` feature.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::dataset::{Dataset, Sequence, Variable};
use crate::model::pgm::Pgm;

pub type Rate = Box<dyn Fn(&[usize]) -> f64>;
pub type ClassPrior = Box<dyn Fn(&mut StdRng, &mut [usize])>;

/// Gillespie simulator over a full variable row.
///
/// Every feature with a rate function leaves its current state with that
/// intensity and jumps to one of its other states uniformly. Class values are
/// drawn once per sequence.
pub struct CtbnSampler {
    variables: Vec<Variable>,
    rates: Vec<Option<Rate>>,
    class_prior: ClassPrior,
}

impl CtbnSampler {
    pub fn new(variables: Vec<Variable>) -> Self {
        let rates = variables.iter().map(|_| None).collect();
        Self {
            variables,
            rates,
            class_prior: Box::new(|_, _| {}),
        }
    }

    pub fn rate(mut self, var: usize, f: impl Fn(&[usize]) -> f64 + 'static) -> Self {
        self.rates[var] = Some(Box::new(f));
        self
    }

    /// Overrides the class entries of each sequence's initial row, which
    /// otherwise are uniform.
    pub fn classes(mut self, f: impl Fn(&mut StdRng, &mut [usize]) + 'static) -> Self {
        self.class_prior = Box::new(f);
        self
    }

    /// Samples `sequences` trajectories of length `duration`.
    ///
    /// # Panics
    ///
    /// Panics if a rate or class function produces a row the dataset rejects.
    pub fn sample(&self, seed: u64, sequences: usize, duration: f64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = Vec::with_capacity(sequences);
        for _ in 0..sequences {
            out.push(self.sample_sequence(&mut rng, duration));
        }
        Dataset::new(self.variables.clone(), out).expect("simulated data is valid")
    }

    /// A model with no edges over freshly sampled data.
    pub fn pgm(&self, seed: u64, sequences: usize, duration: f64) -> Pgm {
        Pgm::new(Arc::new(self.sample(seed, sequences, duration)))
    }

    fn sample_sequence(&self, rng: &mut StdRng, duration: f64) -> Sequence {
        let mut row: Vec<usize> = self
            .variables
            .iter()
            .map(|v| rng.gen_range(0..v.cardinality()))
            .collect();
        (self.class_prior)(rng, &mut row);

        let mut t = 0.0;
        let mut times = vec![0.0];
        let mut rows = vec![row.clone()];
        loop {
            let rates: Vec<(usize, f64)> = self
                .rates
                .iter()
                .enumerate()
                .filter_map(|(var, rate)| rate.as_ref().map(|f| (var, f(&row))))
                .collect();
            let total: f64 = rates.iter().map(|(_, r)| r).sum();
            if total <= 0.0 {
                break;
            }

            let u: f64 = rng.gen();
            t += -(1.0 - u).ln() / total;
            if t >= duration {
                break;
            }

            let mut pick = rng.gen::<f64>() * total;
            let mut var = rates[rates.len() - 1].0;
            for &(v, r) in &rates {
                if pick < r {
                    var = v;
                    break;
                }
                pick -= r;
            }

            let k = self.variables[var].cardinality();
            let mut next = rng.gen_range(0..k - 1);
            if next >= row[var] {
                next += 1;
            }
            row[var] = next;
            times.push(t);
            rows.push(row.clone());
        }
        times.push(duration);
        rows.push(row);
        Sequence::new(times, rows)
    }
}
