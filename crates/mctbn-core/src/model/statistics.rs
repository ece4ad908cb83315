//! Sufficient statistics and parameter estimates for both node flavors.
//!
//! - Discrete nodes (class variables) count one sample per sequence:
//!   `Nx[ps][state]`, estimated into a conditional probability table.
//! - Continuous-time nodes (features) accumulate, per parent configuration
//!   `ps` and from-state, the transition counts `Mxy[ps][from][to]`, their
//!   totals `Mx[ps][from]` and the dwell time `Tx[ps][from]`; they are
//!   estimated into a conditional intensity matrix (`Qx`, `Oxy`).
//!
//! Estimation uses imaginary counts from [`ParameterPriors`]; all-zero priors
//! give maximum likelihood estimates.

use crate::errors::LearnError;
use crate::model::dataset::Dataset;
use crate::model::parent_set::ParentConfigurations;

/// Flavor of a node, fixed when the model is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// Static categorical variable with a CPT.
    Discrete,
    /// Continuous-time Markov process with a CIM.
    ContinuousTime,
}

/// Imaginary counts added during parameter estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterPriors {
    /// Imaginary count per state of a discrete node.
    pub nx: f64,
    /// Imaginary count per transition `x -> y` of a continuous-time node.
    pub mxy: f64,
    /// Imaginary dwell time per state of a continuous-time node.
    pub tx: f64,
}

impl Default for ParameterPriors {
    fn default() -> Self {
        Self {
            nx: 0.0,
            mxy: 0.0,
            tx: 0.0,
        }
    }
}

impl ParameterPriors {
    pub fn validate(self) -> Result<Self, LearnError> {
        for (name, value) in [("nx", self.nx), ("mxy", self.mxy), ("tx", self.tx)] {
            if !value.is_finite() || value < 0.0 {
                return Err(LearnError::Configuration(format!(
                    "prior '{}' must be finite and >= 0, got {}",
                    name, value
                )));
            }
        }
        Ok(self)
    }
}

/// Counts of a discrete node, `nx[ps][state]`.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteStatistics {
    pub nx: Vec<Vec<f64>>,
}

impl DiscreteStatistics {
    /// Total number of samples observed under configuration `ps`.
    pub fn samples(&self, ps: usize) -> f64 {
        self.nx[ps].iter().sum()
    }
}

/// Transition counts and dwell times of a continuous-time node.
#[derive(Debug, Clone, PartialEq)]
pub struct CimStatistics {
    /// `mxy[ps][from][to]` transition counts.
    pub mxy: Vec<Vec<Vec<f64>>>,
    /// `mx[ps][from]` total transitions out of `from`.
    pub mx: Vec<Vec<f64>>,
    /// `tx[ps][from]` total time spent in `from`.
    pub tx: Vec<Vec<f64>>,
}

/// Sufficient statistics of a node for one parent set.
#[derive(Debug, Clone, PartialEq)]
pub enum SufficientStatistics {
    Discrete(DiscreteStatistics),
    ContinuousTime(CimStatistics),
}

impl SufficientStatistics {
    /// Scans the dataset once for node `node` under the parent configurations
    /// `parents`.
    ///
    /// Continuous-time statistics read the parent configuration at the start
    /// of each observation interval; a change of the node's state at the end of
    /// the interval counts as one transition.
    pub fn compute(
        dataset: &Dataset,
        node: usize,
        kind: NodeKind,
        parents: &ParentConfigurations,
    ) -> Self {
        let num_states = dataset.cardinalities()[node];
        let num_configs = parents.len();

        match kind {
            NodeKind::Discrete => {
                let mut nx = vec![vec![0.0; num_states]; num_configs];
                for seq in dataset.sequences() {
                    let row = &seq.observations[0];
                    nx[parents.index_of_row(row)][row[node]] += 1.0;
                }
                SufficientStatistics::Discrete(DiscreteStatistics { nx })
            }
            NodeKind::ContinuousTime => {
                let mut mxy = vec![vec![vec![0.0; num_states]; num_states]; num_configs];
                let mut mx = vec![vec![0.0; num_states]; num_configs];
                let mut tx = vec![vec![0.0; num_states]; num_configs];
                for seq in dataset.sequences() {
                    for t in 1..seq.len() {
                        let row = &seq.observations[t - 1];
                        let ps = parents.index_of_row(row);
                        let from = row[node];
                        let to = seq.observations[t][node];
                        tx[ps][from] += seq.times[t] - seq.times[t - 1];
                        if to != from {
                            mxy[ps][from][to] += 1.0;
                            mx[ps][from] += 1.0;
                        }
                    }
                }
                SufficientStatistics::ContinuousTime(CimStatistics { mxy, mx, tx })
            }
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteStatistics> {
        match self {
            SufficientStatistics::Discrete(stats) => Some(stats),
            SufficientStatistics::ContinuousTime(_) => None,
        }
    }

    pub fn as_cim(&self) -> Option<&CimStatistics> {
        match self {
            SufficientStatistics::ContinuousTime(stats) => Some(stats),
            SufficientStatistics::Discrete(_) => None,
        }
    }

    /// Number of parent configurations the statistics are indexed by.
    pub fn num_parent_configs(&self) -> usize {
        match self {
            SufficientStatistics::Discrete(s) => s.nx.len(),
            SufficientStatistics::ContinuousTime(s) => s.mx.len(),
        }
    }
}

/// Fitted parameters of a node for one parent set.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// `theta[ps][state]`.
    Cpt { theta: Vec<Vec<f64>> },
    /// `qx[ps][from]` leaving intensities and `oxy[ps][from][to]` transition
    /// probabilities given a transition.
    Cim {
        qx: Vec<Vec<f64>>,
        oxy: Vec<Vec<Vec<f64>>>,
    },
}

impl Parameters {
    pub fn estimate(stats: &SufficientStatistics, priors: &ParameterPriors) -> Self {
        match stats {
            SufficientStatistics::Discrete(s) => Parameters::Cpt {
                theta: estimate_cpt(s, priors),
            },
            SufficientStatistics::ContinuousTime(s) => {
                let (qx, oxy) = estimate_cim(s, priors);
                Parameters::Cim { qx, oxy }
            }
        }
    }

    /// Leaving intensities, for continuous-time nodes.
    pub fn qx(&self) -> Option<&[Vec<f64>]> {
        match self {
            Parameters::Cim { qx, .. } => Some(qx),
            Parameters::Cpt { .. } => None,
        }
    }
}

fn estimate_cpt(stats: &DiscreteStatistics, priors: &ParameterPriors) -> Vec<Vec<f64>> {
    stats
        .nx
        .iter()
        .map(|counts| {
            let k = counts.len() as f64;
            let total: f64 = counts.iter().sum::<f64>() + priors.nx * k;
            if total > 0.0 {
                counts.iter().map(|&n| (n + priors.nx) / total).collect()
            } else {
                vec![1.0 / k; counts.len()]
            }
        })
        .collect()
}

fn estimate_cim(
    stats: &CimStatistics,
    priors: &ParameterPriors,
) -> (Vec<Vec<f64>>, Vec<Vec<Vec<f64>>>) {
    let mut qx = Vec::with_capacity(stats.mx.len());
    let mut oxy = Vec::with_capacity(stats.mx.len());

    for ps in 0..stats.mx.len() {
        let num_states = stats.mx[ps].len();
        let mx_prior = priors.mxy * num_states.saturating_sub(1) as f64;
        let mut q_row = vec![0.0; num_states];
        let mut o_rows = vec![vec![0.0; num_states]; num_states];

        for from in 0..num_states {
            let mx = stats.mx[ps][from] + mx_prior;
            let tx = stats.tx[ps][from] + priors.tx;
            if tx > 0.0 {
                q_row[from] = mx / tx;
            }
            if mx > 0.0 {
                for to in (0..num_states).filter(|&to| to != from) {
                    o_rows[from][to] = (stats.mxy[ps][from][to] + priors.mxy) / mx;
                }
            }
        }

        qx.push(q_row);
        oxy.push(o_rows);
    }

    (qx, oxy)
}

/// Statistics together with the parameters fitted from them.
///
/// Immutable once built; shared through `Arc` by the separating-set caches.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFit {
    pub statistics: SufficientStatistics,
    pub parameters: Parameters,
}

impl NodeFit {
    pub fn compute(
        dataset: &Dataset,
        node: usize,
        kind: NodeKind,
        parents: &ParentConfigurations,
        priors: &ParameterPriors,
    ) -> Self {
        let statistics = SufficientStatistics::compute(dataset, node, kind, parents);
        let parameters = Parameters::estimate(&statistics, priors);
        Self {
            statistics,
            parameters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dataset::{Sequence, Variable};

    fn dataset() -> Dataset {
        Dataset::new(
            vec![Variable::class("C", 2), Variable::feature("X", 2)],
            vec![
                Sequence::new(
                    vec![0.0, 1.0, 3.0, 3.5],
                    vec![vec![0, 0], vec![0, 1], vec![0, 0], vec![0, 1]],
                ),
                Sequence::new(vec![0.0, 2.0], vec![vec![1, 1], vec![1, 1]]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn continuous_time_statistics_split_by_class_parent() {
        let ds = dataset();
        let parents = ParentConfigurations::new(&[0], ds.cardinalities()).unwrap();
        let stats = SufficientStatistics::compute(&ds, 1, NodeKind::ContinuousTime, &parents);
        let cim = stats.as_cim().unwrap();

        // C = 0: X dwells 1.0 + 0.5 in state 0 and 2.0 in state 1
        assert_eq!(cim.tx[0], vec![1.5, 2.0]);
        assert_eq!(cim.mx[0], vec![2.0, 1.0]);
        assert_eq!(cim.mxy[0][0][1], 2.0);
        // C = 1: no transitions, 2.0 time units in state 1
        assert_eq!(cim.tx[1], vec![0.0, 2.0]);
        assert_eq!(cim.mx[1], vec![0.0, 0.0]);
    }

    #[test]
    fn discrete_statistics_count_one_sample_per_sequence() {
        let ds = dataset();
        let parents = ParentConfigurations::new(&[], ds.cardinalities()).unwrap();
        let stats = SufficientStatistics::compute(&ds, 0, NodeKind::Discrete, &parents);
        assert_eq!(stats.as_discrete().unwrap().nx, vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn mle_intensities_and_empty_configurations() {
        let ds = dataset();
        let parents = ParentConfigurations::new(&[0], ds.cardinalities()).unwrap();
        let fit = NodeFit::compute(
            &ds,
            1,
            NodeKind::ContinuousTime,
            &parents,
            &ParameterPriors::default(),
        );
        let qx = fit.parameters.qx().unwrap();
        assert!((qx[0][0] - 2.0 / 1.5).abs() < 1e-12);
        assert!((qx[0][1] - 0.5).abs() < 1e-12);
        assert_eq!(qx[1][0], 0.0);
        match &fit.parameters {
            Parameters::Cim { oxy, .. } => assert_eq!(oxy[0][0][1], 1.0),
            other => panic!("unexpected parameters {:?}", other),
        }
    }

    #[test]
    fn cpt_smooths_counts_and_falls_back_to_uniform() {
        let stats = SufficientStatistics::Discrete(DiscreteStatistics {
            nx: vec![vec![0.0, 0.0, 0.0], vec![2.0, 1.0, 1.0]],
        });
        let priors = ParameterPriors {
            nx: 1.0,
            ..ParameterPriors::default()
        };
        match Parameters::estimate(&stats, &priors) {
            Parameters::Cpt { theta } => {
                assert!((theta[0][0] - 1.0 / 3.0).abs() < 1e-12);
                assert!((theta[1][0] - 3.0 / 7.0).abs() < 1e-12);
            }
            other => panic!("unexpected parameters {:?}", other),
        }
        match Parameters::estimate(&stats, &ParameterPriors::default()) {
            Parameters::Cpt { theta } => assert_eq!(theta[0], vec![1.0 / 3.0; 3]),
            other => panic!("unexpected parameters {:?}", other),
        }
    }

    #[test]
    fn priors_reject_negative_counts() {
        let priors = ParameterPriors {
            tx: -1.0,
            ..ParameterPriors::default()
        };
        assert!(priors.validate().is_err());
    }
}
