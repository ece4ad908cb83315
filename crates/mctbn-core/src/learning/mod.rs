//! Constraint-based structure learning.
//!
//! This module provides:
//! - **hypothesis**: chi-squared and F tests used to decide (in)dependence
//! - **sepset_cache**: per-node memoization of fits under candidate parent sets
//! - **pc**: PC for the class subgraph
//! - **hiton_pc**: HITON-PC refinement of class-variable neighbourhoods
//! - **ctpc**: CTPC for the feature and bridge subgraphs
//! - **mb_ctpc**: Markov-blanket CTPC and its online variant
//! - **mctbnc**: runs a class-subgraph and a feature-subgraph algorithm together
//!
//! Every algorithm implements [`StructureLearning`]. A run mutates the
//! [`Pgm`]'s structure, learns the parameters of the nodes it touched, and
//! returns a [`LearningReport`]. Nodes whose search had to be abandoned because
//! of degenerate statistics are listed in the report instead of failing the
//! whole run.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::errors::LearnError;
use crate::model::pgm::Pgm;

pub mod ctpc;
pub mod hiton_pc;
pub mod hypothesis;
pub mod mb_ctpc;
pub mod mctbnc;
pub mod pc;
pub mod sepset_cache;
pub mod subsets;

pub use ctpc::{Ctpc, CtpcConfig};
pub use hiton_pc::{HitonPc, HitonPcConfig};
pub use mb_ctpc::{MbCtpc, OnlineMbCtpc};
pub use mctbnc::MctbncLearner;
pub use pc::{Pc, PcConfig};
pub use sepset_cache::CacheStats;

/// A structure-learning algorithm.
pub trait StructureLearning: Send + Sync {
    /// Short algorithm name, e.g. `"CTPC"`.
    fn identifier(&self) -> &'static str;

    /// Hyperparameters as name → value strings, for reporting.
    fn parameters(&self) -> BTreeMap<String, String>;

    /// Learns the whole subgraph this algorithm is responsible for.
    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError>;

    /// Re-learns the parents of a single node.
    fn learn_node(&self, pgm: &mut Pgm, idx: usize) -> Result<LearningReport, LearnError> {
        self.learn_nodes(pgm, &[idx])
    }

    /// Re-learns the parents of the given nodes, leaving every other node's
    /// parent set as it is.
    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError>;
}

/// A node whose parent search stopped early.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbandonedNode {
    pub node: String,
    pub reason: String,
}

/// Outcome of a `learn` call.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LearningReport {
    pub algorithm: String,
    pub parameters: BTreeMap<String, String>,
    /// Hypothesis tests evaluated.
    pub tests_performed: usize,
    /// Candidate edges discarded.
    pub edges_removed: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Nodes whose structure may be incomplete.
    pub abandoned_nodes: Vec<AbandonedNode>,
}

impl LearningReport {
    pub fn new(algorithm: &dyn StructureLearning) -> Self {
        Self {
            algorithm: algorithm.identifier().to_string(),
            parameters: algorithm.parameters(),
            ..Self::default()
        }
    }

    /// Whether every node's search ran to completion.
    pub fn is_complete(&self) -> bool {
        self.abandoned_nodes.is_empty()
    }

    pub(crate) fn abandon(&mut self, node: &str, error: &LearnError) {
        if self.abandoned_nodes.iter().any(|a| a.node == node) {
            return;
        }
        self.abandoned_nodes.push(AbandonedNode {
            node: node.to_string(),
            reason: error.to_string(),
        });
    }

    pub(crate) fn add_cache_stats(&mut self, stats: CacheStats) {
        self.cache_hits += stats.hits;
        self.cache_misses += stats.misses;
    }

    /// Folds the counters and abandoned nodes of `other` into this report.
    pub fn merge(&mut self, other: LearningReport) {
        self.tests_performed += other.tests_performed;
        self.edges_removed += other.edges_removed;
        self.cache_hits += other.cache_hits;
        self.cache_misses += other.cache_misses;
        for abandoned in other.abandoned_nodes {
            if !self.abandoned_nodes.iter().any(|a| a.node == abandoned.node) {
                self.abandoned_nodes.push(abandoned);
            }
        }
    }
}

/// Runs `f` on every item, in parallel when the `parallel` feature is on.
///
/// Each item is visited by exactly one worker, so items may own mutable search
/// state without locking.
#[cfg(feature = "parallel")]
pub(crate) fn for_each_parallel<T, F>(items: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    items.par_iter_mut().for_each(f);
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn for_each_parallel<T, F>(items: &mut [T], f: F)
where
    F: Fn(&mut T),
{
    items.iter_mut().for_each(f);
}

pub(crate) fn format_significance(value: f64) -> String {
    format!("{:e}", value)
}
