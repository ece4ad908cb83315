//! # Markov-blanket CTPC
//!
//! A three-phase variant of [`Ctpc`](crate::learning::Ctpc) that uses the
//! class variables to prune the feature subgraph before the full search:
//!
//! 1. Per feature, backward elimination restricted to class-variable
//!    candidates with class-only separating sets. This yields the bridge
//!    parents `PaY(X)` of every feature.
//! 2. A pruning heuristic over ordered feature pairs `(Xi, Xj)` joined by an
//!    edge:
//!    - `PaY(Xi)` empty: drop every feature-feature edge of `Xi`,
//!    - `PaY(Xi) ∩ PaY(Xj)` empty: drop both directions,
//!    - `PaY(Xi) \ PaY(Xj)` non-empty: drop `Xj → Xi`.
//! 3. Full backward elimination over the reduced candidates.
//!
//! The per-feature search contexts, including their fit caches, live across
//! all three phases, so phase 3 reuses every class-only fit from phase 1.
//!
//! [`OnlineMbCtpc`] re-learns a subset of features after new data arrived:
//! the other features keep their current feature parents as candidates and
//! only the requested nodes' parent sets are written back.

use std::collections::BTreeMap;

use crate::errors::LearnError;
use crate::learning::ctpc::{
    collect_searches, feature_targets, CandidateScope, CtpcConfig, ParentSearch,
};
use crate::learning::{for_each_parallel, LearningReport, StructureLearning};
use crate::model::adjacency::AdjacencyMatrix;
use crate::model::pgm::Pgm;

/// Offline Markov-blanket CTPC.
#[derive(Debug, Clone, Default)]
pub struct MbCtpc {
    config: CtpcConfig,
}

impl MbCtpc {
    pub fn new(config: CtpcConfig) -> Result<Self, LearnError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CtpcConfig {
        &self.config
    }
}

impl StructureLearning for MbCtpc {
    fn identifier(&self) -> &'static str {
        "MB-CTPC"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        self.config.parameters()
    }

    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError> {
        let features = pgm.feature_indices();
        self.learn_nodes(pgm, &features)
    }

    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let targets = feature_targets(pgm, idxs, self.identifier())?;
        let report = LearningReport::new(self);
        run_markov_blanket(&self.config, pgm, &targets, false, report)
    }
}

/// Markov-blanket CTPC for incremental updates.
#[derive(Debug, Clone, Default)]
pub struct OnlineMbCtpc {
    config: CtpcConfig,
}

impl OnlineMbCtpc {
    pub fn new(config: CtpcConfig) -> Result<Self, LearnError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CtpcConfig {
        &self.config
    }
}

impl StructureLearning for OnlineMbCtpc {
    fn identifier(&self) -> &'static str {
        "Online-MB-CTPC"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        self.config.parameters()
    }

    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError> {
        let features = pgm.feature_indices();
        self.learn_nodes(pgm, &features)
    }

    /// Re-learns the parents of `idxs` only.
    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let targets = feature_targets(pgm, idxs, self.identifier())?;
        let report = LearningReport::new(self);
        run_markov_blanket(&self.config, pgm, &targets, true, report)
    }
}

/// Candidate graph the three phases start from.
///
/// Bridge candidates are always complete. Feature candidates are complete for
/// `targets`; for other features they are complete offline and the current
/// feature parents online.
fn initial_candidates(pgm: &Pgm, targets: &[usize], online: bool) -> AdjacencyMatrix {
    let mut candidates = AdjacencyMatrix::complete_candidates(&pgm.class_mask());
    if online {
        for child in pgm.feature_indices() {
            if targets.binary_search(&child).is_ok() {
                continue;
            }
            for parent in pgm.feature_indices() {
                candidates.set(parent, child, pgm.adjacency().has_edge(parent, child));
            }
        }
    }
    candidates
}

/// Phase 2 pruning of feature-feature candidates.
pub(crate) fn prune_feature_edges(candidates: &mut AdjacencyMatrix, is_class: &[bool]) {
    let features: Vec<usize> = (0..is_class.len()).filter(|&i| !is_class[i]).collect();
    let class_parents: Vec<Vec<usize>> = (0..is_class.len())
        .map(|child| {
            candidates
                .parents_of(child)
                .into_iter()
                .filter(|&p| is_class[p])
                .collect()
        })
        .collect();

    for &xi in &features {
        for &xj in &features {
            if xi == xj || !candidates.adjacent(xi, xj) {
                continue;
            }
            let pa_i = &class_parents[xi];
            let pa_j = &class_parents[xj];
            if pa_i.is_empty() {
                for &other in &features {
                    candidates.remove_edge(xi, other);
                    candidates.remove_edge(other, xi);
                }
            } else if !pa_i.iter().any(|p| pa_j.contains(p)) {
                candidates.remove_edge(xi, xj);
                candidates.remove_edge(xj, xi);
            } else if pa_i.iter().any(|p| !pa_j.contains(p)) {
                candidates.remove_edge(xj, xi);
            }
        }
    }
}

fn run_markov_blanket(
    config: &CtpcConfig,
    pgm: &mut Pgm,
    targets: &[usize],
    online: bool,
    mut report: LearningReport,
) -> Result<LearningReport, LearnError> {
    let tester = config.tester()?;
    let model: &Pgm = pgm;
    let is_class = model.class_mask();
    let candidates = initial_candidates(model, targets, online);

    // One context per feature: phase 2 needs the bridge parents of every
    // feature, not only of the targets.
    let mut searches: Vec<ParentSearch> = model
        .feature_indices()
        .into_iter()
        .map(|node| ParentSearch::new(model, node, candidates.parents_of(node), tester.clone()))
        .collect();

    for_each_parallel(&mut searches, |search| {
        search.eliminate(model, CandidateScope::ClassOnly)
    });

    let mut reduced = candidates.clone();
    for search in &searches {
        for p in 0..reduced.num_nodes() {
            reduced.set(p, search.node, search.candidates.binary_search(&p).is_ok());
        }
    }
    let before = reduced.num_edges();
    prune_feature_edges(&mut reduced, &is_class);
    report.edges_removed += before - reduced.num_edges();
    for search in &mut searches {
        search.candidates.retain(|&p| reduced.has_edge(p, search.node));
    }

    for_each_parallel(&mut searches, |search| {
        if targets.binary_search(&search.node).is_ok() {
            search.eliminate(model, CandidateScope::All);
        }
    });

    let learned = collect_searches(&searches, &reduced, &mut report);
    pgm.set_structure(targets, &learned)?;
    pgm.learn_parameters(targets)?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        algorithm = %report.algorithm,
        nodes = targets.len(),
        tests = report.tests_performed,
        removed = report.edges_removed,
        abandoned = report.abandoned_nodes.len(),
        "structure learning finished"
    );

    Ok(report)
}
