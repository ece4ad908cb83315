//! # CTPC
//!
//! Learns the parents of continuous-time (feature) nodes. Each feature starts
//! from the complete candidate graph, where every other node may be a parent,
//! and drops a candidate `p` as soon as some subset `S` of the remaining
//! candidates makes the node's transition behaviour under `S ∪ {p}`
//! indistinguishable from its behaviour under `S`.
//!
//! Nodes are searched independently. With the `parallel` feature each node's
//! [`ParentSearch`] runs on its own rayon task; write-back and parameter
//! learning happen after every search has finished.

use std::collections::BTreeMap;

use crate::errors::LearnError;
use crate::learning::hypothesis::{validate_significance, TransitionTester};
use crate::learning::sepset_cache::SepsetCache;
use crate::learning::subsets::combinations;
use crate::learning::{for_each_parallel, format_significance, LearningReport, StructureLearning};
use crate::model::adjacency::AdjacencyMatrix;
use crate::model::parent_set::ParentSetKey;
use crate::model::pgm::Pgm;

/// Significance levels of the two transition tests.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CtpcConfig {
    /// Two-sided level of the F-test on leaving intensities.
    pub significance_time_to_transition: f64,
    /// Level of the chi-squared test on destination states.
    pub significance_state_to_state: f64,
}

impl Default for CtpcConfig {
    fn default() -> Self {
        Self {
            significance_time_to_transition: 1e-5,
            significance_state_to_state: 1e-5,
        }
    }
}

impl CtpcConfig {
    pub fn validate(&self) -> Result<(), LearnError> {
        validate_significance(
            "significance_time_to_transition",
            self.significance_time_to_transition,
        )?;
        validate_significance("significance_state_to_state", self.significance_state_to_state)?;
        Ok(())
    }

    pub(crate) fn tester(&self) -> Result<TransitionTester, LearnError> {
        TransitionTester::new(
            self.significance_time_to_transition,
            self.significance_state_to_state,
        )
    }

    pub(crate) fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "significance_time_to_transition".to_string(),
                format_significance(self.significance_time_to_transition),
            ),
            (
                "significance_state_to_state".to_string(),
                format_significance(self.significance_state_to_state),
            ),
        ])
    }
}

/// Which candidates a [`ParentSearch`] may test and condition on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CandidateScope {
    All,
    ClassOnly,
}

/// Search state of one feature node.
///
/// Owns everything the search mutates, so searches of different nodes can
/// run concurrently against a shared `&Pgm`.
#[derive(Debug, Clone)]
pub(crate) struct ParentSearch {
    pub node: usize,
    pub name: String,
    /// Remaining candidate parents, sorted.
    pub candidates: Vec<usize>,
    pub cache: SepsetCache,
    pub tester: TransitionTester,
    pub removed: usize,
    pub failure: Option<LearnError>,
}

impl ParentSearch {
    pub fn new(pgm: &Pgm, node: usize, candidates: Vec<usize>, tester: TransitionTester) -> Self {
        Self {
            node,
            name: pgm.name_of(node),
            candidates,
            cache: SepsetCache::new(node),
            tester,
            removed: 0,
            failure: None,
        }
    }

    /// Runs backward elimination over the candidates in `scope`.
    ///
    /// After every removal the search restarts at the same separating-set
    /// size with the reduced candidate list. A node-local error stops the
    /// search and leaves the candidates as they were at that point.
    pub fn eliminate(&mut self, pgm: &Pgm, scope: CandidateScope) {
        if self.failure.is_some() {
            return;
        }
        if let Err(err) = self.run(pgm, scope) {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                node = %self.name,
                error = %err,
                "parent search abandoned; keeping current candidates"
            );
            self.failure = Some(err);
        }
    }

    fn run(&mut self, pgm: &Pgm, scope: CandidateScope) -> Result<(), LearnError> {
        let mut size = 0;
        loop {
            let pool = self.pool(pgm, scope);
            if size >= pool.len() {
                return Ok(());
            }
            match self.find_removable(pgm, &pool, size)? {
                Some(parent) => {
                    self.candidates.retain(|&c| c != parent);
                    self.removed += 1;
                }
                None => size += 1,
            }
        }
    }

    fn pool(&self, pgm: &Pgm, scope: CandidateScope) -> Vec<usize> {
        match scope {
            CandidateScope::All => self.candidates.clone(),
            CandidateScope::ClassOnly => self
                .candidates
                .iter()
                .copied()
                .filter(|&c| pgm.is_class(c))
                .collect(),
        }
    }

    /// First candidate in `pool` separated from the node by a size-`size`
    /// subset of the other pool members.
    fn find_removable(
        &mut self,
        pgm: &Pgm,
        pool: &[usize],
        size: usize,
    ) -> Result<Option<usize>, LearnError> {
        for &parent in pool {
            let others: Vec<usize> = pool.iter().copied().filter(|&c| c != parent).collect();
            for sepset in combinations(&others, size) {
                if self.separates(pgm, parent, &sepset)? {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        node = %self.name,
                        parent = %pgm.name_of(parent),
                        sepset = ?sepset.as_slice(),
                        "removed candidate parent"
                    );
                    return Ok(Some(parent));
                }
            }
        }
        Ok(None)
    }

    fn separates(&mut self, pgm: &Pgm, parent: usize, sepset: &[usize]) -> Result<bool, LearnError> {
        let sep_key = ParentSetKey::from_indices(sepset.iter().copied());
        let full_key = sep_key.with(parent);
        let separating = self.cache.get_or_fit(pgm, &sep_key)?;
        let with_parent = self.cache.get_or_fit(pgm, &full_key)?;
        self.tester.independent(
            &self.name,
            &separating.fit,
            &separating.configs,
            &with_parent.fit,
            &with_parent.configs,
        )
    }
}

/// Folds finished searches into `report` and returns the candidate matrix
/// with each searched node's column replaced by its remaining candidates.
pub(crate) fn collect_searches(
    searches: &[ParentSearch],
    base: &AdjacencyMatrix,
    report: &mut LearningReport,
) -> AdjacencyMatrix {
    let mut adjacency = base.clone();
    for search in searches {
        for p in 0..adjacency.num_nodes() {
            adjacency.set(p, search.node, search.candidates.binary_search(&p).is_ok());
        }
        report.tests_performed += search.tester.tests_performed();
        report.edges_removed += search.removed;
        report.add_cache_stats(search.cache.stats());
        if let Some(err) = &search.failure {
            report.abandon(&search.name, err);
        }
    }
    adjacency
}

/// Feature indices among `idxs`, rejecting class variables.
pub(crate) fn feature_targets(
    pgm: &Pgm,
    idxs: &[usize],
    algorithm: &str,
) -> Result<Vec<usize>, LearnError> {
    let mut targets = Vec::with_capacity(idxs.len());
    for &idx in idxs {
        if idx >= pgm.num_nodes() {
            return Err(LearnError::Structure(format!(
                "node index {} out of range (model has {} nodes)",
                idx,
                pgm.num_nodes()
            )));
        }
        if pgm.is_class(idx) {
            return Err(LearnError::Structure(format!(
                "{} learns feature parents; '{}' is a class variable",
                algorithm,
                pgm.name_of(idx)
            )));
        }
        targets.push(idx);
    }
    targets.sort_unstable();
    targets.dedup();
    Ok(targets)
}

/// Continuous-time PC.
#[derive(Debug, Clone, Default)]
pub struct Ctpc {
    config: CtpcConfig,
}

impl Ctpc {
    pub fn new(config: CtpcConfig) -> Result<Self, LearnError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CtpcConfig {
        &self.config
    }
}

impl StructureLearning for Ctpc {
    fn identifier(&self) -> &'static str {
        "CTPC"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        self.config.parameters()
    }

    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError> {
        let features = pgm.feature_indices();
        self.learn_nodes(pgm, &features)
    }

    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let tester = self.config.tester()?;
        let targets = feature_targets(pgm, idxs, self.identifier())?;
        let mut report = LearningReport::new(self);

        let model: &Pgm = pgm;
        let complete = AdjacencyMatrix::complete_candidates(&model.class_mask());
        let mut searches: Vec<ParentSearch> = targets
            .iter()
            .map(|&node| ParentSearch::new(model, node, complete.parents_of(node), tester.clone()))
            .collect();

        for_each_parallel(&mut searches, |search| {
            search.eliminate(model, CandidateScope::All)
        });

        let learned = collect_searches(&searches, model.adjacency(), &mut report);
        pgm.set_structure(&targets, &learned)?;
        pgm.learn_parameters(&targets)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            algorithm = self.identifier(),
            nodes = targets.len(),
            tests = report.tests_performed,
            removed = report.edges_removed,
            abandoned = report.abandoned_nodes.len(),
            "structure learning finished"
        );

        Ok(report)
    }
}
