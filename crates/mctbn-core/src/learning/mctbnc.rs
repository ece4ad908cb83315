//! Learning a complete classifier: class subgraph first, then the feature and
//! bridge subgraphs.

use std::collections::BTreeMap;

use crate::errors::LearnError;
use crate::learning::{LearningReport, StructureLearning};
use crate::model::pgm::Pgm;

/// Runs a class-subgraph algorithm and a feature-subgraph algorithm on the
/// same model.
pub struct MctbncLearner {
    class_subgraph: Box<dyn StructureLearning>,
    feature_subgraph: Box<dyn StructureLearning>,
}

impl MctbncLearner {
    pub fn new(
        class_subgraph: Box<dyn StructureLearning>,
        feature_subgraph: Box<dyn StructureLearning>,
    ) -> Self {
        Self {
            class_subgraph,
            feature_subgraph,
        }
    }

    pub fn class_subgraph(&self) -> &dyn StructureLearning {
        self.class_subgraph.as_ref()
    }

    pub fn feature_subgraph(&self) -> &dyn StructureLearning {
        self.feature_subgraph.as_ref()
    }
}

impl std::fmt::Debug for MctbncLearner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MctbncLearner")
            .field("class_subgraph", &self.class_subgraph.identifier())
            .field("feature_subgraph", &self.feature_subgraph.identifier())
            .finish()
    }
}

impl StructureLearning for MctbncLearner {
    fn identifier(&self) -> &'static str {
        "MCTBNC"
    }

    /// Both algorithms' hyperparameters, prefixed with their identifiers.
    fn parameters(&self) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        for algorithm in [&self.class_subgraph, &self.feature_subgraph] {
            for (name, value) in algorithm.parameters() {
                params.insert(format!("{}.{}", algorithm.identifier(), name), value);
            }
        }
        params
    }

    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError> {
        let mut report = LearningReport::new(self);
        report.merge(self.class_subgraph.learn(pgm)?);
        report.merge(self.feature_subgraph.learn(pgm)?);
        Ok(report)
    }

    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let (classes, features): (Vec<usize>, Vec<usize>) = idxs
            .iter()
            .copied()
            .filter(|&idx| idx < pgm.num_nodes())
            .partition(|&idx| pgm.is_class(idx));
        if let Some(&bad) = idxs.iter().find(|&&idx| idx >= pgm.num_nodes()) {
            return Err(LearnError::Structure(format!(
                "node index {} out of range (model has {} nodes)",
                bad,
                pgm.num_nodes()
            )));
        }

        let mut report = LearningReport::new(self);
        if !classes.is_empty() {
            report.merge(self.class_subgraph.learn_nodes(pgm, &classes)?);
        }
        if !features.is_empty() {
            report.merge(self.feature_subgraph.learn_nodes(pgm, &features)?);
        }
        Ok(report)
    }
}
