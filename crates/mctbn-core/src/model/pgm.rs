//! # Probabilistic graphical model
//!
//! [`Pgm`] owns the nodes of a multi-dimensional continuous-time Bayesian
//! network classifier, the adjacency matrix describing its structure, and a
//! shared reference to the training dataset.
//!
//! ## Structural rules
//!
//! A structure is legal when:
//! - the matrix matches the number of nodes,
//! - no feature is a parent of a class variable,
//! - the class subgraph is acyclic.
//!
//! The feature and bridge subgraphs may contain cycles; continuous-time nodes
//! can influence each other in both directions.

use std::sync::Arc;

use crate::errors::LearnError;
use crate::model::adjacency::AdjacencyMatrix;
use crate::model::dataset::Dataset;
use crate::model::node::{Node, NodeFactory};
use crate::model::parent_set::ParentConfigurations;
use crate::model::statistics::{NodeFit, ParameterPriors, Parameters, SufficientStatistics};

/// Edge counts per subgraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructureSummary {
    /// Class variable -> class variable.
    pub class_edges: usize,
    /// Class variable -> feature.
    pub bridge_edges: usize,
    /// Feature -> feature.
    pub feature_edges: usize,
}

/// A model bound to a dataset, with an explicit adjacency matrix.
#[derive(Debug, Clone)]
pub struct Pgm {
    dataset: Arc<Dataset>,
    nodes: Vec<Node>,
    adjacency: AdjacencyMatrix,
    priors: ParameterPriors,
}

impl Pgm {
    /// Builds an edgeless model with one node per dataset variable.
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let nodes = NodeFactory::from_dataset(&dataset);
        let adjacency = AdjacencyMatrix::new(nodes.len());
        Self {
            dataset,
            nodes,
            adjacency,
            priors: ParameterPriors::default(),
        }
    }

    /// Sets the imaginary counts used by parameter learning and by the
    /// statistics fitted during structure learning.
    pub fn with_priors(mut self, priors: ParameterPriors) -> Result<Self, LearnError> {
        self.priors = priors.validate()?;
        for node in &mut self.nodes {
            node.invalidate();
        }
        Ok(self)
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn priors(&self) -> &ParameterPriors {
        &self.priors
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.index_of(name).and_then(|idx| self.nodes.get(idx))
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.dataset.index_of(name)
    }

    /// Node names indexed by node index.
    pub fn names_by_index(&self) -> Vec<&str> {
        self.nodes.iter().map(Node::name).collect()
    }

    /// Name of node `idx`, or `"#idx"` for an unknown index (used in logs).
    pub fn name_of(&self, idx: usize) -> String {
        self.nodes
            .get(idx)
            .map(|n| n.name().to_string())
            .unwrap_or_else(|| format!("#{}", idx))
    }

    pub fn is_class(&self, idx: usize) -> bool {
        self.nodes.get(idx).map(Node::is_class_variable).unwrap_or(false)
    }

    pub fn class_indices(&self) -> Vec<usize> {
        self.dataset.class_indices()
    }

    pub fn feature_indices(&self) -> Vec<usize> {
        self.dataset.feature_indices()
    }

    /// `is_class` flag of every node, indexed by node index.
    pub fn class_mask(&self) -> Vec<bool> {
        self.nodes.iter().map(Node::is_class_variable).collect()
    }

    pub fn adjacency(&self) -> &AdjacencyMatrix {
        &self.adjacency
    }

    pub fn parents_of(&self, idx: usize) -> Vec<usize> {
        self.adjacency.parents_of(idx)
    }

    pub fn children_of(&self, idx: usize) -> Vec<usize> {
        self.adjacency.children_of(idx)
    }

    /// Number of joint states of the current parents of `idx`.
    pub fn num_states_parents(&self, idx: usize) -> Result<usize, LearnError> {
        Ok(self.parent_configurations(&self.parents_of(idx))?.len())
    }

    /// Joint-state indexing for an arbitrary sorted parent list.
    pub fn parent_configurations(&self, parents: &[usize]) -> Result<ParentConfigurations, LearnError> {
        ParentConfigurations::new(parents, self.dataset.cardinalities())
    }

    /// Explains why `adjacency` is not a legal structure for this model.
    pub fn check_structure(&self, adjacency: &AdjacencyMatrix) -> Result<(), LearnError> {
        if adjacency.num_nodes() != self.nodes.len() {
            return Err(LearnError::Structure(format!(
                "adjacency matrix has {} nodes, model has {}",
                adjacency.num_nodes(),
                self.nodes.len()
            )));
        }

        let classes = self.class_indices();
        for &class in &classes {
            if let Some(feature) = adjacency
                .parents_of(class)
                .into_iter()
                .find(|&p| !self.is_class(p))
            {
                return Err(LearnError::Structure(format!(
                    "feature '{}' cannot be a parent of class variable '{}'",
                    self.name_of(feature),
                    self.name_of(class)
                )));
            }
        }

        if !adjacency.is_acyclic_among(&classes) {
            return Err(LearnError::Structure(
                "class subgraph must be acyclic".into(),
            ));
        }

        Ok(())
    }

    pub fn is_structure_legal(&self, adjacency: &AdjacencyMatrix) -> bool {
        self.check_structure(adjacency).is_ok()
    }

    /// Replaces the whole structure.
    pub fn set_adjacency(&mut self, adjacency: AdjacencyMatrix) -> Result<(), LearnError> {
        let all: Vec<usize> = (0..self.nodes.len()).collect();
        self.set_structure(&all, &adjacency)
    }

    /// Takes the parent sets of `node_indices` from `adjacency`, leaving every
    /// other node's parents untouched.
    ///
    /// The resulting structure must be legal. Nodes whose parent set changed
    /// lose their cached statistics and parameters.
    pub fn set_structure(
        &mut self,
        node_indices: &[usize],
        adjacency: &AdjacencyMatrix,
    ) -> Result<(), LearnError> {
        if adjacency.num_nodes() != self.nodes.len() {
            return Err(LearnError::Structure(format!(
                "adjacency matrix has {} nodes, model has {}",
                adjacency.num_nodes(),
                self.nodes.len()
            )));
        }
        self.check_indices(node_indices)?;

        let mut updated = self.adjacency.clone();
        for &idx in node_indices {
            updated.copy_parents_from(adjacency, idx);
        }
        self.check_structure(&updated)?;

        for &idx in node_indices {
            if updated.parents_of(idx) != self.adjacency.parents_of(idx) {
                self.nodes[idx].invalidate();
            }
        }
        self.adjacency = updated;
        Ok(())
    }

    /// Computes statistics of `node_indices` for their current parent sets.
    pub fn compute_sufficient_statistics(&mut self, node_indices: &[usize]) -> Result<(), LearnError> {
        self.check_indices(node_indices)?;
        for &idx in node_indices {
            let configs = self.parent_configurations(&self.parents_of(idx))?;
            let stats =
                SufficientStatistics::compute(&self.dataset, idx, self.nodes[idx].kind(), &configs);
            self.nodes[idx].set_statistics(stats);
        }
        Ok(())
    }

    /// Estimates parameters of `node_indices`, computing their statistics
    /// first where the cache is stale.
    pub fn learn_parameters(&mut self, node_indices: &[usize]) -> Result<(), LearnError> {
        self.check_indices(node_indices)?;
        let stale: Vec<usize> = node_indices
            .iter()
            .copied()
            .filter(|&idx| self.nodes[idx].sufficient_statistics().is_none())
            .collect();
        self.compute_sufficient_statistics(&stale)?;

        for &idx in node_indices {
            let stats = self.nodes[idx].sufficient_statistics().ok_or_else(|| {
                LearnError::Internal(format!("missing statistics for '{}'", self.name_of(idx)))
            })?;
            let params = Parameters::estimate(stats, &self.priors);
            self.nodes[idx].set_parameters(params);
        }
        Ok(())
    }

    /// Fits node `idx` against an arbitrary parent set without touching the
    /// model. `parents` must be sorted.
    pub fn fit_with_parents(&self, idx: usize, parents: &[usize]) -> Result<NodeFit, LearnError> {
        self.check_indices(&[idx])?;
        let configs = self.parent_configurations(parents)?;
        Ok(NodeFit::compute(
            &self.dataset,
            idx,
            self.nodes[idx].kind(),
            &configs,
            &self.priors,
        ))
    }

    pub fn structure_summary(&self) -> StructureSummary {
        let mut summary = StructureSummary::default();
        for p in 0..self.nodes.len() {
            for c in self.adjacency.children_of(p) {
                match (self.is_class(p), self.is_class(c)) {
                    (true, true) => summary.class_edges += 1,
                    (true, false) => summary.bridge_edges += 1,
                    _ => summary.feature_edges += 1,
                }
            }
        }
        summary
    }

    fn check_indices(&self, node_indices: &[usize]) -> Result<(), LearnError> {
        match node_indices.iter().find(|&&idx| idx >= self.nodes.len()) {
            Some(idx) => Err(LearnError::Structure(format!(
                "node index {} out of range (model has {} nodes)",
                idx,
                self.nodes.len()
            ))),
            None => Ok(()),
        }
    }
}
