//! Model nodes.
//!
//! A [`Node`] carries identity, cardinality and the statistics/parameters
//! cached for its *current* parent set. Parents and children are not stored on
//! the node: they are views of the owning [`Pgm`](crate::model::Pgm)'s
//! adjacency matrix, and any change to the node's parent set clears the cache.

use crate::model::dataset::Dataset;
use crate::model::statistics::{NodeKind, Parameters, SufficientStatistics};

#[derive(Debug, Clone)]
pub struct Node {
    index: usize,
    name: String,
    is_class: bool,
    kind: NodeKind,
    states: Vec<String>,
    statistics: Option<SufficientStatistics>,
    parameters: Option<Parameters>,
}

impl Node {
    pub fn new(index: usize, name: impl Into<String>, is_class: bool, states: Vec<String>) -> Self {
        let kind = if is_class {
            NodeKind::Discrete
        } else {
            NodeKind::ContinuousTime
        };
        Self {
            index,
            name: name.into(),
            is_class,
            kind,
            states,
            statistics: None,
            parameters: None,
        }
    }

    /// Position of the node in its model (and of its column in the dataset).
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_class_variable(&self) -> bool {
        self.is_class
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn state_names(&self) -> &[String] {
        &self.states
    }

    /// State index of this node in an observation row.
    #[inline]
    pub fn current_state(&self, row: &[usize]) -> usize {
        row[self.index]
    }

    /// Statistics for the current parent set, if computed since the last
    /// structure change.
    pub fn sufficient_statistics(&self) -> Option<&SufficientStatistics> {
        self.statistics.as_ref()
    }

    /// Parameters for the current parent set, if learned since the last
    /// structure change.
    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub(crate) fn set_statistics(&mut self, statistics: SufficientStatistics) {
        self.statistics = Some(statistics);
        self.parameters = None;
    }

    pub(crate) fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = Some(parameters);
    }

    pub(crate) fn invalidate(&mut self) {
        self.statistics = None;
        self.parameters = None;
    }
}

/// Builds model nodes from the variables of a dataset.
///
/// Class variables become discrete nodes; features become continuous-time
/// nodes. Node `i` corresponds to dataset variable `i`.
pub struct NodeFactory;

impl NodeFactory {
    pub fn from_dataset(dataset: &Dataset) -> Vec<Node> {
        dataset
            .variables()
            .iter()
            .enumerate()
            .map(|(i, var)| Node::new(i, var.name.clone(), var.is_class, var.states.clone()))
            .collect()
    }
}
