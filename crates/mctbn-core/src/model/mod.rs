//! The graph/model abstraction mutated by the structure-learning algorithms.
//!
//! - **dataset**: sequences of observations the statistics are computed from
//! - **node**: model vertices (discrete class variables, continuous-time features)
//! - **pgm**: node arena plus adjacency matrix, legality checks, parameter learning
//! - **adjacency**: dense `[parent][child]` matrix and graph queries
//! - **parent_set**: canonical parent-set keys and joint-state indexing
//! - **statistics**: sufficient statistics and CPT/CIM estimates

pub mod adjacency;
pub mod dataset;
pub mod node;
pub mod parent_set;
pub mod pgm;
pub mod statistics;

pub use adjacency::AdjacencyMatrix;
pub use dataset::{Dataset, Sequence, Variable};
pub use node::{Node, NodeFactory};
pub use parent_set::{edge_key, ParentConfigurations, ParentList, ParentSetKey};
pub use pgm::{Pgm, StructureSummary};
pub use statistics::{
    CimStatistics, DiscreteStatistics, NodeFit, NodeKind, ParameterPriors, Parameters,
    SufficientStatistics,
};
