//! # mctbn core
//!
//! Constraint-based structure learning for multi-dimensional continuous-time
//! Bayesian network classifiers.
//!
//! A classifier has static class variables, whose dependencies form a DAG
//! learned with PC or HITON-PC, and continuous-time features, whose parents
//! are learned with CTPC or one of its Markov-blanket variants.

#![forbid(unsafe_code)]

pub mod errors;
pub mod learning;
pub mod model;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types
pub use errors::LearnError;
pub use learning::{
    Ctpc, CtpcConfig, HitonPc, HitonPcConfig, LearningReport, MbCtpc, MctbncLearner,
    OnlineMbCtpc, Pc, PcConfig, StructureLearning,
};
pub use model::{AdjacencyMatrix, Dataset, ParameterPriors, Pgm, Sequence, StructureSummary, Variable};
