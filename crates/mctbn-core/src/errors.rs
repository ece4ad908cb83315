//! Error types for model construction and structure learning.

use thiserror::Error;

/// Errors that can occur while building a model or learning its structure.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// without breaking downstream matches.
///
/// Only [`LearnError::Configuration`] aborts a whole `learn` call. Degenerate
/// statistics raised inside a node's parent search are caught by the
/// algorithms, logged, and reported through
/// [`LearningReport::abandoned_nodes`](crate::learning::LearningReport).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LearnError {
    /// Invalid hyperparameter (e.g. a significance level outside [0, 1]).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A hypothesis test had no degrees of freedom to work with.
    ///
    /// Raised when the training data holds no transitions (or no samples) for
    /// some state combination of the tested variable.
    #[error("degrees of freedom error for '{variable}': {detail}")]
    DegreesOfFreedom { variable: String, detail: String },

    /// Malformed dataset (ragged rows, out-of-range states, unordered times).
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Structure rejected by the model (cycle in the class subgraph, class
    /// variable with a feature parent, self loop, wrong dimensions).
    #[error("structure error: {0}")]
    Structure(String),

    /// Statistical distribution could not be built or evaluated.
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Internal error (programmer error, not user error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl LearnError {
    pub(crate) fn degrees_of_freedom(variable: &str, detail: impl Into<String>) -> Self {
        LearnError::DegreesOfFreedom {
            variable: variable.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether this error only invalidates the current node's search.
    ///
    /// Such errors are contained by the algorithms instead of aborting `learn`.
    pub fn is_node_local(&self) -> bool {
        matches!(
            self,
            LearnError::DegreesOfFreedom { .. } | LearnError::Numerical(_)
        )
    }
}
