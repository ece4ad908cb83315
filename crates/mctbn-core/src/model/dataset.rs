//! Minimal sequence dataset consumed by the learning algorithms.
//!
//! A dataset is a list of [`Variable`]s and a list of [`Sequence`]s. Each
//! sequence is a trajectory: a strictly increasing list of observation times,
//! and for every time point one state index per variable. Class variables are
//! static, so their column must be constant within a sequence.
//!
//! Parsing files into this shape is the caller's job; with the `serde` feature
//! the types derive `Serialize`/`Deserialize` so a JSON document can be fed to
//! [`Dataset::new`] directly.

use rustc_hash::FxHashMap;

use crate::errors::LearnError;

/// A variable of the model: a class variable or a feature.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Variable {
    /// Unique name within the dataset.
    pub name: String,
    /// Names of the possible states, indexed by state index.
    pub states: Vec<String>,
    /// Whether this is a (static, discrete) class variable.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_class: bool,
}

impl Variable {
    /// A class variable whose states are named `"0"..num_states`.
    pub fn class(name: impl Into<String>, num_states: usize) -> Self {
        Self {
            name: name.into(),
            states: numbered_states(num_states),
            is_class: true,
        }
    }

    /// A feature variable whose states are named `"0"..num_states`.
    pub fn feature(name: impl Into<String>, num_states: usize) -> Self {
        Self {
            name: name.into(),
            states: numbered_states(num_states),
            is_class: false,
        }
    }

    /// Number of possible states.
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }
}

fn numbered_states(num_states: usize) -> Vec<String> {
    (0..num_states).map(|s| s.to_string()).collect()
}

/// One observed trajectory.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    /// Observation times, strictly increasing.
    pub times: Vec<f64>,
    /// `observations[t][v]` is the state index of variable `v` at `times[t]`.
    pub observations: Vec<Vec<usize>>,
}

impl Sequence {
    pub fn new(times: Vec<f64>, observations: Vec<Vec<usize>>) -> Self {
        Self {
            times,
            observations,
        }
    }

    /// Number of time points.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// A validated collection of sequences over a fixed set of variables.
#[derive(Debug, Clone)]
pub struct Dataset {
    variables: Vec<Variable>,
    sequences: Vec<Sequence>,
    cardinalities: Vec<usize>,
    index_by_name: FxHashMap<String, usize>,
}

impl Dataset {
    /// Builds a dataset, checking every structural invariant up front so the
    /// statistics code can index without bounds surprises.
    pub fn new(variables: Vec<Variable>, sequences: Vec<Sequence>) -> Result<Self, LearnError> {
        if variables.is_empty() {
            return Err(LearnError::Dataset("dataset has no variables".into()));
        }

        let mut index_by_name = FxHashMap::default();
        for (idx, var) in variables.iter().enumerate() {
            if var.states.is_empty() {
                return Err(LearnError::Dataset(format!(
                    "variable '{}' has no states",
                    var.name
                )));
            }
            if index_by_name.insert(var.name.clone(), idx).is_some() {
                return Err(LearnError::Dataset(format!(
                    "duplicate variable name '{}'",
                    var.name
                )));
            }
        }

        let cardinalities: Vec<usize> = variables.iter().map(Variable::cardinality).collect();
        for (seq_idx, seq) in sequences.iter().enumerate() {
            validate_sequence(seq_idx, seq, &variables, &cardinalities)?;
        }

        Ok(Self {
            variables,
            sequences,
            cardinalities,
            index_by_name,
        })
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, idx: usize) -> Option<&Variable> {
        self.variables.get(idx)
    }

    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_sequences(&self) -> usize {
        self.sequences.len()
    }

    /// Cardinality of every variable, indexed like [`Dataset::variables`].
    pub fn cardinalities(&self) -> &[usize] {
        &self.cardinalities
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    /// Indices of the class variables in ascending order.
    pub fn class_indices(&self) -> Vec<usize> {
        (0..self.variables.len())
            .filter(|&i| self.variables[i].is_class)
            .collect()
    }

    /// Indices of the feature variables in ascending order.
    pub fn feature_indices(&self) -> Vec<usize> {
        (0..self.variables.len())
            .filter(|&i| !self.variables[i].is_class)
            .collect()
    }
}

fn validate_sequence(
    seq_idx: usize,
    seq: &Sequence,
    variables: &[Variable],
    cardinalities: &[usize],
) -> Result<(), LearnError> {
    if seq.times.is_empty() {
        return Err(LearnError::Dataset(format!("sequence {} is empty", seq_idx)));
    }
    if seq.times.len() != seq.observations.len() {
        return Err(LearnError::Dataset(format!(
            "sequence {} has {} times but {} observation rows",
            seq_idx,
            seq.times.len(),
            seq.observations.len()
        )));
    }

    for window in seq.times.windows(2) {
        if !window[0].is_finite() || !window[1].is_finite() || window[1] <= window[0] {
            return Err(LearnError::Dataset(format!(
                "sequence {} times must be finite and strictly increasing",
                seq_idx
            )));
        }
    }

    let first = &seq.observations[0];
    for (t, row) in seq.observations.iter().enumerate() {
        if row.len() != variables.len() {
            return Err(LearnError::Dataset(format!(
                "sequence {} row {} has {} values, expected {}",
                seq_idx,
                t,
                row.len(),
                variables.len()
            )));
        }
        for (v, &state) in row.iter().enumerate() {
            if state >= cardinalities[v] {
                return Err(LearnError::Dataset(format!(
                    "sequence {} row {}: state {} out of range for '{}'",
                    seq_idx, t, state, variables[v].name
                )));
            }
            if variables[v].is_class && state != first[v] {
                return Err(LearnError::Dataset(format!(
                    "sequence {}: class variable '{}' changes within the sequence",
                    seq_idx, variables[v].name
                )));
            }
        }
    }

    Ok(())
}
