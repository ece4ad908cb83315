//! # mctbn - structure learning for MCTBN classifiers
//!
//! Constraint-based structure learning for multi-dimensional continuous-time
//! Bayesian network classifiers (MCTBNCs).
//!
//! ## Architecture
//!
//! - **model**: dataset, nodes, adjacency matrix and the [`Pgm`] tying them
//!   together; sufficient statistics and parameter estimation
//! - **learning**: hypothesis tests, fit caches and the algorithms
//!   (PC, HITON-PC, CTPC, MB-CTPC, Online-MB-CTPC)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mctbn::{Ctpc, Dataset, MctbncLearner, Pc, Pgm, StructureLearning};
//!
//! let dataset: Dataset = load();
//! let mut pgm = Pgm::new(Arc::new(dataset));
//! let learner = MctbncLearner::new(Box::new(Pc::default()), Box::new(Ctpc::default()));
//! let report = learner.learn(&mut pgm)?;
//! println!("{:?}", pgm.structure_summary());
//! ```

#![forbid(unsafe_code)]

pub use mctbn_core::*;
