//! # HITON-PC
//!
//! Refines the neighbourhood of each target class variable `X`:
//!
//! - rank the other class variables by their chi-squared association with
//!   `X`, discarding those independent of it unconditionally;
//! - admit candidates into the tentative parent-children set `TCP` in that
//!   order, and after every admission evict each member `Y` that some
//!   non-empty subset of `TCP \ {Y}` separates from `X`;
//! - reconcile the model with `TCP`: drop class edges to non-members, add
//!   `Y → X` for new members unless that makes the class subgraph cyclic.
//!
//! Targets are processed one after another against the evolving structure.

use std::collections::BTreeMap;

use crate::errors::LearnError;
use crate::learning::class_tests::ClassIndependence;
use crate::learning::hypothesis::validate_significance;
use crate::learning::pc::class_targets;
use crate::learning::subsets::combinations;
use crate::learning::{format_significance, LearningReport, StructureLearning};
use crate::model::adjacency::AdjacencyMatrix;
use crate::model::pgm::Pgm;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HitonPcConfig {
    pub significance: f64,
}

impl Default for HitonPcConfig {
    fn default() -> Self {
        Self { significance: 0.05 }
    }
}

impl HitonPcConfig {
    pub fn validate(&self) -> Result<(), LearnError> {
        validate_significance("significance", self.significance)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct HitonPc {
    config: HitonPcConfig,
}

impl HitonPc {
    pub fn new(config: HitonPcConfig) -> Result<Self, LearnError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HitonPcConfig {
        &self.config
    }

    /// Tentative parents and children of `x`.
    fn parents_children(
        &self,
        pgm: &Pgm,
        x: usize,
        classes: &[usize],
        ctx: &mut ClassIndependence,
        report: &mut LearningReport,
    ) -> Vec<usize> {
        let mut open: Vec<(usize, f64)> = Vec::new();
        for &y in classes.iter().filter(|&&y| y != x) {
            match ctx.test(pgm, x, y, &[]) {
                Ok(outcome) if !outcome.independent() => open.push((y, outcome.statistic)),
                Ok(_) => report.edges_removed += 1,
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        x = %pgm.name_of(x),
                        y = %pgm.name_of(y),
                        error = %err,
                        "association test failed; candidate skipped"
                    );
                    report.abandon(&pgm.name_of(x), &err);
                }
            }
        }
        open.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut tcp: Vec<usize> = Vec::new();
        for (candidate, _) in open {
            tcp.push(candidate);
            let members = tcp.clone();
            for y in members {
                let rest: Vec<usize> = tcp.iter().copied().filter(|&m| m != y).collect();
                if self.separated(pgm, x, y, &rest, ctx, report) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        x = %pgm.name_of(x),
                        y = %pgm.name_of(y),
                        "evicted from parents-children set"
                    );
                    tcp.retain(|&m| m != y);
                    report.edges_removed += 1;
                }
            }
        }
        tcp
    }

    /// Whether some non-empty subset of `rest` separates `x` and `y`.
    ///
    /// A failing test counts as "not separated".
    fn separated(
        &self,
        pgm: &Pgm,
        x: usize,
        y: usize,
        rest: &[usize],
        ctx: &mut ClassIndependence,
        report: &mut LearningReport,
    ) -> bool {
        for size in 1..=rest.len() {
            for sepset in combinations(rest, size) {
                match ctx.test(pgm, x, y, &sepset) {
                    Ok(outcome) if outcome.independent() => return true,
                    Ok(_) => {}
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            x = %pgm.name_of(x),
                            y = %pgm.name_of(y),
                            error = %err,
                            "independence test failed"
                        );
                        report.abandon(&pgm.name_of(x), &err);
                    }
                }
            }
        }
        false
    }
}

/// Aligns the class edges of `x` with `tcp`.
fn reconcile(
    pgm: &Pgm,
    adjacency: &mut AdjacencyMatrix,
    x: usize,
    tcp: &[usize],
    classes: &[usize],
) {
    for &y in classes.iter().filter(|&&y| y != x) {
        let member = tcp.contains(&y);
        if !member && adjacency.adjacent(x, y) {
            adjacency.remove_edge(x, y);
            adjacency.remove_edge(y, x);
        } else if member && !adjacency.adjacent(x, y) {
            let mut tentative = adjacency.clone();
            tentative.add_edge(y, x);
            if pgm.is_structure_legal(&tentative) {
                *adjacency = tentative;
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    parent = %pgm.name_of(y),
                    child = %pgm.name_of(x),
                    "skipped edge that would create a cycle"
                );
            }
        }
    }
}

impl StructureLearning for HitonPc {
    fn identifier(&self) -> &'static str {
        "HITON-PC"
    }

    fn parameters(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            "significance".to_string(),
            format_significance(self.config.significance),
        )])
    }

    fn learn(&self, pgm: &mut Pgm) -> Result<LearningReport, LearnError> {
        let classes = pgm.class_indices();
        self.learn_nodes(pgm, &classes)
    }

    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let mut ctx = ClassIndependence::new(self.config.significance)?;
        let targets = class_targets(pgm, idxs, self.identifier())?;
        let classes = pgm.class_indices();
        let mut report = LearningReport::new(self);

        let mut adjacency = pgm.adjacency().clone();
        for &x in &targets {
            let tcp = self.parents_children(pgm, x, &classes, &mut ctx, &mut report);
            reconcile(pgm, &mut adjacency, x, &tcp, &classes);
        }

        pgm.set_structure(&classes, &adjacency)?;
        pgm.learn_parameters(&classes)?;

        report.tests_performed = ctx.tests_performed();
        report.add_cache_stats(ctx.cache_stats());

        #[cfg(feature = "tracing")]
        tracing::info!(
            algorithm = self.identifier(),
            nodes = targets.len(),
            tests = report.tests_performed,
            edges = pgm.structure_summary().class_edges,
            "structure learning finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dataset::{Dataset, Sequence, Variable};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn noisy(rng: &mut StdRng, value: usize, keep: f64) -> usize {
        if rng.gen_bool(keep) {
            value
        } else {
            1 - value
        }
    }

    fn pgm(rows: Vec<Vec<usize>>) -> Pgm {
        let variables = ["A", "B", "C"]
            .iter()
            .map(|n| Variable::class(*n, 2))
            .collect();
        let sequences = rows
            .into_iter()
            .map(|r| Sequence::new(vec![0.0], vec![r]))
            .collect();
        Pgm::new(Arc::new(Dataset::new(variables, sequences).unwrap()))
    }

    fn strict() -> HitonPc {
        HitonPc::new(HitonPcConfig { significance: 0.01 }).unwrap()
    }

    #[test]
    fn config_validation() {
        assert!(HitonPc::new(HitonPcConfig { significance: -0.5 }).is_err());
        assert_eq!(HitonPc::default().identifier(), "HITON-PC");
        assert_eq!(HitonPc::default().parameters().len(), 1);
    }

    #[test]
    fn chain_endpoint_is_evicted() {
        let mut rng = StdRng::seed_from_u64(17);
        let rows = (0..2000)
            .map(|_| {
                let a = rng.gen_range(0..2);
                let b = noisy(&mut rng, a, 0.9);
                let c = noisy(&mut rng, b, 0.9);
                vec![a, b, c]
            })
            .collect();
        let mut pgm = pgm(rows);
        let report = strict().learn(&mut pgm).unwrap();

        let adj = pgm.adjacency();
        assert!(adj.adjacent(0, 1));
        assert!(adj.adjacent(1, 2));
        assert!(!adj.adjacent(0, 2));
        assert!(adj.is_acyclic());
        assert!(report.edges_removed >= 1);
    }

    #[test]
    fn cyclic_additions_are_skipped() {
        // Three noisy copies of a hidden coin: every pair stays dependent.
        let mut rng = StdRng::seed_from_u64(5);
        let rows = (0..2000)
            .map(|_| {
                let h = rng.gen_range(0..2);
                vec![
                    noisy(&mut rng, h, 0.9),
                    noisy(&mut rng, h, 0.9),
                    noisy(&mut rng, h, 0.9),
                ]
            })
            .collect();
        let mut pgm = pgm(rows);
        let mut seeded = AdjacencyMatrix::new(3);
        seeded.add_edge(0, 1);
        seeded.add_edge(1, 2);
        pgm.set_adjacency(seeded).unwrap();

        strict().learn_node(&mut pgm, 0).unwrap();

        let adj = pgm.adjacency();
        assert!(adj.has_edge(0, 1));
        assert!(adj.has_edge(1, 2));
        assert!(!adj.adjacent(0, 2), "C -> A would close A -> B -> C");
        assert!(adj.is_acyclic());
    }

    #[test]
    fn independent_variables_stay_disconnected() {
        let mut rng = StdRng::seed_from_u64(2);
        let rows = (0..500)
            .map(|_| vec![rng.gen_range(0..2), rng.gen_range(0..2), rng.gen_range(0..2)])
            .collect();
        let mut pgm = pgm(rows);
        let mut seeded = AdjacencyMatrix::new(3);
        seeded.add_edge(1, 0);
        pgm.set_adjacency(seeded).unwrap();

        HitonPc::new(HitonPcConfig { significance: 0.001 })
            .unwrap()
            .learn_node(&mut pgm, 0)
            .unwrap();
        assert!(!pgm.adjacency().adjacent(0, 1));
        assert!(!pgm.adjacency().adjacent(0, 2));
    }
}
