//! # PC
//!
//! Learns the class subgraph, a DAG over the class variables.
//!
//! 1. **Skeleton.** Start from the complete undirected graph. For separating
//!    sets of growing size `l`, drop the edge `X - Y` as soon as some size-`l`
//!    subset of `adj(X) \ {Y}` makes X and Y independent, and remember that
//!    subset.
//! 2. **Colliders.** For every unshielded triple `X - Y - Z` whose recorded
//!    separating set lacks `Y`, orient `X → Y ← Z`.
//! 3. **Propagation.** Repeatedly apply:
//!    - R1: `C → A - B`, C and B not adjacent: orient `A → B`,
//!    - R2: `A → C → B` and `A - B`: orient `A → B`,
//!    - R3: `A - C → B`, `A - D → B`, C and D not adjacent: orient `A → B`.
//!
//!    When nothing changes and undirected edges remain, orient one of them
//!    in a direction that creates no cycle and continue.
//!
//! No orientation that would close a directed cycle is ever applied, so the
//! result is a DAG.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::errors::LearnError;
use crate::learning::class_tests::ClassIndependence;
use crate::learning::hypothesis::validate_significance;
use crate::learning::subsets::combinations;
use crate::learning::{format_significance, LearningReport, StructureLearning};
use crate::model::adjacency::AdjacencyMatrix;
use crate::model::parent_set::{edge_key, ParentList};
use crate::model::pgm::Pgm;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PcConfig {
    /// Level of the chi-squared independence tests.
    pub significance: f64,
}

impl Default for PcConfig {
    fn default() -> Self {
        Self { significance: 0.05 }
    }
}

impl PcConfig {
    pub fn validate(&self) -> Result<(), LearnError> {
        validate_significance("significance", self.significance)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pc {
    config: PcConfig,
}

impl Pc {
    pub fn new(config: PcConfig) -> Result<Self, LearnError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PcConfig {
        &self.config
    }
}

impl StructureLearning for Pc {
    fn identifier(&self) -> &'static str {
        "PC"
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

    /// Runs PC over the class variables `idxs`.
    ///
    /// Edges among `idxs` are replaced by the learned DAG; edges between them
    /// and other class variables are kept and constrain the orientation, so
    /// the merged class subgraph stays acyclic.
    fn learn_nodes(&self, pgm: &mut Pgm, idxs: &[usize]) -> Result<LearningReport, LearnError> {
        let mut ctx = ClassIndependence::new(self.config.significance)?;
        let nodes = class_targets(pgm, idxs, self.identifier())?;
        let mut report = LearningReport::new(self);

        let mut graph = PartiallyDirected::complete(pgm.num_nodes(), &nodes)
            .with_kept_edges(pgm.adjacency(), &pgm.class_indices());
        let sepsets = skeleton(pgm, &nodes, &mut graph, &mut ctx, &mut report);
        orient_colliders(&nodes, &mut graph, &sepsets);
        propagate(&nodes, &mut graph);

        let mut learned = pgm.adjacency().clone();
        for &child in &nodes {
            for &parent in &nodes {
                learned.set(parent, child, graph.is_directed(parent, child));
            }
        }
        pgm.set_structure(&nodes, &learned)?;
        pgm.learn_parameters(&nodes)?;

        report.tests_performed = ctx.tests_performed();
        report.add_cache_stats(ctx.cache_stats());

        #[cfg(feature = "tracing")]
        tracing::info!(
            algorithm = self.identifier(),
            nodes = nodes.len(),
            tests = report.tests_performed,
            removed = report.edges_removed,
            edges = pgm.structure_summary().class_edges,
            "structure learning finished"
        );

        Ok(report)
    }
}

/// Class-variable indices among `idxs`, rejecting features.
pub(crate) fn class_targets(
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
        if !pgm.is_class(idx) {
            return Err(LearnError::Structure(format!(
                "{} learns the class subgraph; '{}' is a feature",
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

/// Graph with directed and undirected edges.
///
/// An undirected edge `a - b` is stored as both `a → b` and `b → a`.
/// Cycle checks walk every node in `reach`, which may include class
/// variables outside the ones being learned.
#[derive(Debug, Clone)]
struct PartiallyDirected {
    edges: AdjacencyMatrix,
    reach: Vec<usize>,
}

impl PartiallyDirected {
    fn complete(n: usize, nodes: &[usize]) -> Self {
        let mut edges = AdjacencyMatrix::new(n);
        for &a in nodes {
            for &b in nodes {
                edges.set(a, b, true);
            }
        }
        Self {
            edges,
            reach: nodes.to_vec(),
        }
    }

    /// Adds the directed edges of `current` that touch a node in `classes`
    /// outside the complete part. Those edges are never reoriented.
    fn with_kept_edges(mut self, current: &AdjacencyMatrix, classes: &[usize]) -> Self {
        let learned = self.reach.clone();
        for &parent in classes {
            for &child in classes {
                let replaced = learned.contains(&parent) && learned.contains(&child);
                if !replaced && current.has_edge(parent, child) {
                    self.edges.add_edge(parent, child);
                }
            }
        }
        self.reach = classes.to_vec();
        self
    }

    fn adjacent(&self, a: usize, b: usize) -> bool {
        self.edges.adjacent(a, b)
    }

    fn is_undirected(&self, a: usize, b: usize) -> bool {
        self.edges.has_edge(a, b) && self.edges.has_edge(b, a)
    }

    fn is_directed(&self, a: usize, b: usize) -> bool {
        self.edges.has_edge(a, b) && !self.edges.has_edge(b, a)
    }

    fn neighbours(&self, a: usize, nodes: &[usize]) -> Vec<usize> {
        nodes
            .iter()
            .copied()
            .filter(|&b| b != a && self.adjacent(a, b))
            .collect()
    }

    fn remove(&mut self, a: usize, b: usize) {
        self.edges.remove_edge(a, b);
        self.edges.remove_edge(b, a);
    }

    /// Whether `from ⇝ to` along directed edges only.
    fn directed_path(&self, from: usize, to: usize) -> bool {
        let mut seen = vec![false; self.edges.num_nodes()];
        let mut stack = vec![from];
        seen[from] = true;
        while let Some(node) = stack.pop() {
            if node == to {
                return true;
            }
            for &next in &self.reach {
                if !seen[next] && self.is_directed(node, next) {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
        false
    }

    /// Turns `a - b` into `a → b` unless that closes a directed cycle.
    fn orient(&mut self, a: usize, b: usize) -> bool {
        if !self.is_undirected(a, b) || self.directed_path(b, a) {
            return false;
        }
        self.edges.remove_edge(b, a);
        true
    }
}

fn skeleton(
    pgm: &Pgm,
    nodes: &[usize],
    graph: &mut PartiallyDirected,
    ctx: &mut ClassIndependence,
    report: &mut LearningReport,
) -> FxHashMap<u64, ParentList> {
    let mut sepsets = FxHashMap::default();
    let mut size = 0;
    while nodes
        .iter()
        .any(|&x| graph.neighbours(x, nodes).len() > size)
    {
        for &x in nodes {
            for y in graph.neighbours(x, nodes) {
                if !graph.adjacent(x, y) {
                    continue;
                }
                let others: Vec<usize> = graph
                    .neighbours(x, nodes)
                    .into_iter()
                    .filter(|&n| n != y)
                    .collect();
                if others.len() < size {
                    continue;
                }
                for sepset in combinations(&others, size) {
                    match ctx.test(pgm, x, y, &sepset) {
                        Ok(outcome) if outcome.independent() => {
                            #[cfg(feature = "tracing")]
                            tracing::debug!(
                                x = %pgm.name_of(x),
                                y = %pgm.name_of(y),
                                sepset = ?sepset.as_slice(),
                                statistic = outcome.statistic,
                                "removed class edge"
                            );
                            graph.remove(x, y);
                            sepsets.insert(edge_key(x, y), sepset);
                            report.edges_removed += 1;
                            break;
                        }
                        Ok(_) => {}
                        Err(err) => {
                            #[cfg(feature = "tracing")]
                            tracing::warn!(
                                x = %pgm.name_of(x),
                                y = %pgm.name_of(y),
                                error = %err,
                                "independence test failed; keeping edge"
                            );
                            report.abandon(&pgm.name_of(x), &err);
                            break;
                        }
                    }
                }
            }
        }
        size += 1;
    }
    sepsets
}

fn orient_colliders(
    nodes: &[usize],
    graph: &mut PartiallyDirected,
    sepsets: &FxHashMap<u64, ParentList>,
) {
    for &y in nodes {
        let neighbours = graph.neighbours(y, nodes);
        for (i, &x) in neighbours.iter().enumerate() {
            for &z in &neighbours[i + 1..] {
                if graph.adjacent(x, z) {
                    continue;
                }
                let Some(sepset) = sepsets.get(&edge_key(x, z)) else {
                    continue;
                };
                if sepset.contains(&y) {
                    continue;
                }
                // Both halves must still be orientable towards y.
                if graph.edges.has_edge(x, y) && graph.edges.has_edge(z, y) {
                    graph.orient(x, y);
                    graph.orient(z, y);
                }
            }
        }
    }
}

fn propagate(nodes: &[usize], graph: &mut PartiallyDirected) {
    loop {
        let mut changed = false;
        for &a in nodes {
            for &b in nodes {
                if a == b || !graph.is_undirected(a, b) {
                    continue;
                }
                if implied(nodes, graph, a, b) && graph.orient(a, b) {
                    changed = true;
                }
            }
        }
        if changed {
            continue;
        }

        let undirected = nodes.iter().find_map(|&a| {
            nodes
                .iter()
                .find(|&&b| a < b && graph.is_undirected(a, b))
                .map(|&b| (a, b))
        });
        match undirected {
            Some((a, b)) => {
                if !graph.orient(a, b) {
                    graph.orient(b, a);
                }
            }
            None => return,
        }
    }
}

/// Whether one of the three propagation rules forces `a → b`.
fn implied(nodes: &[usize], graph: &PartiallyDirected, a: usize, b: usize) -> bool {
    let r1 = nodes
        .iter()
        .any(|&c| c != b && graph.is_directed(c, a) && !graph.adjacent(c, b));
    if r1 {
        return true;
    }

    let r2 = nodes
        .iter()
        .any(|&c| graph.is_directed(a, c) && graph.is_directed(c, b));
    if r2 {
        return true;
    }

    let feeders: Vec<usize> = nodes
        .iter()
        .copied()
        .filter(|&c| graph.is_undirected(a, c) && graph.is_directed(c, b))
        .collect();
    feeders.iter().enumerate().any(|(i, &c)| {
        feeders[i + 1..]
            .iter()
            .any(|&d| !graph.adjacent(c, d))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::dataset::{Dataset, Sequence, Variable};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;

    fn class_pgm(names: &[&str], rows: Vec<Vec<usize>>) -> Pgm {
        let variables = names.iter().map(|n| Variable::class(*n, 2)).collect();
        let sequences = rows
            .into_iter()
            .map(|r| Sequence::new(vec![0.0], vec![r]))
            .collect();
        Pgm::new(Arc::new(Dataset::new(variables, sequences).unwrap()))
    }

    /// A and B are fair coins; C is `A or B` with 5% of its values flipped.
    fn collider(seed: u64, n: usize) -> Pgm {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = (0..n)
            .map(|_| {
                let a = rng.gen_range(0..2);
                let b = rng.gen_range(0..2);
                let mut c = usize::from(a == 1 || b == 1);
                if rng.gen_bool(0.05) {
                    c = 1 - c;
                }
                vec![a, b, c]
            })
            .collect();
        class_pgm(&["A", "B", "C"], rows)
    }

    fn strict() -> Pc {
        Pc::new(PcConfig { significance: 0.01 }).unwrap()
    }

    #[test]
    fn config_validation() {
        assert_eq!(PcConfig::default().significance, 0.05);
        assert!(Pc::new(PcConfig { significance: 1.2 }).is_err());
        assert_eq!(Pc::default().identifier(), "PC");
        assert_eq!(
            Pc::default().parameters().get("significance").map(String::as_str),
            Some("5e-2")
        );
    }

    #[test]
    fn orients_collider() {
        let mut pgm = collider(3, 2000);
        let report = strict().learn(&mut pgm).unwrap();

        assert!(pgm.adjacency().has_edge(0, 2));
        assert!(pgm.adjacency().has_edge(1, 2));
        assert!(!pgm.adjacency().adjacent(0, 1));
        assert_eq!(report.edges_removed, 1);
        assert!(pgm.node(2).unwrap().parameters().is_some());
    }

    #[test]
    fn chain_without_collider_is_acyclic_and_keeps_skeleton() {
        // A -> B -> C with strong copying.
        let mut rng = StdRng::seed_from_u64(9);
        let rows = (0..2000)
            .map(|_| {
                let a: usize = rng.gen_range(0..2);
                let b = if rng.gen_bool(0.9) { a } else { 1 - a };
                let c = if rng.gen_bool(0.9) { b } else { 1 - b };
                vec![a, b, c]
            })
            .collect();
        let mut pgm = class_pgm(&["A", "B", "C"], rows);
        strict().learn(&mut pgm).unwrap();

        let adj = pgm.adjacency();
        assert!(adj.adjacent(0, 1));
        assert!(adj.adjacent(1, 2));
        assert!(!adj.adjacent(0, 2));
        assert!(adj.is_acyclic());
        // No collider at B.
        assert!(!(adj.has_edge(0, 1) && adj.has_edge(2, 1)));
    }

    #[test]
    fn features_are_rejected() {
        let ds = Dataset::new(
            vec![Variable::class("C", 2), Variable::feature("X", 2)],
            vec![Sequence::new(vec![0.0, 1.0], vec![vec![0, 0], vec![0, 1]])],
        )
        .unwrap();
        let mut pgm = Pgm::new(Arc::new(ds));
        let err = Pc::default().learn_node(&mut pgm, 1).expect_err("feature target");
        assert!(matches!(err, LearnError::Structure(_)));
    }

    #[test]
    fn propagation_rule_one() {
        // 0 -> 1 - 2 with 0, 2 not adjacent forces 1 -> 2.
        let nodes = [0, 1, 2];
        let mut graph = PartiallyDirected::complete(3, &nodes);
        graph.remove(0, 2);
        graph.orient(0, 1);
        propagate(&nodes, &mut graph);
        assert!(graph.is_directed(1, 2));
    }

    #[test]
    fn orientation_never_closes_a_cycle() {
        let nodes = [0, 1, 2];
        let mut graph = PartiallyDirected::complete(3, &nodes);
        assert!(graph.orient(0, 1));
        assert!(graph.orient(1, 2));
        assert!(!graph.orient(2, 0));
        propagate(&nodes, &mut graph);
        assert!(graph.is_directed(0, 2));
    }

    #[test]
    fn propagation_rule_two() {
        // 0 -> 2 -> 1 with 0 - 1 forces 0 -> 1.
        let nodes = [0, 1, 2];
        let mut graph = PartiallyDirected::complete(3, &nodes);
        assert!(graph.orient(0, 2));
        assert!(graph.orient(2, 1));
        assert!(implied(&nodes, &graph, 0, 1));
        propagate(&nodes, &mut graph);
        assert!(graph.is_directed(0, 1));
    }

    #[test]
    fn propagation_rule_three() {
        // 0 - 2 -> 1 and 0 - 3 -> 1 with 2, 3 not adjacent forces 0 -> 1.
        let nodes = [0, 1, 2, 3];
        let mut graph = PartiallyDirected::complete(4, &nodes);
        graph.remove(2, 3);
        assert!(graph.orient(2, 1));
        assert!(graph.orient(3, 1));
        assert!(implied(&nodes, &graph, 0, 1));
        assert!(!implied(&nodes, &graph, 1, 0));
        propagate(&nodes, &mut graph);
        assert!(graph.is_directed(0, 1));
        assert!(graph.is_directed(2, 1));
        assert!(graph.is_directed(3, 1));
    }

    #[test]
    fn kept_edges_block_cycles() {
        let nodes = [0, 1];
        let mut current = AdjacencyMatrix::new(3);
        current.add_edge(1, 2);
        current.add_edge(2, 0);
        let mut graph =
            PartiallyDirected::complete(3, &nodes).with_kept_edges(&current, &[0, 1, 2]);
        assert!(!graph.orient(0, 1));
        assert!(graph.orient(1, 0));
    }

    #[test]
    fn partial_relearning_respects_edges_to_other_classes() {
        // A and B are coupled coins, O is noise. B -> O -> A is kept, so the
        // learned A - B edge can only point B -> A.
        let mut rng = StdRng::seed_from_u64(17);
        let rows = (0..2000)
            .map(|_| {
                let a: usize = rng.gen_range(0..2);
                let b = if rng.gen_bool(0.9) { a } else { 1 - a };
                vec![a, b, rng.gen_range(0..2)]
            })
            .collect();
        let mut pgm = class_pgm(&["A", "B", "O"], rows);
        let mut seeded = AdjacencyMatrix::new(3);
        seeded.add_edge(1, 2);
        seeded.add_edge(2, 0);
        pgm.set_adjacency(seeded).unwrap();

        let report = strict().learn_nodes(&mut pgm, &[0, 1]).unwrap();
        let adj = pgm.adjacency();
        assert!(adj.has_edge(1, 0));
        assert!(!adj.has_edge(0, 1));
        assert!(adj.has_edge(1, 2));
        assert!(adj.has_edge(2, 0));
        assert!(adj.is_acyclic());
        assert!(report.is_complete());
    }

    #[test]
    fn failing_pairs_keep_their_edge() {
        // A has a single state, so every test on A has zero degrees of
        // freedom.
        let mut rng = StdRng::seed_from_u64(4);
        let rows: Vec<_> = (0..500)
            .map(|_| vec![0, rng.gen_range(0..2), rng.gen_range(0..2)])
            .collect();
        let variables = vec![
            Variable::class("A", 1),
            Variable::class("B", 2),
            Variable::class("C", 2),
        ];
        let sequences = rows
            .into_iter()
            .map(|r| Sequence::new(vec![0.0], vec![r]))
            .collect();
        let mut pgm = Pgm::new(Arc::new(Dataset::new(variables, sequences).unwrap()));

        let report = strict().learn(&mut pgm).unwrap();
        let adj = pgm.adjacency();
        assert!(adj.adjacent(0, 1));
        assert!(adj.adjacent(0, 2));
        assert!(adj.is_acyclic());
        assert!(report.abandoned_nodes.iter().any(|a| a.node == "A"));
        assert!(!report.is_complete());
    }
}
