//! Feature and bridge subgraph learning on sampled trajectories.

mod common;

use common::{feature_chain, CtbnSampler};
use mctbn::model::{AdjacencyMatrix, Variable};
use mctbn::{Ctpc, CtpcConfig, MbCtpc, OnlineMbCtpc, StructureLearning};
use rand::Rng;

fn config() -> CtpcConfig {
    CtpcConfig {
        significance_time_to_transition: 1e-3,
        significance_state_to_state: 1e-3,
    }
}

#[test]
fn ctpc_removes_indirect_parent() {
    let mut pgm = feature_chain().pgm(42, 300, 20.0);
    let report = Ctpc::new(config()).unwrap().learn(&mut pgm).unwrap();

    let adj = pgm.adjacency();
    assert!(adj.has_edge(1, 2), "X1 -> X2");
    assert!(adj.has_edge(2, 3), "X2 -> X3");
    assert!(!adj.has_edge(1, 3), "X3 is independent of X1 given X2");
    assert!(report.is_complete());
    assert_eq!(report.algorithm, "CTPC");
}

#[test]
fn ctpc_relearning_is_idempotent() {
    let mut pgm = feature_chain().pgm(7, 150, 20.0);
    let ctpc = Ctpc::new(config()).unwrap();

    ctpc.learn(&mut pgm).unwrap();
    let first = pgm.adjacency().clone();
    ctpc.learn(&mut pgm).unwrap();
    assert_eq!(pgm.adjacency(), &first);
}

#[test]
fn learned_parents_are_a_subset_of_the_candidates() {
    let complete = {
        let pgm = feature_chain().pgm(1, 1, 1.0);
        AdjacencyMatrix::complete_candidates(&pgm.class_mask())
    };
    for algorithm in [
        Box::new(Ctpc::new(config()).unwrap()) as Box<dyn StructureLearning>,
        Box::new(MbCtpc::new(config()).unwrap()),
    ] {
        let mut pgm = feature_chain().pgm(3, 100, 10.0);
        algorithm.learn(&mut pgm).unwrap();
        assert!(pgm.adjacency().is_subset_of(&complete));
        assert!(pgm.class_indices().iter().all(|&c| pgm.parents_of(c).is_empty()));
    }
}

#[test]
fn three_state_feature_drops_irrelevant_parent() {
    // X2 leaves every state at the same rate and jumps uniformly, so neither
    // the transition times nor the destinations depend on X1.
    let mut pgm = CtbnSampler::new(vec![
        Variable::class("C", 2),
        Variable::feature("X1", 2),
        Variable::feature("X2", 3),
    ])
    .rate(1, |_| 0.5)
    .rate(2, |_| 2.0)
    .pgm(11, 200, 10.0);
    Ctpc::new(config()).unwrap().learn(&mut pgm).unwrap();
    assert!(!pgm.adjacency().has_edge(1, 2));
    assert!(pgm.node(2).unwrap().parameters().is_some());
}

#[test]
fn online_update_touches_only_requested_node() {
    let sampler = CtbnSampler::new(vec![
        Variable::class("C", 2),
        Variable::feature("X1", 2),
        Variable::feature("X2", 2),
        Variable::feature("X3", 2),
    ])
    .classes(|rng, row| row[0] = rng.gen_range(0..2))
    .rate(1, |row| if row[0] == 0 { 0.5 } else { 2.5 })
    .rate(2, |row| match (row[0], row[2] == row[1]) {
        (0, true) => 0.3,
        (0, false) => 3.0,
        (_, true) => 1.0,
        (_, false) => 6.0,
    })
    .rate(3, |row| if row[0] == 0 { 1.0 } else { 0.2 });
    let mut pgm = sampler.pgm(5, 200, 10.0);

    MbCtpc::new(config()).unwrap().learn(&mut pgm).unwrap();
    let mut drifted = pgm.adjacency().clone();
    drifted.add_edge(3, 1);
    pgm.set_adjacency(drifted.clone()).unwrap();

    OnlineMbCtpc::new(config())
        .unwrap()
        .learn_node(&mut pgm, 2)
        .unwrap();

    for node in [0, 1, 3] {
        assert_eq!(pgm.parents_of(node), drifted.parents_of(node));
    }
    assert!(pgm.adjacency().has_edge(0, 2));
    assert!(pgm.adjacency().has_edge(1, 2));
}

#[test]
fn node_without_transitions_is_abandoned_and_siblings_finish() {
    // X2 never leaves its initial state, so no F-test on it has degrees of
    // freedom. X1 is driven by the class variable.
    let mut pgm = CtbnSampler::new(vec![
        Variable::class("C", 2),
        Variable::feature("X1", 2),
        Variable::feature("X2", 2),
    ])
    .classes(|rng, row| row[0] = rng.gen_range(0..2))
    .rate(1, |row| if row[0] == 0 { 0.5 } else { 2.5 })
    .pgm(23, 200, 10.0);

    let report = Ctpc::new(config()).unwrap().learn(&mut pgm).unwrap();

    assert!(!report.is_complete());
    let abandoned: Vec<&str> = report
        .abandoned_nodes
        .iter()
        .map(|a| a.node.as_str())
        .collect();
    assert_eq!(abandoned, ["X2"]);
    assert_eq!(pgm.parents_of(2), vec![0, 1]);
    assert_eq!(pgm.parents_of(1), vec![0]);
}
