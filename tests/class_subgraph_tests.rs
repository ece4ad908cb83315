//! Class subgraph learning with PC and HITON-PC.

mod common;

use common::{class_pgm, noisy};
use mctbn::{HitonPc, HitonPcConfig, Pc, PcConfig, StructureLearning};
use rand::Rng;

fn pc() -> Pc {
    Pc::new(PcConfig { significance: 0.01 }).unwrap()
}

#[test]
fn pc_orients_collider() {
    let mut pgm = class_pgm(&["A", "B", "C"], 101, 3000, |rng| {
        let a = rng.gen_range(0..2);
        let b = rng.gen_range(0..2);
        let c = noisy(rng, usize::from(a == 1 || b == 1), 0.95);
        vec![a, b, c]
    });
    pc().learn(&mut pgm).unwrap();

    let adj = pgm.adjacency();
    assert!(adj.has_edge(0, 2), "A -> C");
    assert!(adj.has_edge(1, 2), "B -> C");
    assert!(!adj.adjacent(0, 1));
    assert_eq!(pgm.structure_summary().class_edges, 2);
}

#[test]
fn pc_output_is_a_dag_over_dependent_variables() {
    // Four noisy copies of one hidden coin: the skeleton stays dense.
    let mut pgm = class_pgm(&["A", "B", "C", "D"], 5, 1500, |rng| {
        let h = rng.gen_range(0..2);
        (0..4).map(|_| noisy(rng, h, 0.85)).collect()
    });
    pc().learn(&mut pgm).unwrap();
    assert!(pgm.adjacency().is_acyclic());
    assert!(pgm.is_structure_legal(pgm.adjacency()));
    assert!(pgm.structure_summary().class_edges >= 3);
}

#[test]
fn false_rejection_rate_is_close_to_significance() {
    let pc = Pc::new(PcConfig { significance: 0.05 }).unwrap();
    let runs = 200;
    let mut rejections = 0;
    for seed in 0..runs {
        let mut pgm = class_pgm(&["A", "B"], seed, 200, |rng| {
            vec![rng.gen_range(0..2), rng.gen_range(0..2)]
        });
        pc.learn(&mut pgm).unwrap();
        if pgm.adjacency().adjacent(0, 1) {
            rejections += 1;
        }
    }
    let rate = rejections as f64 / runs as f64;
    assert!(rate < 0.10, "false rejection rate {}", rate);
}

#[test]
fn hiton_pc_accepts_only_acyclic_structures() {
    let mut pgm = class_pgm(&["A", "B", "C", "D"], 8, 1500, |rng| {
        let h = rng.gen_range(0..2);
        (0..4).map(|_| noisy(rng, h, 0.85)).collect()
    });
    let report = HitonPc::new(HitonPcConfig { significance: 0.01 })
        .unwrap()
        .learn(&mut pgm)
        .unwrap();

    assert!(pgm.adjacency().is_acyclic());
    assert!(pgm.structure_summary().class_edges > 0);
    assert_eq!(report.algorithm, "HITON-PC");
    assert!(report.tests_performed >= 12);
}
