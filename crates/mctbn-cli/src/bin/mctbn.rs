//! mctbn CLI - learn the structure of a multi-dimensional CTBN classifier
//!
//! Usage:
//!   mctbn describe --dataset data.json
//!   mctbn learn --dataset data.json
//!   mctbn learn --dataset data.json --class-algorithm hiton-pc --feature-algorithm mb-ctpc -o json
//!
//! Datasets are JSON documents of the form
//! `{"variables": [{"name", "states", "is_class"}], "sequences": [{"times", "observations"}]}`.
//! Set `RUST_LOG=debug` to see individual edge removals.

use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use mctbn_core::learning::{
    Ctpc, CtpcConfig, HitonPc, HitonPcConfig, LearningReport, MbCtpc, MctbncLearner,
    OnlineMbCtpc, Pc, PcConfig, StructureLearning,
};
use mctbn_core::model::{Dataset, Pgm, Sequence, StructureSummary, Variable};
use mctbn_core::LearnError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mctbn")]
#[command(version)]
#[command(about = "Structure learning for multi-dimensional continuous-time Bayesian network classifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Learn class, bridge and feature subgraphs from a dataset
    Learn {
        /// Dataset JSON file
        #[arg(short, long, value_name = "FILE")]
        dataset: String,

        #[arg(long, value_enum, default_value = "pc")]
        class_algorithm: ClassAlgorithm,

        #[arg(long, value_enum, default_value = "ctpc")]
        feature_algorithm: FeatureAlgorithm,

        /// Significance of the chi-squared tests between class variables
        #[arg(long, default_value_t = 0.05)]
        significance: f64,

        /// Significance of the time-to-transition F-test
        #[arg(long, default_value_t = 1e-5)]
        significance_transition: f64,

        /// Significance of the state-to-state chi-squared test
        #[arg(long, default_value_t = 1e-5)]
        significance_state: f64,

        /// Output format: summary or json
        #[arg(short, long, default_value = "summary", value_name = "FORMAT")]
        output: String,
    },

    /// List the variables of a dataset
    Describe {
        #[arg(short, long, value_name = "FILE")]
        dataset: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ClassAlgorithm {
    Pc,
    HitonPc,
}

#[derive(Clone, Copy, ValueEnum)]
enum FeatureAlgorithm {
    Ctpc,
    MbCtpc,
    OnlineMbCtpc,
}

#[derive(Deserialize)]
struct DatasetFile {
    variables: Vec<Variable>,
    sequences: Vec<Sequence>,
}

#[derive(Serialize)]
struct Edge {
    parent: String,
    child: String,
}

#[derive(Serialize)]
struct LearnOutput {
    report: LearningReport,
    summary: StructureSummary,
    edges: Vec<Edge>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Describe { dataset } => {
            let dataset = load_dataset(&dataset);
            print_variables(&dataset);
        }
        Command::Learn {
            dataset,
            class_algorithm,
            feature_algorithm,
            significance,
            significance_transition,
            significance_state,
            output,
        } => {
            let learner = match build_learner(
                class_algorithm,
                feature_algorithm,
                significance,
                CtpcConfig {
                    significance_time_to_transition: significance_transition,
                    significance_state_to_state: significance_state,
                },
            ) {
                Ok(l) => l,
                Err(e) => {
                    eprintln!("Invalid configuration: {}", e);
                    process::exit(2);
                }
            };

            let data = load_dataset(&dataset);
            tracing::info!(
                path = %dataset,
                variables = data.num_variables(),
                sequences = data.num_sequences(),
                algorithm = learner.identifier(),
                "learning structure"
            );
            let mut pgm = Pgm::new(Arc::new(data));
            let report = match learner.learn(&mut pgm) {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Structure learning failed: {}", e);
                    process::exit(1);
                }
            };

            match output.as_str() {
                "json" => {
                    let out = LearnOutput {
                        edges: edges(&pgm),
                        summary: pgm.structure_summary(),
                        report,
                    };
                    match serde_json::to_string_pretty(&out) {
                        Ok(json) => println!("{}", json),
                        Err(e) => {
                            eprintln!("Error serializing to JSON: {}", e);
                            process::exit(1);
                        }
                    }
                }
                _ => print_summary(&pgm, &report),
            }
        }
    }
}

fn load_dataset(path: &str) -> Dataset {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path, e);
            process::exit(1);
        }
    };
    let file: DatasetFile = match serde_json::from_str(&source) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error parsing '{}': {}", path, e);
            process::exit(1);
        }
    };
    match Dataset::new(file.variables, file.sequences) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Invalid dataset '{}': {}", path, e);
            process::exit(1);
        }
    }
}

fn build_learner(
    class_algorithm: ClassAlgorithm,
    feature_algorithm: FeatureAlgorithm,
    significance: f64,
    ctpc: CtpcConfig,
) -> Result<MctbncLearner, LearnError> {
    let class_subgraph: Box<dyn StructureLearning> = match class_algorithm {
        ClassAlgorithm::Pc => Box::new(Pc::new(PcConfig { significance })?),
        ClassAlgorithm::HitonPc => Box::new(HitonPc::new(HitonPcConfig { significance })?),
    };
    let feature_subgraph: Box<dyn StructureLearning> = match feature_algorithm {
        FeatureAlgorithm::Ctpc => Box::new(Ctpc::new(ctpc)?),
        FeatureAlgorithm::MbCtpc => Box::new(MbCtpc::new(ctpc)?),
        FeatureAlgorithm::OnlineMbCtpc => Box::new(OnlineMbCtpc::new(ctpc)?),
    };
    Ok(MctbncLearner::new(class_subgraph, feature_subgraph))
}

fn edges(pgm: &Pgm) -> Vec<Edge> {
    let mut out = Vec::new();
    for child in 0..pgm.num_nodes() {
        for parent in pgm.parents_of(child) {
            out.push(Edge {
                parent: pgm.name_of(parent),
                child: pgm.name_of(child),
            });
        }
    }
    out
}

fn print_variables(dataset: &Dataset) {
    println!(
        "{} variables, {} sequences\n",
        dataset.num_variables(),
        dataset.num_sequences()
    );
    for variable in dataset.variables() {
        let role = if variable.is_class { "class" } else { "feature" };
        println!(
            "  {:<16} {:<8} [{}]",
            variable.name,
            role,
            variable.states.join(", ")
        );
    }
}

fn print_summary(pgm: &Pgm, report: &LearningReport) {
    let summary = pgm.structure_summary();
    println!("✓ Structure learned with {}\n", report.algorithm);
    for (name, value) in &report.parameters {
        println!("  {} = {}", name, value);
    }
    println!(
        "\nEdges: {} class, {} bridge, {} feature",
        summary.class_edges, summary.bridge_edges, summary.feature_edges
    );
    for edge in edges(pgm) {
        println!("  {} -> {}", edge.parent, edge.child);
    }
    println!(
        "\nTests performed: {} (cache hits {}, misses {})",
        report.tests_performed, report.cache_hits, report.cache_misses
    );
    if !report.abandoned_nodes.is_empty() {
        println!("\nIncomplete searches ({}):", report.abandoned_nodes.len());
        for node in &report.abandoned_nodes {
            println!("  {}: {}", node.node, node.reason);
        }
    }
}
