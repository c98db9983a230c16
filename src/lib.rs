//! # ref-scaffold
//!
//! A library for ordering and orienting sequence segments (contigs) into
//! linear scaffolds from pairwise adjacency evidence.
//!
//! Each segment has two sides, written as signed ids: `+id` and `-id`. Evidence
//! takes the form of weights between sides, either given directly or derived
//! from linkage observations with the [`zscore`](scoring::zscore::zscore)
//! affinity model. A [`Reference`] holds a set of intervals, each bounded by two
//! fixed stub segments, and the ordering algorithms place and rearrange the
//! remaining segments to maximise the summed weight of realised adjacencies.
//!
//! ## Features
//!
//! - **Greedy construction**: Places segments by descending gain with a
//!   near-tie band favouring well-supported adjacencies
//! - **Matching construction**: Seeds chains from a weighted matching, either
//!   in process or through blossom5-style programs
//! - **Local search**: Greedy permutation and simulated annealing
//! - **Topological reordering**: Rearranges chains to avoid breakpoints
//! - **Nudging**: Repairs unsupported adjacencies with short moves
//!
//! ## Example
//!
//! ```rust
//! use ref_scaffold::{run_pipeline, AdjacencyGraph, Reference, ScaffoldConfig};
//!
//! let mut graph = AdjacencyGraph::new(4);
//! graph.set_weight(-1, 2, 5.0);
//! graph.set_weight(-2, 3, 5.0);
//! graph.set_weight(-3, 4, 5.0);
//!
//! let mut reference = Reference::new();
//! reference.make_new_interval(1, 4);
//!
//! let report = run_pipeline(&graph, &graph, &mut reference, &ScaffoldConfig::default());
//! assert_eq!(reference.node_count(), 4);
//! assert!((report.final_summary().unwrap().score - 15.0).abs() < 1e-9);
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Adjacency graphs and the interval-based reference structure
//! - [`ordering`]: Construction and improvement algorithms
//! - [`matching`]: Weighted matching oracles
//! - [`scoring`]: Affinity model and reference diagnostics
//! - [`parsing`]: Parsers for weight, link and stub files
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod core;
pub mod matching;
pub mod ordering;
pub mod parsing;
pub mod scoring;
pub mod utils;

// Re-export commonly used types for convenience
pub use crate::core::adjacency::AdjacencyGraph;
pub use crate::core::reference::Reference;
pub use crate::core::types::*;
pub use matching::MatchingOracle;
pub use ordering::pipeline::{
    run_pipeline, run_pipeline_with_matching, PipelineReport, ScaffoldConfig,
};
