//! Command-line interface for ref-scaffold.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **scaffold**: Order and orient segments from adjacency evidence
//! - **zscore**: Evaluate the affinity model for one pair of segments
//! - **match**: Run a matching oracle over a weights file
//!
//! ## Usage
//!
//! ```text
//! # Scaffold from direct weights into the intervals listed in stubs.tsv
//! ref-scaffold scaffold --weights weights.tsv --stubs stubs.tsv
//!
//! # Weight link evidence with a per-base decay, then anneal
//! ref-scaffold scaffold --links links.tsv --stubs stubs.tsv --theta 0.001 \
//!     --anneal-steps 100000 --schedule exponential --seed 7
//!
//! # JSON stage report for scripting
//! ref-scaffold scaffold --weights weights.tsv --stubs stubs.tsv --format json
//!
//! # Affinity of two 100bp segments 10bp apart
//! ref-scaffold zscore 100 100 10 0.01
//! ```

use clap::{Parser, Subcommand};

pub mod matching;
pub mod scaffold;
pub mod zscore;

#[derive(Parser)]
#[command(name = "ref-scaffold")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Order and orient sequence segments into scaffolds from adjacency evidence")]
#[command(
    long_about = "ref-scaffold builds linear scaffolds from pairwise adjacency weights between segment ends.\n\nSegments are placed into intervals bounded by fixed stub segments, then the ordering is improved by:\n- Greedy construction, optionally seeded by a weighted matching\n- Greedy permutation and simulated annealing\n- Topological reordering and local nudging of unsupported adjacencies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and optimise a scaffold
    Scaffold(scaffold::ScaffoldArgs),

    /// Compute the affinity score between two segments
    Zscore(zscore::ZscoreArgs),

    /// Choose a weighted matching between segment sides
    Match(matching::MatchArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
