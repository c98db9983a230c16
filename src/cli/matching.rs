//! Match command - pair segment sides with a matching oracle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::matching::external::ExternalMatching;
use crate::matching::greedy::GreedyMatching;
use crate::matching::{matching_weight, MatchingError, MatchingOracle, WeightedEdge};
use crate::parsing::tsv::{parse_weights_file, WeightRecord};

/// Available matching oracles
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Matcher {
    /// In-process greedy matching
    Greedy,
    /// blossom5 maximum weight perfect matching
    Blossom5,
    /// External maximum weight matching
    MaxWeight,
    /// External maximum cardinality matching
    MaxCardinality,
}

impl Matcher {
    fn default_program(self) -> &'static str {
        match self {
            Self::Greedy => "",
            Self::Blossom5 => "blossom5",
            Self::MaxWeight | Self::MaxCardinality => "matchGraph.py",
        }
    }

    /// Build the oracle, running `program` when the matcher is external
    #[must_use]
    pub fn oracle(self, program: Option<&Path>) -> Box<dyn MatchingOracle> {
        let program = program.map_or_else(
            || PathBuf::from(self.default_program()),
            Path::to_path_buf,
        );
        match self {
            Self::Greedy => Box::new(GreedyMatching),
            Self::Blossom5 => Box::new(ExternalMatching::blossom5(program)),
            Self::MaxWeight => Box::new(ExternalMatching::maximum_weight(program)),
            Self::MaxCardinality => Box::new(ExternalMatching::maximum_cardinality(program)),
        }
    }
}

/// Arguments for the match command
#[derive(Args)]
pub struct MatchArgs {
    /// Adjacency weights: side_a, side_b, weight
    #[arg(required = true)]
    pub weights: PathBuf,

    /// Matching oracle
    #[arg(long, value_enum, default_value = "greedy")]
    pub matcher: Matcher,

    /// Path to the external matching program
    #[arg(long)]
    pub program: Option<PathBuf>,
}

/// One chosen pair of sides
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchedPair {
    pub side_a: i64,
    pub side_b: i64,
    pub weight: f64,
}

/// Execute the match command
///
/// # Errors
///
/// Returns an error if the weights cannot be parsed or the oracle fails.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: MatchArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let records = parse_weights_file(&args.weights)
        .with_context(|| format!("Failed to parse {}", args.weights.display()))?;
    let oracle = args.matcher.oracle(args.program.as_deref());
    let pairs = match_sides(&records, oracle.as_ref())?;

    if verbose {
        eprintln!(
            "Matched {} pairs from {} weights",
            pairs.len(),
            records.len()
        );
    }

    let total: f64 = pairs.iter().map(|p| p.weight).sum();
    let positive = pairs.iter().filter(|p| p.weight > 0.0).count();
    match format {
        OutputFormat::Text => {
            for pair in &pairs {
                println!("{}\t{}\t{:.6}", pair.side_a, pair.side_b, pair.weight);
            }
            println!("\nPairs: {} ({positive} with positive weight)", pairs.len());
            println!("Total weight: {total:.6}");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "matcher": format!("{:?}", args.matcher),
                "pairs": pairs,
                "cardinality": positive,
                "weight": total,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("side_a\tside_b\tweight");
            for pair in &pairs {
                println!("{}\t{}\t{}", pair.side_a, pair.side_b, pair.weight);
            }
        }
    }
    Ok(())
}

/// Number the distinct sides in ascending order, match them, and translate the
/// chosen edges back to sides. Repeated pairs have their weights summed.
///
/// # Errors
///
/// Returns the oracle's error.
pub fn match_sides<O>(
    records: &[WeightRecord],
    oracle: &O,
) -> Result<Vec<MatchedPair>, MatchingError>
where
    O: MatchingOracle + ?Sized,
{
    let sides: Vec<i64> = records
        .iter()
        .flat_map(|r| [r.side_a, r.side_b])
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();
    let index: BTreeMap<i64, usize> = sides.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for record in records {
        let a = index[&record.side_a];
        let b = index[&record.side_b];
        *weights.entry((a.min(b), a.max(b))).or_default() += record.weight;
    }
    let edges: Vec<WeightedEdge> = weights
        .into_iter()
        .map(|((a, b), weight)| WeightedEdge::new(a, b, weight))
        .collect();

    let matching = oracle.choose_matching(&edges, sides.len())?;
    tracing::debug!(
        "Matching weight {:.3} over {} nodes",
        matching_weight(&matching),
        sides.len()
    );

    let mut pairs: Vec<MatchedPair> = matching
        .into_iter()
        .map(|edge| {
            let (a, b) = edge.key();
            MatchedPair {
                side_a: sides[a],
                side_b: sides[b],
                weight: edge.weight,
            }
        })
        .collect();
    pairs.sort_by_key(|pair| (pair.side_a, pair.side_b));
    Ok(pairs)
}
