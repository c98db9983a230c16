//! Scaffold command - build and optimise an ordering from evidence files.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;

use crate::cli::matching::Matcher;
use crate::cli::OutputFormat;
use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::ordering::improve::Schedule;
use crate::ordering::pipeline::{
    run_pipeline, run_pipeline_with_matching, PipelineReport, ScaffoldConfig,
};
use crate::parsing::tsv::{
    parse_links_file, parse_stubs_file, parse_weights_file, StubPair, WeightRecord,
};
use crate::scoring::zscore::LinkEvidence;
use crate::utils::validation::{validate_theta, validate_wiggle};

/// Arguments for the scaffold command
#[derive(Args)]
#[command(group(clap::ArgGroup::new("evidence").required(true).multiple(true).args(["weights", "links"])))]
pub struct ScaffoldArgs {
    /// Adjacency weights: side_a, side_b, weight
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// Link evidence: side_a, side_b, gap, length_a, length_b, [support]
    #[arg(long)]
    pub links: Option<PathBuf>,

    /// Stub intervals: left, right
    #[arg(long, required = true)]
    pub stubs: PathBuf,

    /// Weights defining well-supported adjacencies; defaults to the evidence
    #[arg(long)]
    pub desired: Option<PathBuf>,

    /// JSON configuration; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Near-tie band for greedy construction (0-1]
    #[arg(long)]
    pub wiggle: Option<f64>,

    /// Rounds of greedy permutation
    #[arg(long)]
    pub permutations: Option<usize>,

    /// Simulated annealing steps (0 disables)
    #[arg(long)]
    pub anneal_steps: Option<usize>,

    /// Annealing temperature schedule
    #[arg(long, value_enum)]
    pub schedule: Option<ScheduleKind>,

    /// Constant or initial annealing temperature
    #[arg(long, default_value = "1.0")]
    pub temperature: f64,

    /// Decay rate of the exponential schedule
    #[arg(long, default_value = "10.0")]
    pub rate: f64,

    /// Annealing RNG seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Furthest a nudge may move a segment
    #[arg(long)]
    pub max_nudge: Option<usize>,

    /// Rounds of nudging (0 disables)
    #[arg(long)]
    pub nudge_permutations: Option<usize>,

    /// Skip topological reordering
    #[arg(long)]
    pub no_reorder: bool,

    /// Per-base decay used to weight link evidence [0-1)
    #[arg(long)]
    pub theta: Option<f64>,

    /// Seed construction with a weighted matching
    #[arg(long, value_enum)]
    pub matcher: Option<Matcher>,

    /// Path to the external matching program
    #[arg(long)]
    pub matcher_program: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum ScheduleKind {
    Greedy,
    Constant,
    Exponential,
}

/// Graphs and stub-only reference assembled from input files
pub struct Problem {
    pub graph: AdjacencyGraph,
    pub desired: AdjacencyGraph,
    pub reference: Reference,
}

/// Execute the scaffold command
///
/// # Errors
///
/// Returns an error if inputs cannot be parsed, parameters are out of range,
/// or the matching program fails.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: ScaffoldArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = resolve_config(&args)?;
    let problem = load_problem(&args, config.theta)?;
    if verbose {
        eprintln!(
            "Loaded {} segments, {} weighted pairs, {} intervals",
            problem.graph.node_count(),
            problem.graph.weight_count(),
            problem.reference.interval_count()
        );
    }

    let Problem {
        graph,
        desired,
        mut reference,
    } = problem;
    let report = match args.matcher {
        Some(matcher) => {
            let oracle = matcher.oracle(args.matcher_program.as_deref());
            run_pipeline_with_matching(&graph, &desired, &mut reference, &config, oracle.as_ref())?
        }
        None => run_pipeline(&graph, &desired, &mut reference, &config),
    };

    match format {
        OutputFormat::Text => print_text(&reference, &report),
        OutputFormat::Json => print_json(&config, &report)?,
        OutputFormat::Tsv => print_tsv(&report),
    }
    Ok(())
}

/// Merge the optional JSON configuration with command-line overrides
///
/// # Errors
///
/// Returns an error if the configuration file is unreadable or invalid, or a
/// parameter is out of range.
pub fn resolve_config(args: &ScaffoldArgs) -> anyhow::Result<ScaffoldConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => ScaffoldConfig::default(),
    };

    if let Some(wiggle) = args.wiggle {
        config.wiggle = wiggle;
    }
    if let Some(permutations) = args.permutations {
        config.permutations = permutations;
    }
    if let Some(steps) = args.anneal_steps {
        config.anneal_steps = steps;
    }
    if let Some(kind) = args.schedule {
        config.schedule = match kind {
            ScheduleKind::Greedy => Schedule::Greedy,
            ScheduleKind::Constant => Schedule::Constant {
                temperature: args.temperature,
            },
            ScheduleKind::Exponential => Schedule::Exponential {
                initial: args.temperature,
                rate: args.rate,
            },
        };
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(max_nudge) = args.max_nudge {
        config.max_nudge = max_nudge;
    }
    if let Some(rounds) = args.nudge_permutations {
        config.nudge_permutations = rounds;
    }
    if args.no_reorder {
        config.reorder = false;
    }
    if let Some(theta) = args.theta {
        config.theta = theta;
    }

    validate_wiggle(config.wiggle)?;
    validate_theta(config.theta)?;
    Ok(config)
}

fn load_problem(args: &ScaffoldArgs, theta: f64) -> anyhow::Result<Problem> {
    let weights = read_optional(args.weights.as_deref(), parse_weights_file)?;
    let links = read_optional(args.links.as_deref(), parse_links_file)?;
    let desired_weights = read_optional(args.desired.as_deref(), parse_weights_file)?;
    let stubs = parse_stubs_file(&args.stubs)
        .with_context(|| format!("Failed to parse stubs {}", args.stubs.display()))?;
    Ok(build_problem(
        &weights,
        &links,
        args.desired.as_ref().map(|_| desired_weights.as_slice()),
        &stubs,
        theta,
    ))
}

fn read_optional<T, E>(
    path: Option<&Path>,
    parse: impl Fn(&Path) -> Result<Vec<T>, E>,
) -> anyhow::Result<Vec<T>>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match path {
        Some(path) => {
            parse(path).with_context(|| format!("Failed to parse {}", path.display()))
        }
        None => Ok(Vec::new()),
    }
}

/// Assemble the evidence graph, the desired-adjacency graph and a stub-only
/// reference. Segment count is the largest id named anywhere in the inputs.
#[must_use]
pub fn build_problem(
    weights: &[WeightRecord],
    links: &[LinkEvidence],
    desired: Option<&[WeightRecord]>,
    stubs: &[StubPair],
    theta: f64,
) -> Problem {
    let desired_records = desired.unwrap_or_default();
    let node_count = weights
        .iter()
        .chain(desired_records)
        .flat_map(|r| [r.side_a, r.side_b])
        .chain(links.iter().flat_map(|l| [l.side_a, l.side_b]))
        .chain(stubs.iter().flat_map(|s| [s.left, s.right]))
        .map(i64::unsigned_abs)
        .max()
        .unwrap_or(0);

    let mut graph = AdjacencyGraph::new(node_count);
    for record in weights {
        graph.add_to_weight(record.side_a, record.side_b, record.weight);
    }
    for evidence in links {
        graph.add_evidence(evidence, theta);
    }

    let desired = match desired {
        Some(records) => {
            let mut desired = AdjacencyGraph::new(node_count);
            for record in records {
                desired.add_to_weight(record.side_a, record.side_b, record.weight);
            }
            desired
        }
        None => graph.clone(),
    };

    let mut reference = Reference::with_capacity(usize::try_from(node_count).unwrap_or(0));
    for stub in stubs {
        reference.make_new_interval(stub.left, stub.right);
    }

    Problem {
        graph,
        desired,
        reference,
    }
}

fn print_text(reference: &Reference, report: &PipelineReport) {
    print!("{reference}");
    println!();
    for stage in &report.stages {
        println!(
            "   {:<24} score {:.3} of possible {:.3}, {} bad adjacencies",
            stage.stage,
            stage.summary.score,
            stage.summary.max_possible_score,
            stage.summary.bad_adjacency_count
        );
    }
    if let Some(annealing) = &report.annealing {
        println!(
            "   Annealing: {} of {} moves accepted, best score {:.3}",
            annealing.accepted, annealing.proposed, annealing.best_score
        );
    }
    if let Some(summary) = report.final_summary() {
        println!("\nScore: {:.3}", summary.score);
        println!("Bad adjacencies: {}", summary.bad_adjacency_count);
    }
}

fn print_json(config: &ScaffoldConfig, report: &PipelineReport) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "config": config,
        "report": report,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(report: &PipelineReport) {
    println!("stage\tintervals\tnodes\tscore\tmax_possible_score\tbad_adjacencies");
    for stage in &report.stages {
        println!(
            "{}\t{}\t{}\t{:.6}\t{:.6}\t{}",
            stage.stage,
            stage.summary.interval_count,
            stage.summary.node_count,
            stage.summary.score,
            stage.summary.max_possible_score,
            stage.summary.bad_adjacency_count
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        args: ScaffoldArgs,
    }

    fn parse(argv: &[&str]) -> ScaffoldArgs {
        let mut full = vec!["scaffold"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    #[test]
    fn test_build_problem_sizes_graph_from_inputs() {
        let weights = vec![WeightRecord {
            side_a: 1,
            side_b: -3,
            weight: 2.0,
        }];
        let stubs = vec![StubPair { left: 4, right: 5 }];
        let problem = build_problem(&weights, &[], None, &stubs, 0.0);
        assert_eq!(problem.graph.node_count(), 5);
        assert!((problem.desired.weight(-3, 1) - 2.0).abs() < f64::EPSILON);
        assert_eq!(problem.reference.interval_count(), 1);
        assert_eq!(problem.reference.first_of_interval(0), 4);
    }

    #[test]
    fn test_build_problem_weights_links() {
        let links = vec![LinkEvidence {
            side_a: -1,
            side_b: 2,
            gap: 3,
            length_a: 2,
            length_b: 3,
            support: 2.0,
        }];
        let problem = build_problem(&[], &links, Some(&[][..]), &[], 0.0);
        assert!((problem.graph.weight(-1, 2) - 12.0).abs() < 1e-9);
        assert_eq!(problem.desired.weight_count(), 0);
    }

    #[test]
    fn test_config_overrides() {
        let args = parse(&[
            "--weights",
            "w.tsv",
            "--stubs",
            "s.tsv",
            "--wiggle",
            "0.5",
            "--schedule",
            "exponential",
            "--temperature",
            "20",
            "--no-reorder",
        ]);
        let config = resolve_config(&args).unwrap();
        assert!((config.wiggle - 0.5).abs() < f64::EPSILON);
        assert!(!config.reorder);
        assert_eq!(
            config.schedule,
            Schedule::Exponential {
                initial: 20.0,
                rate: 10.0
            }
        );
        assert_eq!(config.permutations, 10);
    }

    #[test]
    fn test_invalid_theta_rejected() {
        let args = parse(&["--links", "l.tsv", "--stubs", "s.tsv", "--theta", "1.5"]);
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_evidence_required() {
        assert!(Harness::try_parse_from(["scaffold", "--stubs", "s.tsv"]).is_err());
    }
}
