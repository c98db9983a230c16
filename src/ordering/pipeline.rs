//! Configured end-to-end optimisation run.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::matching::{MatchingError, MatchingOracle};
use crate::ordering::greedy::{build_from_matching, build_greedily};
use crate::ordering::improve::{anneal, update_greedily, AnnealingStats, Schedule};
use crate::ordering::nudge::nudge_greedily;
use crate::ordering::reorder::reorder_to_avoid_breakpoints;
use crate::scoring::diagnostics::{log_reference, ReferenceSummary};

/// Tuning for [`run_pipeline`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaffoldConfig {
    /// Near-tie band for greedy construction, in `(0, 1]`
    pub wiggle: f64,

    /// Rounds of greedy permutation
    pub permutations: usize,

    /// Annealing steps; zero skips annealing
    pub anneal_steps: usize,

    pub schedule: Schedule,

    /// RNG seed for annealing; drawn from entropy when absent
    pub seed: Option<u64>,

    /// Furthest a nudge may move a segment
    pub max_nudge: usize,

    /// Rounds of nudging; zero skips nudging
    pub nudge_permutations: usize,

    /// Run topological reordering
    pub reorder: bool,

    /// Per-base decay applied when weighting link evidence
    pub theta: f64,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            wiggle: 0.99,
            permutations: 10,
            anneal_steps: 0,
            schedule: Schedule::Greedy,
            seed: None,
            max_nudge: 100,
            nudge_permutations: 10,
            reorder: true,
            theta: 0.0,
        }
    }
}

/// Quality after one pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: String,
    #[serde(flatten)]
    pub summary: ReferenceSummary,
}

/// Per-stage quality of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annealing: Option<AnnealingStats>,
}

impl PipelineReport {
    /// Summary after the last stage that ran
    #[must_use]
    pub fn final_summary(&self) -> Option<&ReferenceSummary> {
        self.stages.last().map(|stage| &stage.summary)
    }
}

struct StageRecorder<'a> {
    graph: &'a AdjacencyGraph,
    desired: &'a AdjacencyGraph,
    stages: Vec<StageReport>,
}

impl StageRecorder<'_> {
    fn record(&mut self, stage: &str, reference: &Reference) {
        let summary = ReferenceSummary::measure(self.graph, self.desired, reference);
        info!(
            "{}: {} intervals, {} nodes, score {:.3} of possible {:.3}, {} bad adjacencies",
            stage,
            summary.interval_count,
            summary.node_count,
            summary.score,
            summary.max_possible_score,
            summary.bad_adjacency_count
        );
        log_reference(reference);
        self.stages.push(StageReport {
            stage: stage.to_string(),
            summary,
        });
    }
}

/// Build and optimise `reference` in place: greedy construction, greedy
/// permutation, annealing, topological reordering and nudging, skipping stages
/// the configuration disables.
///
/// # Panics
///
/// Panics if `config.wiggle` is outside `(0, 1]`.
pub fn run_pipeline(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    config: &ScaffoldConfig,
) -> PipelineReport {
    build_greedily(graph, desired, reference, config.wiggle);
    optimise(graph, desired, reference, config, "greedy construction")
}

/// As [`run_pipeline`], but seeding construction with chains chosen by a
/// matching `oracle`.
///
/// # Errors
///
/// Returns the oracle's error if matching fails.
///
/// # Panics
///
/// Panics if `config.wiggle` is outside `(0, 1]`.
pub fn run_pipeline_with_matching<O>(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    config: &ScaffoldConfig,
    oracle: &O,
) -> Result<PipelineReport, MatchingError>
where
    O: MatchingOracle + ?Sized,
{
    build_from_matching(graph, desired, reference, oracle, config.wiggle)?;
    Ok(optimise(
        graph,
        desired,
        reference,
        config,
        "matching construction",
    ))
}

fn optimise(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    config: &ScaffoldConfig,
    construction: &str,
) -> PipelineReport {
    let mut recorder = StageRecorder {
        graph,
        desired,
        stages: Vec::new(),
    };
    recorder.record(construction, reference);

    if config.permutations > 0 {
        update_greedily(graph, desired, reference, config.permutations);
        recorder.record("greedy permutation", reference);
    }

    let mut annealing = None;
    if config.anneal_steps > 0 {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        annealing = Some(anneal(
            graph,
            reference,
            config.anneal_steps,
            &config.schedule,
            &mut rng,
        ));
        recorder.record("annealing", reference);
    }

    if config.reorder {
        reorder_to_avoid_breakpoints(graph, reference);
        recorder.record("topological reordering", reference);
    }

    if config.nudge_permutations > 0 {
        nudge_greedily(
            desired,
            graph,
            reference,
            config.nudge_permutations,
            config.max_nudge,
        );
        recorder.record("nudging", reference);
    }

    PipelineReport {
        stages: recorder.stages,
        annealing,
    }
}
