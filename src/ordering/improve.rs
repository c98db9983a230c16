//! Local search over single-segment relocations.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::core::types::{segment_of, segment_to_signed};
use crate::ordering::{gap_anchors, movable_segments, tolerance, Relocation};
use crate::scoring::diagnostics::reference_score;

/// Best relocation of segment `id` over every gap and both orientations, with
/// its score gain. Among equal gains the move leaving fewer adjacencies without
/// `desired` evidence wins, then the earliest gap.
fn best_relocation(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &Reference,
    id: u64,
) -> Option<(Relocation, f64)> {
    let slack = tolerance(graph);
    let forward = segment_to_signed(id);
    let mut best: Option<(Relocation, f64, i64)> = None;
    for anchor in gap_anchors(reference) {
        if segment_of(anchor) == id {
            continue;
        }
        for value in [forward, -forward] {
            let relocation = Relocation::new(id, anchor, value);
            let gain = relocation.gain(graph, reference);
            let replace = match best {
                None => true,
                Some((_, top, _)) if gain > top + slack => true,
                Some((_, top, top_bad)) if gain >= top - slack => {
                    relocation.bad_delta(desired, reference) < top_bad
                }
                Some(_) => false,
            };
            if replace {
                let bad = relocation.bad_delta(desired, reference);
                best = Some((relocation, gain, bad));
            }
        }
    }
    best.map(|(relocation, gain, _)| (relocation, gain))
}

/// Up to `permutations` rounds of moving each non-stub segment to its best
/// position and orientation anywhere in the reference. A move is applied only
/// if it strictly raises the score, so the score never decreases. Stops early
/// after a round with no moves.
pub fn update_greedily(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    permutations: usize,
) {
    let slack = tolerance(graph);
    for round in 0..permutations {
        let mut moves = 0usize;
        for id in movable_segments(reference) {
            if let Some((relocation, gain)) = best_relocation(graph, desired, reference, id) {
                if gain > slack {
                    relocation.apply(reference);
                    moves += 1;
                }
            }
        }
        debug!(
            "Greedy permutation round {}: {} moves, score {:.3}",
            round + 1,
            moves,
            reference_score(graph, reference)
        );
        if moves == 0 {
            break;
        }
    }
}

/// Temperature as a function of progress through an annealing run, in `[0, 1]`.
///
/// Temperatures at or below zero never accept a score decrease.
pub trait TemperatureSchedule {
    fn temperature(&self, progress: f64) -> f64;
}

impl<F> TemperatureSchedule for F
where
    F: Fn(f64) -> f64,
{
    fn temperature(&self, progress: f64) -> f64 {
        self(progress)
    }
}

/// Configurable temperature schedules
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Schedule {
    /// Zero temperature: only improvements are accepted
    #[default]
    Greedy,
    Constant {
        temperature: f64,
    },
    /// `initial * exp(-rate * progress)`
    Exponential {
        initial: f64,
        rate: f64,
    },
}

impl TemperatureSchedule for Schedule {
    fn temperature(&self, progress: f64) -> f64 {
        match *self {
            Self::Greedy => 0.0,
            Self::Constant { temperature } => temperature,
            Self::Exponential { initial, rate } => initial * (-rate * progress).exp(),
        }
    }
}

/// Unit temperature throughout
#[must_use]
pub fn constant_temperature(_progress: f64) -> f64 {
    1.0
}

/// `10000 * exp(-10 * progress)`
#[must_use]
pub fn exponentially_decreasing_temperature(progress: f64) -> f64 {
    10_000.0 * (-10.0 * progress).exp()
}

/// Outcome of an annealing run
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnnealingStats {
    pub proposed: usize,
    pub accepted: usize,

    /// Accepted moves that raised the score
    pub improving: usize,

    /// Accepted moves that lowered the score
    pub worsening: usize,

    pub start_score: f64,
    pub best_score: f64,

    /// Score after rewinding to the best state seen
    pub final_score: f64,
}

/// Metropolis search over `steps` random relocations.
///
/// Each step moves a random non-stub segment after a random node, in a random
/// orientation. Improvements beyond rounding slack are always accepted; any
/// other move is accepted with probability `exp(gain / t)` where `t` is the
/// schedule's temperature at the current progress. At the end the reference is
/// rewound to the best state seen, so the final score is never below the
/// starting score.
pub fn anneal<S, R>(
    graph: &AdjacencyGraph,
    reference: &mut Reference,
    steps: usize,
    schedule: &S,
    rng: &mut R,
) -> AnnealingStats
where
    S: TemperatureSchedule + ?Sized,
    R: Rng + ?Sized,
{
    let start_score = reference_score(graph, reference);
    let mut stats = AnnealingStats {
        start_score,
        best_score: start_score,
        final_score: start_score,
        ..AnnealingStats::default()
    };
    let movable = movable_segments(reference);
    if movable.is_empty() || steps == 0 {
        return stats;
    }
    // stubs never move, so the set of gap owners is fixed for the run
    let anchors: Vec<u64> = gap_anchors(reference)
        .into_iter()
        .map(i64::unsigned_abs)
        .collect();

    let slack = tolerance(graph);
    let mut score = start_score;
    let mut journal: Vec<Relocation> = Vec::new();
    #[allow(clippy::cast_precision_loss)]
    let total = steps as f64;

    for step in 0..steps {
        #[allow(clippy::cast_precision_loss)]
        let progress = step as f64 / total;
        let id = movable[rng.gen_range(0..movable.len())];
        let anchor = loop {
            let candidate = anchors[rng.gen_range(0..anchors.len())];
            if candidate != id {
                break segment_to_signed(candidate);
            }
        };
        let forward = segment_to_signed(id);
        let value = if rng.gen::<bool>() { forward } else { -forward };
        let relocation = Relocation::new(id, anchor, value);
        let gain = relocation.gain(graph, reference);
        stats.proposed += 1;

        let temperature = schedule.temperature(progress);
        let accept = gain > slack
            || (temperature > 0.0 && rng.gen::<f64>() < (gain / temperature).exp());
        if !accept {
            continue;
        }
        stats.accepted += 1;
        if gain > slack {
            stats.improving += 1;
        } else if gain < -slack {
            stats.worsening += 1;
        }
        journal.push(relocation.apply(reference));
        score += gain;
        if score > stats.best_score + slack {
            stats.best_score = score;
            journal.clear();
        }
    }

    let rewound = journal.len();
    while let Some(undo) = journal.pop() {
        undo.apply(reference);
    }
    stats.final_score = reference_score(graph, reference);
    debug!(
        "Annealing: {} of {} moves accepted ({} improving, {} worsening), rewound {}, score {:.3} -> {:.3}",
        stats.accepted,
        stats.proposed,
        stats.improving,
        stats.worsening,
        rewound,
        stats.start_score,
        stats.final_score
    );
    stats
}
