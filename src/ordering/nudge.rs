use tracing::debug;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::core::types::{segment_of, segment_to_signed};
use crate::ordering::{tolerance, Relocation};
use crate::scoring::diagnostics::{bad_adjacency_count, is_bad_adjacency};

/// Gaps within `max_nudge` positions of `node`: its current predecessor (an
/// in-place flip), then leftwards, then rightwards.
fn nearby_anchors(reference: &Reference, node: i64, max_nudge: usize) -> Vec<i64> {
    let mut anchors = Vec::with_capacity(2 * max_nudge + 1);
    let mut left = reference.previous(node);
    for _ in 0..=max_nudge {
        let Some(anchor) = left else { break };
        anchors.push(anchor);
        left = reference.previous(anchor);
    }
    let mut right = reference.next(node);
    for _ in 0..max_nudge {
        let Some(anchor) = right else { break };
        right = reference.next(anchor);
        if right.is_none() {
            break;
        }
        anchors.push(anchor);
    }
    anchors
}

/// Best nearby move of either end of a bad adjacency: largest bad-count
/// reduction, then largest gain, among moves that strictly reduce the bad count
/// without lowering the score.
fn best_nudge(
    desired: &AdjacencyGraph,
    graph: &AdjacencyGraph,
    reference: &Reference,
    pair: (i64, i64),
    max_nudge: usize,
) -> Option<Relocation> {
    let slack = tolerance(graph);
    let mut best: Option<(Relocation, i64, f64)> = None;
    for node in [pair.0, pair.1] {
        if reference.is_endpoint(node) {
            continue;
        }
        let id = segment_of(node);
        let forward = segment_to_signed(id);
        for anchor in nearby_anchors(reference, node, max_nudge) {
            for value in [forward, -forward] {
                let relocation = Relocation::new(id, anchor, value);
                let bad = relocation.bad_delta(desired, reference);
                if bad >= 0 {
                    continue;
                }
                let gain = relocation.gain(graph, reference);
                if gain < -slack {
                    continue;
                }
                let better = best.map_or(true, |(_, top_bad, top_gain)| {
                    bad < top_bad || (bad == top_bad && gain > top_gain + slack)
                });
                if better {
                    best = Some((relocation, bad, gain));
                }
            }
        }
    }
    best.map(|(relocation, _, _)| relocation)
}

/// Up to `permutations` rounds of repairing adjacencies without `desired`
/// evidence by moving one of their two segments at most `max_nudge` positions
/// (or flipping it in place). Moves never lower the `graph` score and always
/// strictly lower the bad-adjacency count. Stops early after a round with no
/// moves.
pub fn nudge_greedily(
    desired: &AdjacencyGraph,
    graph: &AdjacencyGraph,
    reference: &mut Reference,
    permutations: usize,
    max_nudge: usize,
) {
    for round in 0..permutations {
        let bad_pairs: Vec<(i64, i64)> = reference
            .adjacencies()
            .filter(|&(left, right)| is_bad_adjacency(desired, left, right))
            .collect();
        let mut moves = 0usize;
        for (left, right) in bad_pairs {
            // earlier moves may have already fixed or broken up this pair
            let unchanged = reference.orientation(left) && reference.next(left) == Some(right);
            if !unchanged || !is_bad_adjacency(desired, left, right) {
                continue;
            }
            if let Some(relocation) = best_nudge(desired, graph, reference, (left, right), max_nudge)
            {
                relocation.apply(reference);
                moves += 1;
            }
        }
        debug!(
            "Nudge round {}: {} moves, {} bad adjacencies remain",
            round + 1,
            moves,
            bad_adjacency_count(desired, reference)
        );
        if moves == 0 {
            break;
        }
    }
}
