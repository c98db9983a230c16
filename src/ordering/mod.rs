//! Construction and optimisation of a [`Reference`] against an
//! [`AdjacencyGraph`].
//!
//! Every algorithm here mutates the reference in place and only ever moves
//! non-stub segments, so interval endpoints are fixed for the whole run.
//!
//! - [`greedy`]: initial assembly, by weight or via a matching oracle
//! - [`improve`]: permutation-based greedy improvement and simulated annealing
//! - [`reorder`]: topological reordering of each interval
//! - [`nudge`]: local repair of adjacencies without direct evidence
//! - [`intervals`]: splitting and re-merging intervals
//! - [`pipeline`]: the configured end-to-end run

pub mod greedy;
pub mod improve;
pub mod intervals;
pub mod nudge;
pub mod pipeline;
pub mod reorder;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::core::types::segment_of;
use crate::scoring::diagnostics::is_bad_adjacency;

/// Relative slack below which two scores are considered equal
const SCORE_TOLERANCE: f64 = 1e-10;

/// Absolute score tolerance for comparisons on `graph`
pub(crate) fn tolerance(graph: &AdjacencyGraph) -> f64 {
    SCORE_TOLERANCE * graph.max_possible_score().abs().max(1.0)
}

/// Move of one segment to sit directly after `anchor` with signed value `value`.
///
/// An anchor equal to the segment's current predecessor re-orients it in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Relocation {
    pub node: u64,
    pub anchor: i64,
    pub value: i64,
}

impl Relocation {
    pub fn new(node: u64, anchor: i64, value: i64) -> Self {
        Self {
            node,
            anchor,
            value,
        }
    }

    /// Change in `Σ link(x, y)` over consecutive placements if this move were
    /// applied, without touching the reference.
    ///
    /// # Panics
    ///
    /// Panics if the node is an interval endpoint or is its own anchor.
    pub fn delta<F>(&self, reference: &Reference, link: F) -> f64
    where
        F: Fn(i64, i64) -> f64,
    {
        let current = reference.placement(signed_id(self.node)).signed();
        let (prev, next) = neighbours(reference, current);
        assert!(
            segment_of(self.anchor) != self.node,
            "segment {} cannot be placed after itself",
            self.node
        );
        let detached = link(prev, current) + link(current, next);
        if segment_of(self.anchor) == segment_of(prev) {
            return link(prev, self.value) + link(self.value, next) - detached;
        }
        let after = reference
            .next(self.anchor)
            .unwrap_or_else(|| panic!("cannot move {current} after interval end {}", self.anchor));
        link(prev, next) - detached + link(self.anchor, self.value) + link(self.value, after)
            - link(self.anchor, after)
    }

    /// Score change under `graph`
    pub fn gain(&self, graph: &AdjacencyGraph, reference: &Reference) -> f64 {
        self.delta(reference, |left, right| graph.link_weight(left, right))
    }

    /// Change in the number of adjacencies lacking `desired` evidence
    pub fn bad_delta(&self, desired: &AdjacencyGraph, reference: &Reference) -> i64 {
        let delta = self.delta(reference, |left, right| {
            if is_bad_adjacency(desired, left, right) {
                1.0
            } else {
                0.0
            }
        });
        #[allow(clippy::cast_possible_truncation)]
        {
            delta.round() as i64
        }
    }

    /// Apply the move, returning the move that undoes it
    pub fn apply(&self, reference: &mut Reference) -> Relocation {
        let current = reference.placement(signed_id(self.node)).signed();
        let (prev, _) = neighbours(reference, current);
        reference.remove_node(current);
        reference.insert_node(self.anchor, self.value);
        Relocation::new(self.node, prev, current)
    }
}

fn neighbours(reference: &Reference, node: i64) -> (i64, i64) {
    match (reference.previous(node), reference.next(node)) {
        (Some(prev), Some(next)) => (prev, next),
        _ => panic!("interval endpoint {node} cannot be moved"),
    }
}

fn signed_id(id: u64) -> i64 {
    crate::core::types::segment_to_signed(id)
}

/// Segment ids of every non-stub node, in listing order
pub(crate) fn movable_segments(reference: &Reference) -> Vec<u64> {
    let mut segments = Vec::with_capacity(reference.node_count());
    for (first, last) in reference.intervals() {
        segments.extend(
            reference
                .walk(first)
                .skip(1)
                .take_while(|&node| node != last)
                .map(i64::unsigned_abs),
        );
    }
    segments
}

/// Every node that has a successor, i.e. every gap, in listing order
pub(crate) fn gap_anchors(reference: &Reference) -> Vec<i64> {
    let mut anchors = Vec::with_capacity(reference.node_count());
    for (first, last) in reference.intervals() {
        anchors.extend(reference.walk(first).take_while(|&node| node != last));
    }
    anchors
}

/// Change in score from inserting `value` directly after `after`
pub(crate) fn insertion_gain(
    graph: &AdjacencyGraph,
    reference: &Reference,
    after: i64,
    value: i64,
) -> f64 {
    let next = reference
        .next(after)
        .unwrap_or_else(|| panic!("cannot insert after interval end {after}"));
    graph.link_weight(after, value) + graph.link_weight(value, next)
        - graph.link_weight(after, next)
}

/// Gap and orientation giving segment `id` the largest insertion gain; the
/// earliest gap wins ties. `None` if the reference has no intervals.
pub(crate) fn best_insertion(
    graph: &AdjacencyGraph,
    reference: &Reference,
    id: u64,
) -> Option<(i64, i64)> {
    let forward = signed_id(id);
    let mut best: Option<(f64, i64, i64)> = None;
    for after in gap_anchors(reference) {
        for value in [forward, -forward] {
            let gain = insertion_gain(graph, reference, after, value);
            if best.map_or(true, |(top, _, _)| gain > top) {
                best = Some((gain, after, value));
            }
        }
    }
    best.map(|(_, after, value)| (after, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::diagnostics::{bad_adjacency_count, reference_score};

    /// 1 [3 -4 5] 2
    fn setup() -> (AdjacencyGraph, Reference) {
        let mut graph = AdjacencyGraph::new(5);
        graph.set_weight(-1, 3, 1.0);
        graph.set_weight(-3, -4, 2.0);
        graph.set_weight(4, 5, 3.0);
        graph.set_weight(-5, 2, 4.0);
        graph.set_weight(-1, 4, 0.5);
        graph.set_weight(-3, 5, 8.0);
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        reference.insert_node(1, 3);
        reference.insert_node(3, -4);
        reference.insert_node(-4, 5);
        (graph, reference)
    }

    #[test]
    fn test_delta_matches_rescoring() {
        let (graph, reference) = setup();
        let before = reference_score(&graph, &reference);
        for node in movable_segments(&reference) {
            for anchor in gap_anchors(&reference) {
                if segment_of(anchor) == node {
                    continue;
                }
                for value in [signed_id(node), -signed_id(node)] {
                    let relocation = Relocation::new(node, anchor, value);
                    let predicted = relocation.gain(&graph, &reference);
                    let bad = relocation.bad_delta(&graph, &reference);
                    let mut moved = reference.clone();
                    relocation.apply(&mut moved);
                    let after = reference_score(&graph, &moved);
                    assert!((after - before - predicted).abs() < 1e-9);
                    let bad_after = i64::try_from(bad_adjacency_count(&graph, &moved)).unwrap();
                    let bad_before =
                        i64::try_from(bad_adjacency_count(&graph, &reference)).unwrap();
                    assert_eq!(bad_after - bad_before, bad);
                }
            }
        }
    }

    #[test]
    fn test_apply_then_undo_restores() {
        let (_, mut reference) = setup();
        let original: Vec<i64> = reference.walk(1).collect();
        let undo = Relocation::new(3, -4, -3).apply(&mut reference);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, -4, -3, 5, 2]);
        undo.apply(&mut reference);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), original);

        let undo = Relocation::new(4, 3, 4).apply(&mut reference);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, 4, 5, 2]);
        undo.apply(&mut reference);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), original);
    }

    #[test]
    fn test_movable_segments_and_gaps() {
        let (_, mut reference) = setup();
        reference.make_new_interval(6, 7);
        assert_eq!(movable_segments(&reference), vec![3, 4, 5]);
        assert_eq!(gap_anchors(&reference), vec![1, 3, -4, 5, 6]);
    }

    #[test]
    fn test_best_insertion_prefers_earliest_on_ties() {
        let graph = AdjacencyGraph::new(3);
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        assert_eq!(best_insertion(&graph, &reference, 3), Some((1, 3)));
        assert_eq!(best_insertion(&graph, &Reference::new(), 3), None);
    }
}
