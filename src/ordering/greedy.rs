//! Initial assembly of unplaced segments into a stub-only or partial reference.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};

use tracing::{debug, warn};

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::core::types::{segment_of, segment_to_signed, Placement};
use crate::matching::{MatchingError, MatchingOracle, WeightedEdge};
use crate::ordering::best_insertion;
use crate::scoring::diagnostics::is_bad_adjacency;

/// An edge from a side of a placed node to a side of an unplaced segment
#[derive(Debug, Clone, Copy)]
struct Candidate {
    weight: f64,

    /// Side of the placed node
    anchor: i64,

    /// Side of the unplaced segment that will face `anchor`
    side: i64,

    /// Discovery order, earlier wins ties
    sequence: u64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Where a segment goes to realise the edge between `anchor` and `side`:
/// `(after, value)` for [`Reference::insert_node`].
fn insertion_point(reference: &Reference, anchor: i64, side: i64) -> (i64, i64) {
    let placement = reference.placement(anchor);
    if placement.right_side() == anchor {
        (placement.signed(), side)
    } else {
        let before = reference
            .previous(anchor)
            .unwrap_or_else(|| panic!("outer side {anchor} of a first stub is not insertable"));
        (before, -side)
    }
}

/// Gap faced by `anchor` as `(left, right)` placements, `None` for the outer
/// side of a stub
fn facing_gap(reference: &Reference, anchor: i64) -> Option<(i64, i64)> {
    let placement = reference.placement(anchor);
    if placement.right_side() == anchor {
        reference.next(anchor).map(|next| (placement.signed(), next))
    } else {
        reference.previous(anchor).map(|prev| (prev, placement.signed()))
    }
}

/// Working state of one greedy run
struct GreedyBuilder<'a> {
    graph: &'a AdjacencyGraph,
    desired: &'a AdjacencyGraph,
    unplaced: BTreeSet<u64>,
    heap: BinaryHeap<Candidate>,
    sequence: u64,
}

impl<'a> GreedyBuilder<'a> {
    fn new(graph: &'a AdjacencyGraph, desired: &'a AdjacencyGraph, reference: &Reference) -> Self {
        let unplaced = (1..=graph.node_count())
            .filter(|&id| !reference.contains(segment_to_signed(id)))
            .collect();
        let mut builder = Self {
            graph,
            desired,
            unplaced,
            heap: BinaryHeap::new(),
            sequence: 0,
        };
        for (first, _) in reference.intervals() {
            for node in reference.walk(first) {
                builder.push_candidates(reference, node);
            }
        }
        builder
    }

    /// Whether the gap `anchor` faces is still open: its link carries no
    /// evidence, or it lies between the two stubs of an empty interval
    fn is_open(&self, reference: &Reference, anchor: i64) -> bool {
        facing_gap(reference, anchor).is_some_and(|(left, right)| {
            self.graph.link_weight(left, right) <= 0.0
                || (reference.previous(left).is_none() && reference.next(right).is_none())
        })
    }

    fn is_live(&self, reference: &Reference, candidate: &Candidate) -> bool {
        self.unplaced.contains(&segment_of(candidate.side))
            && self.is_open(reference, candidate.anchor)
    }

    /// Queue every positive edge from `anchor` to an unplaced segment, if the
    /// gap `anchor` faces is open
    fn push_side(&mut self, reference: &Reference, anchor: i64) {
        if !self.is_open(reference, anchor) {
            return;
        }
        for edge in self.graph.neighbors(anchor) {
            if edge.weight > 0.0 && self.unplaced.contains(&segment_of(edge.to)) {
                self.heap.push(Candidate {
                    weight: edge.weight,
                    anchor,
                    side: edge.to,
                    sequence: self.sequence,
                });
                self.sequence += 1;
            }
        }
    }

    fn push_candidates(&mut self, reference: &Reference, node: i64) {
        let placement = reference.placement(node);
        self.push_side(reference, placement.left_side());
        self.push_side(reference, placement.right_side());
    }

    /// Pop until a live candidate turns up
    fn pop_live(&mut self, reference: &Reference) -> Option<Candidate> {
        while let Some(candidate) = self.heap.pop() {
            if self.is_live(reference, &candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Number of adjacencies with `desired` evidence the candidate would create
    fn support(&self, reference: &Reference, candidate: &Candidate) -> usize {
        let (after, value) = insertion_point(reference, candidate.anchor, candidate.side);
        let next = reference
            .next(after)
            .expect("insertion points always have a successor");
        [(after, value), (value, next)]
            .into_iter()
            .filter(|&(left, right)| !is_bad_adjacency(self.desired, left, right))
            .count()
    }

    /// Best live candidate weighing at least `wiggle` times the heaviest live
    /// one. The rest of the band goes back on the heap.
    fn choose(&mut self, reference: &Reference, wiggle: f64) -> Option<Candidate> {
        let top = self.pop_live(reference)?;
        let threshold = top.weight * wiggle;
        let mut band = vec![top];
        while let Some(candidate) = self.pop_live(reference) {
            if candidate.weight < threshold {
                self.heap.push(candidate);
                break;
            }
            band.push(candidate);
        }

        let mut best = 0;
        let mut best_support = self.support(reference, &band[0]);
        for (index, candidate) in band.iter().enumerate().skip(1) {
            let support = self.support(reference, candidate);
            if support > best_support
                || (support == best_support && candidate.weight > band[best].weight)
            {
                best = index;
                best_support = support;
            }
        }
        let chosen = band.swap_remove(best);
        self.heap.extend(band);
        Some(chosen)
    }

    fn place(&mut self, reference: &mut Reference, after: i64, value: i64) {
        reference.insert_node(after, value);
        self.unplaced.remove(&segment_of(value));
        self.push_candidates(reference, value);
    }

    /// Requeue the sides of `value`'s neighbours that now face it
    fn push_neighbours(&mut self, reference: &Reference, value: i64) {
        if let Some(prev) = reference.previous(value) {
            self.push_side(reference, Placement::from_signed(prev).right_side());
        }
        if let Some(next) = reference.next(value) {
            self.push_side(reference, Placement::from_signed(next).left_side());
        }
    }
}

/// Place every segment of `graph` not yet in `reference`, repeatedly realising
/// the heaviest available edge between a side of a placed node and an unplaced
/// segment.
///
/// A placed side is available while the gap it faces is open: the link across
/// it has no weight in `graph`, or the gap is all of an empty interval. Every
/// insertion realises its edge and so closes the gap on that side; links
/// realised inside an interval are never broken by a later insertion.
///
/// Candidates weighing at least `wiggle` times the heaviest are treated as near
/// ties: the one creating more adjacencies supported by `desired` wins, then the
/// heavier, then the earlier discovered. Segments with no evidence reaching an
/// open gap are seeded at their best-gain gap and extension continues.
///
/// Does nothing (with a warning) if segments are unplaced but the reference has
/// no intervals to put them in.
///
/// # Panics
///
/// Panics unless `0 < wiggle <= 1`.
pub fn build_greedily(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    wiggle: f64,
) {
    assert!(
        wiggle > 0.0 && wiggle <= 1.0,
        "wiggle must lie in (0, 1], got {wiggle}"
    );
    let mut builder = GreedyBuilder::new(graph, desired, reference);
    if builder.unplaced.is_empty() {
        return;
    }
    if reference.interval_count() == 0 {
        warn!(
            "No intervals to place {} segments into; leaving the reference empty",
            builder.unplaced.len()
        );
        return;
    }

    let mut by_edge = 0usize;
    let mut seeded = 0usize;
    loop {
        while let Some(candidate) = builder.choose(reference, wiggle) {
            let (after, value) = insertion_point(reference, candidate.anchor, candidate.side);
            builder.place(reference, after, value);
            by_edge += 1;
        }
        let Some(&id) = builder.unplaced.iter().next() else {
            break;
        };
        let (after, value) = best_insertion(graph, reference, id)
            .expect("reference has at least one interval");
        builder.place(reference, after, value);
        builder.push_neighbours(reference, value);
        seeded += 1;
    }
    debug!(
        "Greedy construction placed {} segments by edge and seeded {}",
        by_edge, seeded
    );
}

/// Assemble chains chosen by a matching over the open stub sides and every
/// side of every unplaced segment, then finish with [`build_greedily`].
///
/// Each interval is extended inward from both stubs for as long as matched
/// partners lead to unplaced segments. Chains not reachable from a stub are
/// left to the greedy pass.
///
/// # Errors
///
/// Returns the oracle's error if matching fails.
///
/// # Panics
///
/// Panics unless `0 < wiggle <= 1`.
pub fn build_from_matching<O>(
    graph: &AdjacencyGraph,
    desired: &AdjacencyGraph,
    reference: &mut Reference,
    oracle: &O,
    wiggle: f64,
) -> Result<(), MatchingError>
where
    O: MatchingOracle + ?Sized,
{
    let mut stub_sides = BTreeSet::new();
    for (first, last) in reference.intervals() {
        stub_sides.insert(Placement::from_signed(first).right_side());
        stub_sides.insert(Placement::from_signed(last).left_side());
    }
    let mut sides: Vec<i64> = stub_sides.iter().copied().collect();
    for id in 1..=graph.node_count() {
        let forward = segment_to_signed(id);
        if !reference.contains(forward) {
            sides.extend([forward, -forward]);
        }
    }
    let index: BTreeMap<i64, usize> = sides.iter().enumerate().map(|(i, &s)| (s, i)).collect();

    let mut edges = Vec::new();
    for (a, b, weight) in graph.edges() {
        if weight <= 0.0 || (stub_sides.contains(&a) && stub_sides.contains(&b)) {
            continue;
        }
        if let (Some(&ia), Some(&ib)) = (index.get(&a), index.get(&b)) {
            if segment_of(a) != segment_of(b) {
                edges.push(WeightedEdge::new(ia, ib, weight));
            }
        }
    }

    let matching = oracle.choose_matching(&edges, sides.len())?;
    let mut partner = BTreeMap::new();
    for edge in &matching {
        partner.insert(sides[edge.a], sides[edge.b]);
        partner.insert(sides[edge.b], sides[edge.a]);
    }

    let mut placed = 0usize;
    let intervals: Vec<(i64, i64)> = reference.intervals().collect();
    for (first, last) in intervals {
        // rightwards from the first stub
        let mut after = first;
        let mut open = Placement::from_signed(first).right_side();
        while let Some(&side) = partner.get(&open) {
            if reference.contains(side) || stub_sides.contains(&side) {
                break;
            }
            reference.insert_node(after, side);
            placed += 1;
            after = side;
            open = -side;
        }
        // leftwards from the last stub
        let mut before = last;
        let mut open = Placement::from_signed(last).left_side();
        while let Some(&side) = partner.get(&open) {
            if reference.contains(side) || stub_sides.contains(&side) {
                break;
            }
            let previous = reference
                .previous(before)
                .expect("last stub always has a predecessor");
            reference.insert_node(previous, -side);
            placed += 1;
            before = -side;
            open = -side;
        }
    }
    debug!(
        "Matching of {} sides chose {} edges and placed {} segments",
        sides.len(),
        matching.len(),
        placed
    );

    build_greedily(graph, desired, reference, wiggle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::greedy::GreedyMatching;
    use crate::scoring::diagnostics::reference_score;

    fn chain_graph() -> AdjacencyGraph {
        // evidence for 1 3 -4 5 2
        let mut graph = AdjacencyGraph::new(5);
        graph.set_weight(-1, 3, 10.0);
        graph.set_weight(-3, -4, 9.0);
        graph.set_weight(4, 5, 8.0);
        graph.set_weight(-5, 2, 7.0);
        graph
    }

    #[test]
    fn test_greedy_follows_chain() {
        let graph = chain_graph();
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_greedily(&graph, &graph, &mut reference, 0.99);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, -4, 5, 2]);
        assert!((reference_score(&graph, &reference) - 34.0).abs() < 1e-9);
    }

    #[test]
    fn test_greedy_inserts_before_on_left_side_anchor() {
        let mut graph = AdjacencyGraph::new(3);
        // only evidence: 3 (reversed) directly before the last stub 2
        graph.set_weight(2, 3, 5.0);
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_greedily(&graph, &graph, &mut reference, 1.0);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, -3, 2]);
    }

    #[test]
    fn test_greedy_seeds_isolated_segments() {
        let mut graph = AdjacencyGraph::new(6);
        graph.set_weight(-5, 6, 1.0);
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_greedily(&graph, &graph, &mut reference, 0.99);
        assert_eq!(reference.node_count(), 6);
        for id in 1..=6 {
            assert!(reference.contains(id));
        }
        assert!(reference.is_consistent(-5, 6) || reference.is_consistent(5, -6));
    }

    #[test]
    fn test_greedy_without_intervals_is_noop() {
        let graph = chain_graph();
        let mut reference = Reference::new();
        build_greedily(&graph, &graph, &mut reference, 0.99);
        assert_eq!(reference.node_count(), 0);
    }

    #[test]
    fn test_wiggle_prefers_desired_support() {
        // 3 forward after the first stub, or reversed before the last stub
        let mut graph = AdjacencyGraph::new(3);
        graph.set_weight(-1, 3, 10.0);
        graph.set_weight(2, 3, 9.95);
        let mut desired = AdjacencyGraph::new(3);
        desired.set_weight(2, 3, 1.0);

        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_greedily(&graph, &desired, &mut reference, 0.99);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, -3, 2]);

        let mut strict = Reference::new();
        strict.make_new_interval(1, 2);
        build_greedily(&graph, &desired, &mut strict, 1.0);
        assert_eq!(strict.walk(1).collect::<Vec<_>>(), vec![1, 3, 2]);
    }

    #[test]
    fn test_wiggle_band_skips_stale_entries() {
        // once 3 is placed, the 10.0 edge to it is stale but still weighs in
        // the band of the 10.01 edge; the 1.0 edge must stay out of the band
        // even though only it has desired support
        let mut graph = AdjacencyGraph::new(4);
        graph.set_weight(-1, 3, 20.0);
        graph.set_weight(2, 3, 10.0);
        graph.set_weight(-3, 4, 10.01);
        graph.set_weight(2, 4, 1.0);
        let mut desired = AdjacencyGraph::new(4);
        desired.set_weight(2, 4, 1.0);

        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_greedily(&graph, &desired, &mut reference, 0.99);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_greedy_never_breaks_realised_links() {
        // after 1 3 2 both gaps carry evidence, so 4 may not split 1 from 3
        let mut graph = AdjacencyGraph::new(6);
        graph.set_weight(-1, 3, 10.0);
        graph.set_weight(-3, 2, 10.0);
        graph.set_weight(-1, 4, 9.0);

        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        reference.make_new_interval(5, 6);
        build_greedily(&graph, &graph, &mut reference, 1.0);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, 2]);
        assert_eq!(reference.walk(5).collect::<Vec<_>>(), vec![5, 4, 6]);
        assert!((reference_score(&graph, &reference) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_build_from_matching_follows_chains() {
        let graph = chain_graph();
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        build_from_matching(&graph, &graph, &mut reference, &GreedyMatching, 0.99).unwrap();
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, -4, 5, 2]);
    }

    #[test]
    #[should_panic(expected = "wiggle must lie in")]
    fn test_zero_wiggle_rejected() {
        let graph = chain_graph();
        let mut reference = Reference::new();
        build_greedily(&graph, &graph, &mut reference, 0.0);
    }
}
