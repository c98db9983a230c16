use std::collections::BTreeSet;

use tracing::debug;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;
use crate::core::types::segment_of;
use crate::ordering::tolerance;

/// Sum of link weights along a sequence of placements
fn path_score(graph: &AdjacencyGraph, path: &[i64]) -> f64 {
    path.windows(2)
        .map(|pair| graph.link_weight(pair[0], pair[1]))
        .sum()
}

/// Chain the interior of an interval from its first stub: each step takes the
/// unused segment with the heaviest link to the current node, oriented to
/// realise it, or the earliest unused segment in `interior` order when no link
/// leads anywhere.
fn chain_interior(graph: &AdjacencyGraph, first: i64, interior: &[i64]) -> Vec<i64> {
    let mut unused: BTreeSet<u64> = interior.iter().map(|&node| segment_of(node)).collect();
    let mut chain = Vec::with_capacity(interior.len());
    let mut current = first;
    while !unused.is_empty() {
        let mut best: Option<(f64, i64)> = None;
        for edge in graph.neighbors(-current) {
            if edge.weight > 0.0
                && unused.contains(&segment_of(edge.to))
                && best.map_or(true, |(weight, _)| edge.weight > weight)
            {
                best = Some((edge.weight, edge.to));
            }
        }
        let next = match best {
            Some((_, next)) => next,
            None => *interior
                .iter()
                .find(|&&node| unused.contains(&segment_of(node)))
                .expect("an unused segment remains"),
        };
        unused.remove(&segment_of(next));
        chain.push(next);
        current = next;
    }
    chain
}

/// Rebuild each interval's interior by chaining from its first stub along the
/// heaviest links, keeping the new order only where it strictly improves that
/// interval's score. Stubs stay put and membership is unchanged.
pub fn reorder_to_avoid_breakpoints(graph: &AdjacencyGraph, reference: &mut Reference) {
    let slack = tolerance(graph);
    let intervals: Vec<(i64, i64)> = reference.intervals().collect();
    let mut reordered = 0usize;
    for (first, last) in intervals {
        let interior: Vec<i64> = reference
            .walk(first)
            .skip(1)
            .take_while(|&node| node != last)
            .collect();
        if interior.is_empty() {
            continue;
        }
        let chain = chain_interior(graph, first, &interior);

        let with_stubs = |middle: &[i64]| {
            let mut path = Vec::with_capacity(middle.len() + 2);
            path.push(first);
            path.extend_from_slice(middle);
            path.push(last);
            path
        };
        let old_score = path_score(graph, &with_stubs(&interior));
        let new_score = path_score(graph, &with_stubs(&chain));
        if new_score <= old_score + slack {
            continue;
        }

        for &node in &interior {
            reference.remove_node(node);
        }
        let mut after = first;
        for &node in &chain {
            reference.insert_node(after, node);
            after = node;
        }
        reordered += 1;
        debug!(
            "Reordered interval starting at {}: score {:.3} -> {:.3}",
            first, old_score, new_score
        );
    }
    debug!("Topological reordering changed {} intervals", reordered);
}
