use serde::Serialize;
use tracing::debug;

use crate::core::adjacency::AdjacencyGraph;
use crate::core::reference::Reference;

/// Sum of the link weights of every pair of consecutive placements
#[must_use]
pub fn reference_score(graph: &AdjacencyGraph, reference: &Reference) -> f64 {
    reference
        .adjacencies()
        .map(|(left, right)| graph.link_weight(left, right))
        .sum()
}

/// Number of consecutive placements with no direct link in `desired`
#[must_use]
pub fn bad_adjacency_count(desired: &AdjacencyGraph, reference: &Reference) -> usize {
    reference
        .adjacencies()
        .filter(|&(left, right)| is_bad_adjacency(desired, left, right))
        .count()
}

/// True when the consecutive placements `left`, `right` lack direct evidence
#[must_use]
pub fn is_bad_adjacency(desired: &AdjacencyGraph, left: i64, right: i64) -> bool {
    desired.link_weight(left, right) == 0.0
}

/// Quality figures for a reference, as logged between optimisation stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSummary {
    pub interval_count: usize,
    pub node_count: usize,
    pub score: f64,
    pub max_possible_score: f64,
    pub bad_adjacency_count: usize,
}

impl ReferenceSummary {
    #[must_use]
    pub fn measure(
        graph: &AdjacencyGraph,
        desired: &AdjacencyGraph,
        reference: &Reference,
    ) -> Self {
        Self {
            interval_count: reference.interval_count(),
            node_count: reference.node_count(),
            score: reference_score(graph, reference),
            max_possible_score: graph.max_possible_score(),
            bad_adjacency_count: bad_adjacency_count(desired, reference),
        }
    }
}

/// Emit the reference at debug level, one line per interval
pub fn log_reference(reference: &Reference) {
    for index in 0..reference.interval_count() {
        let first = reference.first_of_interval(index);
        let nodes: Vec<String> = reference.walk(first).map(|n| n.to_string()).collect();
        debug!("Interval {}: {}", index, nodes.join(" "));
    }
}
