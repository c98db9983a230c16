use std::collections::BTreeMap;

use crate::core::types::segment_of;
use crate::scoring::zscore::{zscore, LinkEvidence};

/// A weighted edge leaving a side, as yielded by [`AdjacencyGraph::neighbors`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// Side at the other end of the edge
    pub to: i64,

    /// Adjacency weight (never zero)
    pub weight: f64,
}

impl Edge {
    #[must_use]
    pub fn new(to: i64, weight: f64) -> Self {
        Self { to, weight }
    }
}

/// Sparse, symmetric weighted graph over segment sides.
///
/// Sides are signed segment ids in `-node_count..=node_count` excluding zero.
/// Each unordered pair holds at most one weight; unset pairs weigh zero. The
/// sum of all stored weights is maintained on every mutation so that
/// [`max_possible_score`](Self::max_possible_score) stays O(1).
#[derive(Debug, Clone, Default)]
pub struct AdjacencyGraph {
    node_count: u64,

    /// Both directions of every pair are stored so neighbor walks are direct
    adjacency: BTreeMap<i64, BTreeMap<i64, f64>>,

    total_weight: f64,
    weight_count: usize,
}

impl AdjacencyGraph {
    /// Create a graph over segments `1..=node_count`
    #[must_use]
    pub fn new(node_count: u64) -> Self {
        Self {
            node_count,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn node_count(&self) -> u64 {
        self.node_count
    }

    /// Number of distinct side pairs carrying a nonzero weight
    #[must_use]
    pub fn weight_count(&self) -> usize {
        self.weight_count
    }

    /// Sum of every stored weight: the score of a reference realising all of them
    #[must_use]
    pub fn max_possible_score(&self) -> f64 {
        self.total_weight
    }

    /// Weight between two sides, zero when unset
    #[must_use]
    pub fn weight(&self, a: i64, b: i64) -> f64 {
        self.adjacency
            .get(&a)
            .and_then(|edges| edges.get(&b))
            .copied()
            .unwrap_or(0.0)
    }

    /// Weight realised when placement `left` is immediately followed by `right`.
    ///
    /// The right-hand side of `left` is `-left` and the left-hand side of
    /// `right` is `right`, so this is `weight(-left, right)`.
    #[must_use]
    pub fn link_weight(&self, left: i64, right: i64) -> f64 {
        self.weight(-left, right)
    }

    /// Overwrite the weight between two sides.
    ///
    /// # Panics
    ///
    /// Panics if either side is zero, lies outside the graph, or `a == b`.
    pub fn set_weight(&mut self, a: i64, b: i64, weight: f64) {
        self.check_pair(a, b);
        let old = self.weight(a, b);
        if weight == 0.0 {
            if old != 0.0 {
                self.remove_directed(a, b);
                self.remove_directed(b, a);
                self.weight_count -= 1;
            }
        } else {
            self.adjacency.entry(a).or_default().insert(b, weight);
            self.adjacency.entry(b).or_default().insert(a, weight);
            if old == 0.0 {
                self.weight_count += 1;
            }
        }
        self.total_weight += weight - old;
    }

    /// Accumulate into the weight between two sides.
    ///
    /// # Panics
    ///
    /// Same preconditions as [`set_weight`](Self::set_weight).
    pub fn add_to_weight(&mut self, a: i64, b: i64, weight: f64) {
        let current = self.weight(a, b);
        self.set_weight(a, b, current + weight);
    }

    /// Fold one piece of linkage evidence into the graph, scored with
    /// [`zscore`] under per-base decay `theta`
    pub fn add_evidence(&mut self, evidence: &LinkEvidence, theta: f64) {
        let score = evidence.support
            * zscore(evidence.length_a, evidence.length_b, evidence.gap, theta);
        self.add_to_weight(evidence.side_a, evidence.side_b, score);
    }

    /// Sides adjacent to `side` with nonzero weight, in ascending side order.
    ///
    /// The iterator borrows the graph; call again to restart.
    pub fn neighbors(&self, side: i64) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency
            .get(&side)
            .into_iter()
            .flat_map(|edges| edges.iter().map(|(&to, &weight)| Edge::new(to, weight)))
    }

    /// Every stored pair once, as `(a, b, weight)` with `a < b`
    pub fn edges(&self) -> impl Iterator<Item = (i64, i64, f64)> + '_ {
        self.adjacency.iter().flat_map(|(&a, edges)| {
            edges
                .iter()
                .filter(move |&(&b, _)| a < b)
                .map(move |(&b, &weight)| (a, b, weight))
        })
    }

    fn remove_directed(&mut self, a: i64, b: i64) {
        if let Some(edges) = self.adjacency.get_mut(&a) {
            edges.remove(&b);
            if edges.is_empty() {
                self.adjacency.remove(&a);
            }
        }
    }

    fn check_pair(&self, a: i64, b: i64) {
        assert!(a != b, "self loop on side {a} is not allowed");
        for side in [a, b] {
            let segment = segment_of(side);
            assert!(
                segment <= self.node_count,
                "side {side} is outside a graph of {} segments",
                self.node_count
            );
        }
    }
}
