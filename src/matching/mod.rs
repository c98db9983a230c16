//! Weighted matching over side graphs.
//!
//! A [`MatchingOracle`] picks a set of vertex-disjoint edges from a weighted
//! edge list. [`GreedyMatching`](greedy::GreedyMatching) runs in process;
//! [`ExternalMatching`](external::ExternalMatching) delegates to a blossom5 or
//! `matchGraph.py` style program through temporary files.

pub mod external;
pub mod greedy;

use serde::{Deserialize, Serialize};

/// An edge between nodes `a` and `b` of a matching problem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

impl WeightedEdge {
    #[must_use]
    pub fn new(a: usize, b: usize, weight: f64) -> Self {
        Self { a, b, weight }
    }

    /// Endpoints in ascending order
    #[must_use]
    pub fn key(&self) -> (usize, usize) {
        (self.a.min(self.b), self.a.max(self.b))
    }
}

/// Errors from choosing a matching
#[derive(Debug, thiserror::Error)]
pub enum MatchingError {
    #[error("I/O error talking to matching program: {0}")]
    Io(#[from] std::io::Error),

    #[error("Matching program `{command}` failed with {status}")]
    ProgramFailed { command: String, status: String },

    #[error("Malformed matching output at line {line}: {message}")]
    MalformedOutput { line: usize, message: String },

    #[error("Matching covers {covered} of {node_count} nodes but a perfect matching was required")]
    ImperfectMatching { covered: usize, node_count: usize },

    #[error("Edge ({a}, {b}) is invalid for a problem of {node_count} nodes")]
    InvalidEdge { a: usize, b: usize, node_count: usize },
}

/// Chooses vertex-disjoint edges from a weighted edge list over nodes
/// `0..node_count`. Returned edges are always drawn from the input.
pub trait MatchingOracle {
    /// # Errors
    ///
    /// Returns an error if the underlying algorithm fails or the input holds an
    /// edge outside `0..node_count` or a self loop.
    fn choose_matching(
        &self,
        edges: &[WeightedEdge],
        node_count: usize,
    ) -> Result<Vec<WeightedEdge>, MatchingError>;
}

/// Number of matched edges with positive weight
#[must_use]
pub fn matching_cardinality(matching: &[WeightedEdge]) -> usize {
    matching.iter().filter(|edge| edge.weight > 0.0).count()
}

/// Sum of matched edge weights
#[must_use]
pub fn matching_weight(matching: &[WeightedEdge]) -> f64 {
    matching.iter().map(|edge| edge.weight).sum()
}

/// Reject self loops and nodes outside `0..node_count`
pub(crate) fn check_edges(edges: &[WeightedEdge], node_count: usize) -> Result<(), MatchingError> {
    match edges
        .iter()
        .find(|edge| edge.a == edge.b || edge.a >= node_count || edge.b >= node_count)
    {
        Some(edge) => Err(MatchingError::InvalidEdge {
            a: edge.a,
            b: edge.b,
            node_count,
        }),
        None => Ok(()),
    }
}

/// Whether no node is covered twice
#[must_use]
pub fn is_matching(matching: &[WeightedEdge], node_count: usize) -> bool {
    let mut seen = vec![false; node_count];
    for edge in matching {
        for node in [edge.a, edge.b] {
            match seen.get_mut(node) {
                Some(flag) if !*flag => *flag = true,
                _ => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_and_weight() {
        let matching = vec![
            WeightedEdge::new(0, 1, 3.0),
            WeightedEdge::new(2, 3, 0.0),
            WeightedEdge::new(4, 5, 1.5),
        ];
        assert_eq!(matching_cardinality(&matching), 2);
        assert!((matching_weight(&matching) - 4.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_matching() {
        let good = vec![WeightedEdge::new(0, 1, 1.0), WeightedEdge::new(3, 2, 1.0)];
        assert!(is_matching(&good, 4));
        let shared = vec![WeightedEdge::new(0, 1, 1.0), WeightedEdge::new(1, 2, 1.0)];
        assert!(!is_matching(&shared, 4));
        assert!(!is_matching(&good, 3));
    }

    #[test]
    fn test_check_edges() {
        assert!(check_edges(&[WeightedEdge::new(0, 1, 1.0)], 2).is_ok());
        assert!(matches!(
            check_edges(&[WeightedEdge::new(1, 1, 1.0)], 2),
            Err(MatchingError::InvalidEdge { .. })
        ));
        assert!(check_edges(&[WeightedEdge::new(0, 2, 1.0)], 2).is_err());
    }

    #[test]
    fn test_edge_key_is_unordered() {
        assert_eq!(WeightedEdge::new(5, 2, 1.0).key(), (2, 5));
    }
}
