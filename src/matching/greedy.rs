use crate::matching::{check_edges, MatchingError, MatchingOracle, WeightedEdge};

/// Repeatedly take the heaviest edge whose endpoints are both free.
///
/// Ties keep input order. Not optimal, but a 1/2-approximation of the maximum
/// weight matching and needs no external program.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyMatching;

impl MatchingOracle for GreedyMatching {
    fn choose_matching(
        &self,
        edges: &[WeightedEdge],
        node_count: usize,
    ) -> Result<Vec<WeightedEdge>, MatchingError> {
        check_edges(edges, node_count)?;
        let mut sorted = edges.to_vec();
        // stable, so equal weights keep input order
        sorted.sort_by(|x, y| y.weight.total_cmp(&x.weight));

        let mut covered = vec![false; node_count];
        let mut matching = Vec::new();
        for edge in sorted {
            if !covered[edge.a] && !covered[edge.b] {
                covered[edge.a] = true;
                covered[edge.b] = true;
                matching.push(edge);
            }
        }
        Ok(matching)
    }
}
