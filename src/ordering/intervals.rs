use std::collections::BTreeSet;

use tracing::debug;

use crate::core::reference::Reference;
use crate::core::types::segment_of;

/// Split the reference after every node `n` for which `predicate(n, reference)`
/// holds, minting stubs `maximum_node() + 1` and `+ 2` for each split.
///
/// Candidate split points are taken from a snapshot of the adjacencies before
/// any split, so new stubs are never offered to the predicate. Returns the new
/// stubs pairwise in creation order: the stub ending the left part, then the
/// stub starting the right part.
pub fn split_at_indicated_locations<F>(reference: &mut Reference, mut predicate: F) -> Vec<i64>
where
    F: FnMut(i64, &Reference) -> bool,
{
    let candidates: Vec<i64> = reference.adjacencies().map(|(left, _)| left).collect();
    let mut stubs = Vec::new();
    for node in candidates {
        if !predicate(node, reference) {
            continue;
        }
        let stub1 = reference.maximum_node() + 1;
        let stub2 = stub1 + 1;
        reference.split_interval(node, stub1, stub2);
        stubs.extend([stub1, stub2]);
    }
    debug!(
        "Split reference at {} locations into {} intervals",
        stubs.len() / 2,
        reference.interval_count()
    );
    stubs
}

/// Undo splits made by [`split_at_indicated_locations`].
///
/// `extra_stubs` is the pairwise list that function returned. A pair is merged
/// away when its first stub still ends an interval and its second starts a
/// different one, unless either stub bounds an interval listed in `preserve`
/// as `(first, last)`. Pairs with a stub no longer in the reference are
/// dropped. Returns the stubs that remain, pairwise in the original order.
///
/// # Panics
///
/// Panics if `extra_stubs` has odd length.
pub fn remake_reference_intervals(
    reference: &mut Reference,
    preserve: &[(i64, i64)],
    extra_stubs: &[i64],
) -> Vec<i64> {
    assert!(
        extra_stubs.len() % 2 == 0,
        "stub list must hold pairs, got {} stubs",
        extra_stubs.len()
    );
    let protected: BTreeSet<u64> = preserve
        .iter()
        .flat_map(|&(first, last)| [segment_of(first), segment_of(last)])
        .collect();

    let mut remaining = Vec::new();
    let mut merged = 0usize;
    for pair in extra_stubs.chunks_exact(2) {
        let (stub1, stub2) = (pair[0], pair[1]);
        if !reference.contains(stub1) || !reference.contains(stub2) {
            continue;
        }
        let mergeable = !protected.contains(&segment_of(stub1))
            && !protected.contains(&segment_of(stub2))
            && reference.next(stub1).is_none()
            && reference.previous(stub2).is_none()
            && reference.first(stub1) != reference.first(stub2);
        if mergeable {
            reference.merge_intervals(stub1, stub2);
            merged += 1;
        } else {
            remaining.extend([stub1, stub2]);
        }
    }
    debug!(
        "Remade reference: merged {} stub pairs, {} stubs remain",
        merged,
        remaining.len()
    );
    remaining
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> Reference {
        let mut reference = Reference::new();
        reference.make_new_interval(1, 2);
        let mut after = 1;
        for node in [3, -4, 5, 6] {
            reference.insert_node(after, node);
            after = node;
        }
        reference
    }

    #[test]
    fn test_split_mints_fresh_stubs() {
        let mut reference = filled();
        let stubs = split_at_indicated_locations(&mut reference, |node, _| node == 3 || node == 5);
        assert_eq!(stubs, vec![7, 8, 9, 10]);
        assert_eq!(reference.interval_count(), 3);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, 7]);
        assert_eq!(reference.walk(8).collect::<Vec<_>>(), vec![8, -4, 5, 9]);
        assert_eq!(reference.walk(10).collect::<Vec<_>>(), vec![10, 6, 2]);
    }

    #[test]
    fn test_predicate_sees_reference() {
        let mut reference = filled();
        let stubs = split_at_indicated_locations(&mut reference, |node, reference| {
            reference.remaining_interval_length(node) == 1
        });
        // only 6 is followed by exactly one node
        assert_eq!(stubs, vec![7, 8]);
        assert_eq!(reference.last(6), 7);
    }

    #[test]
    fn test_remake_restores_split() {
        let mut reference = filled();
        let original: Vec<(i64, i64)> = reference.adjacencies().collect();
        let stubs = split_at_indicated_locations(&mut reference, |_, _| true);
        assert_eq!(stubs.len(), 10);
        assert_eq!(reference.interval_count(), 6);

        let remaining = remake_reference_intervals(&mut reference, &[], &stubs);
        assert!(remaining.is_empty());
        assert_eq!(reference.interval_count(), 1);
        assert_eq!(reference.adjacencies().collect::<Vec<_>>(), original);
        assert_eq!(reference.maximum_node(), 16);
    }

    #[test]
    fn test_remake_honours_preserved_intervals() {
        let mut reference = filled();
        let stubs = split_at_indicated_locations(&mut reference, |node, _| node == 3 || node == 5);
        // keep the middle interval 8 .. 9 apart
        let remaining = remake_reference_intervals(&mut reference, &[(8, 9)], &stubs);
        assert_eq!(remaining, vec![7, 8, 9, 10]);
        assert_eq!(reference.interval_count(), 3);
    }

    #[test]
    fn test_remake_drops_absent_stubs() {
        let mut reference = filled();
        let stubs = split_at_indicated_locations(&mut reference, |node, _| node == 3 || node == 5);
        reference.remove_intervals([10]);
        let remaining = remake_reference_intervals(&mut reference, &[], &stubs);
        assert!(remaining.is_empty());
        assert_eq!(reference.interval_count(), 1);
        assert_eq!(reference.walk(1).collect::<Vec<_>>(), vec![1, 3, -4, 5, 9]);
    }

    #[test]
    #[should_panic(expected = "stub list must hold pairs")]
    fn test_odd_stub_list_rejected() {
        let mut reference = filled();
        let _ = remake_reference_intervals(&mut reference, &[], &[7]);
    }
}
