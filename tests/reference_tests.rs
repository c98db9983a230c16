//! Structural tests of the reference on randomly sized problems.
//!
//! Each problem has `n` segments (even), with the first `2k` opened as `k`
//! stub intervals `(2i + 1, 2i + 2)` and the rest appended to the first
//! interval in id order.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ref_scaffold::Reference;

const TRIALS: u64 = 20;

struct Problem {
    node_count: i64,
    interval_count: i64,
    reference: Reference,
}

fn setup(rng: &mut StdRng) -> Problem {
    let node_count = rng.gen_range(1..100) * 2;
    let interval_count = if node_count > 2 {
        rng.gen_range(1..node_count / 2)
    } else {
        1
    };
    let mut reference = Reference::new();
    for i in 0..interval_count {
        reference.make_new_interval(2 * i + 1, 2 * i + 2);
    }
    Problem {
        node_count,
        interval_count,
        reference,
    }
}

fn fill(problem: &mut Problem) {
    for n in (2 * problem.interval_count + 1)..=problem.node_count {
        let after = if n - 1 > 2 * problem.interval_count {
            n - 1
        } else {
            1
        };
        problem.reference.insert_node(after, n);
    }
}

/// Every segment `1..=node_count` appears exactly once, and every node agrees
/// with its interval about where it starts and ends
fn assert_valid(reference: &Reference, node_count: i64) {
    let mut seen = BTreeSet::new();
    for (first, last) in reference.intervals() {
        let nodes: Vec<i64> = reference.walk(first).collect();
        assert_eq!(nodes.first(), Some(&first));
        assert_eq!(nodes.last(), Some(&last));
        for &node in &nodes {
            assert!(node != 0 && node.abs() <= node_count, "node {node} out of range");
            assert!(seen.insert(node.unsigned_abs()), "node {node} placed twice");
            assert_eq!(reference.first(node), first);
            assert_eq!(reference.last(node), last);
        }
    }
    assert_eq!(seen.len(), reference.node_count());
    assert_eq!(
        seen,
        (1..=node_count.unsigned_abs()).collect::<BTreeSet<_>>()
    );
}

#[test]
fn test_fresh_intervals() {
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..TRIALS {
        let problem = setup(&mut rng);
        let reference = &problem.reference;
        assert_eq!(
            reference.interval_count(),
            usize::try_from(problem.interval_count).unwrap()
        );
        for j in 0..problem.interval_count {
            let (left, right) = (2 * j + 1, 2 * j + 2);
            let index = usize::try_from(j).unwrap();
            assert_eq!(reference.first_of_interval(index), left);
            assert_eq!(reference.last_of_interval(index), right);
            assert_eq!(reference.next(left), Some(right));
            assert_eq!(reference.next(right), None);
            assert_eq!(reference.previous(left), None);
            assert_eq!(reference.previous(right), Some(left));
            assert_eq!(reference.last(left), right);
            assert_eq!(reference.first(right), left);
            assert!(reference.contains(left) && reference.contains(-right));
            assert_eq!(reference.compare(left, right), Ordering::Less);
            assert_eq!(reference.compare(right, left), Ordering::Greater);
            assert_eq!(reference.compare(right, right), Ordering::Equal);
            assert!(reference.orientation(left));
            assert!(!reference.orientation(-left));
            assert!(reference.orientation(right));
            assert!(!reference.orientation(-right));
        }
    }
}

#[test]
fn test_filled_reference_is_valid() {
    let mut rng = StdRng::seed_from_u64(2);
    for _ in 0..TRIALS {
        let mut problem = setup(&mut rng);
        fill(&mut problem);
        assert_valid(&problem.reference, problem.node_count);
        assert_eq!(problem.reference.maximum_node(), problem.node_count);
    }
}

#[test]
fn test_compare_follows_walk_order() {
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..TRIALS {
        let mut problem = setup(&mut rng);
        fill(&mut problem);
        let reference = &problem.reference;
        let order: Vec<i64> = reference
            .intervals()
            .flat_map(|(first, _)| reference.walk(first))
            .collect();
        for pair in order.windows(2) {
            assert_eq!(reference.compare(pair[0], pair[1]), Ordering::Less);
            assert_eq!(reference.compare(-pair[1], pair[0]), Ordering::Greater);
        }
    }
}

#[test]
fn test_remove_intervals() {
    let mut rng = StdRng::seed_from_u64(4);
    for _ in 0..TRIALS {
        let mut problem = setup(&mut rng);
        fill(&mut problem);
        let mut remaining_nodes = problem.reference.node_count();
        while problem.reference.interval_count() > 0 {
            let index = rng.gen_range(0..problem.reference.interval_count());
            let first = problem.reference.first_of_interval(index);
            let nodes: Vec<i64> = problem.reference.walk(first).collect();
            let before = problem.reference.interval_count();

            problem.reference.remove_intervals([first]);
            for node in &nodes {
                assert!(!problem.reference.contains(*node));
            }
            remaining_nodes -= nodes.len();
            assert_eq!(problem.reference.interval_count(), before - 1);
            assert_eq!(problem.reference.node_count(), remaining_nodes);
        }
        assert_eq!(problem.reference.node_count(), 0);
    }
}

#[test]
fn test_random_splits() {
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..TRIALS {
        let mut problem = setup(&mut rng);
        fill(&mut problem);
        let mut node_count = problem.node_count;
        while rng.gen::<f64>() > 0.1 {
            let index = rng.gen_range(0..problem.reference.interval_count());
            let mut n = problem.reference.first_of_interval(index);
            while problem.reference.next(n).is_some() && rng.gen::<f64>() > 0.5 {
                n = problem.reference.next(n).unwrap();
            }
            let Some(m) = problem.reference.next(n) else {
                continue;
            };
            let reference = &mut problem.reference;
            let intervals = reference.interval_count();
            let first = reference.first(n);
            let last = reference.last(n);
            let (stub1, stub2) = (node_count + 1, node_count + 2);

            reference.split_interval(n, stub1, stub2);
            assert_eq!(reference.interval_count(), intervals + 1);
            assert_eq!(reference.next(n), Some(stub1));
            assert_eq!(reference.previous(stub1), Some(n));
            assert_eq!(reference.next(stub2), Some(m));
            assert_eq!(reference.previous(m), Some(stub2));
            assert_eq!(reference.first(stub1), first);
            assert_eq!(reference.first(n), first);
            assert_eq!(reference.last(n), stub1);
            assert_eq!(reference.first(m), stub2);
            assert_eq!(reference.last(stub2), last);
            assert_eq!(reference.last(m), last);
            assert_eq!(reference.last_of_interval(intervals), last);

            node_count += 2;
            assert_valid(reference, node_count);
        }
    }
}

#[test]
fn test_display_lists_intervals() {
    let mut reference = Reference::new();
    reference.make_new_interval(1, 2);
    reference.insert_node(1, -3);
    let text = reference.to_string();
    assert!(text.starts_with("Reference: 1 intervals, 3 nodes"));
    assert!(text.contains("1 -3 2"));
}
