//! Ordering algorithms on seeded random problems.
//!
//! Problems have random weights between arbitrary sides; the desired graph
//! keeps only weights above 0.8, so nudging always has something to repair.

use std::collections::BTreeSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ref_scaffold::matching::greedy::GreedyMatching;
use ref_scaffold::ordering::greedy::{build_from_matching, build_greedily};
use ref_scaffold::ordering::improve::{anneal, update_greedily, Schedule};
use ref_scaffold::ordering::intervals::{remake_reference_intervals, split_at_indicated_locations};
use ref_scaffold::ordering::nudge::nudge_greedily;
use ref_scaffold::ordering::reorder::reorder_to_avoid_breakpoints;
use ref_scaffold::scoring::diagnostics::{bad_adjacency_count, reference_score};
use ref_scaffold::scoring::zscore::LinkEvidence;
use ref_scaffold::{run_pipeline, AdjacencyGraph, Reference, ScaffoldConfig};

const TRIALS: u64 = 10;

struct Problem {
    node_count: i64,
    graph: AdjacencyGraph,
    desired: AdjacencyGraph,
    reference: Reference,
}

fn random_side(rng: &mut StdRng, node_count: i64) -> i64 {
    loop {
        let side = rng.gen_range(-node_count..=node_count);
        if side != 0 {
            return side;
        }
    }
}

fn setup(rng: &mut StdRng) -> Problem {
    let node_count: i64 = rng.gen_range(1..30) * 2;
    let interval_count = if node_count > 2 {
        rng.gen_range(1..node_count / 2)
    } else {
        1
    };
    let weight_count = rng.gen_range(0..node_count * node_count);
    let segments = node_count.unsigned_abs();

    let mut graph = AdjacencyGraph::new(segments);
    let mut desired = AdjacencyGraph::new(segments);
    for _ in 0..weight_count {
        let a = random_side(rng, node_count);
        let b = random_side(rng, node_count);
        if a.abs() == b.abs() {
            continue;
        }
        let score: f64 = rng.gen();
        graph.add_to_weight(a, b, score);
        if score > 0.8 && desired.weight(a, b) == 0.0 {
            desired.add_to_weight(a, b, score);
        }
    }

    let mut reference = Reference::new();
    for i in 0..interval_count {
        reference.make_new_interval(2 * i + 1, 2 * i + 2);
    }
    Problem {
        node_count,
        graph,
        desired,
        reference,
    }
}

fn assert_valid(reference: &Reference, node_count: i64) {
    let mut seen = BTreeSet::new();
    for (first, last) in reference.intervals() {
        let nodes: Vec<i64> = reference.walk(first).collect();
        assert_eq!(nodes.last(), Some(&last));
        for &node in &nodes {
            assert!(seen.insert(node.unsigned_abs()), "node {node} placed twice");
            assert_eq!(reference.first(node), first);
        }
    }
    assert_eq!(
        seen,
        (1..=node_count.unsigned_abs()).collect::<BTreeSet<_>>()
    );
}

fn slack(graph: &AdjacencyGraph) -> f64 {
    1e-9 * graph.max_possible_score().abs().max(1.0)
}

#[test]
fn test_stages_never_lower_the_score() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..TRIALS {
        let mut p = setup(&mut rng);
        build_greedily(&p.graph, &p.desired, &mut p.reference, 0.99);
        assert_valid(&p.reference, p.node_count);
        let greedy = reference_score(&p.graph, &p.reference);

        update_greedily(&p.graph, &p.desired, &mut p.reference, 10);
        assert_valid(&p.reference, p.node_count);
        let permuted = reference_score(&p.graph, &p.reference);
        assert!(permuted >= greedy - slack(&p.graph));

        reorder_to_avoid_breakpoints(&p.graph, &mut p.reference);
        assert_valid(&p.reference, p.node_count);
        let reordered = reference_score(&p.graph, &p.reference);
        let reordered_bad = bad_adjacency_count(&p.desired, &p.reference);
        assert!(reordered >= permuted - slack(&p.graph));

        nudge_greedily(&p.desired, &p.graph, &mut p.reference, 10, 100);
        assert_valid(&p.reference, p.node_count);
        let nudged = reference_score(&p.graph, &p.reference);
        assert!(nudged >= reordered - slack(&p.graph));
        assert!(bad_adjacency_count(&p.desired, &p.reference) <= reordered_bad);
        assert!(nudged <= p.graph.max_possible_score() + slack(&p.graph));
    }
}

#[test]
fn test_split_then_remake_restores_order() {
    let mut rng = StdRng::seed_from_u64(12);
    for _ in 0..TRIALS {
        let mut p = setup(&mut rng);
        build_greedily(&p.graph, &p.desired, &mut p.reference, 0.99);
        let before: Vec<Vec<i64>> = p
            .reference
            .intervals()
            .map(|(first, _)| p.reference.walk(first).collect())
            .collect();
        let original: Vec<(i64, i64)> = p.reference.intervals().collect();

        let mut split_rng = StdRng::seed_from_u64(rng.gen());
        let stubs = split_at_indicated_locations(&mut p.reference, |_, _| split_rng.gen::<f64>() > 0.5);
        assert_eq!(stubs.len() % 2, 0);
        let split_count = i64::try_from(stubs.len()).unwrap();
        assert_valid(&p.reference, p.node_count + split_count);
        assert_eq!(p.reference.interval_count(), original.len() + stubs.len() / 2);

        let remaining = remake_reference_intervals(&mut p.reference, &original, &stubs);
        assert!(remaining.is_empty());
        let after: Vec<Vec<i64>> = p
            .reference
            .intervals()
            .map(|(first, _)| p.reference.walk(first).collect())
            .collect();
        assert_eq!(after, before);
    }
}

#[test]
fn test_matching_construction_places_everything() {
    let mut rng = StdRng::seed_from_u64(13);
    for _ in 0..TRIALS {
        let mut p = setup(&mut rng);
        build_from_matching(&p.graph, &p.desired, &mut p.reference, &GreedyMatching, 0.99)
            .unwrap();
        assert_valid(&p.reference, p.node_count);
    }
}

#[test]
fn test_annealing_keeps_best_ordering() {
    let mut rng = StdRng::seed_from_u64(14);
    for _ in 0..TRIALS {
        let mut p = setup(&mut rng);
        build_greedily(&p.graph, &p.desired, &mut p.reference, 0.99);
        let start = reference_score(&p.graph, &p.reference);
        let schedule = Schedule::Exponential {
            initial: 1.0,
            rate: 10.0,
        };
        let mut anneal_rng = StdRng::seed_from_u64(rng.gen());
        let stats = anneal(&p.graph, &mut p.reference, 500, &schedule, &mut anneal_rng);
        assert_valid(&p.reference, p.node_count);
        let end = reference_score(&p.graph, &p.reference);
        assert!(end >= start - slack(&p.graph));
        assert!((stats.final_score - end).abs() <= slack(&p.graph));
        assert!(stats.accepted <= stats.proposed);
    }
}

/// Evidence between two sides of length-2 segments at theta 0, where every
/// read pair scores `2 * 2`
fn paired_evidence(graph: &mut AdjacencyGraph, side_a: i64, side_b: i64, gap: u64, pairs: u32) {
    let evidence = LinkEvidence {
        side_a,
        side_b,
        gap,
        length_a: 2,
        length_b: 2,
        support: f64::from(pairs),
    };
    graph.add_evidence(&evidence, 0.0);
}

/// Segments A and C are the stubs; B and D have to go between them as
/// A-D-B-D-C evidence allows
#[test]
fn test_adbdc_reaches_optimum() {
    let (a, c, b, d) = (1, 2, 3, 4);
    let (gap, length) = (1, 2);
    let n = 100;

    let mut graph = AdjacencyGraph::new(4);
    paired_evidence(&mut graph, a, b, 2 * gap + length, n - 1);
    paired_evidence(&mut graph, a, -b, 2 * gap + length, 1);
    paired_evidence(&mut graph, a, d, gap, n);
    paired_evidence(&mut graph, a, -d, 3 * gap + 2 * length, n);
    paired_evidence(&mut graph, a, c, 4 * gap + 3 * length, n);
    paired_evidence(&mut graph, c, b, 2 * gap + length, 1);
    paired_evidence(&mut graph, c, -b, 2 * gap + length, n - 1);
    paired_evidence(&mut graph, c, d, gap + length, n);
    paired_evidence(&mut graph, c, -d, 3 * gap + 2 * length, n);
    paired_evidence(&mut graph, -d, b, gap, n);
    paired_evidence(&mut graph, -d, -b, gap, n);

    let mut reference = Reference::new();
    reference.make_new_interval(-c, a);
    build_greedily(&graph, &graph, &mut reference, 0.99);
    update_greedily(&graph, &graph, &mut reference, 100);
    assert_valid(&reference, 4);

    let mut realised: Vec<(i64, i64)> = reference
        .adjacencies()
        .map(|(left, right)| {
            let (x, y) = (-left, right);
            (x.min(y), x.max(y))
        })
        .collect();
    realised.sort_unstable();
    let first = vec![(-d, -b), (a, b), (c, d)];
    let second = vec![(-d, b), (-b, c), (a, d)];
    assert!(
        realised == first || realised == second,
        "unexpected adjacencies {realised:?}"
    );

    let summed = |edges: &[(i64, i64)]| -> f64 {
        edges.iter().map(|&(x, y)| graph.weight(x, y)).sum()
    };
    assert!((summed(&first) - summed(&second)).abs() < 1e-9);
    assert!((reference_score(&graph, &reference) - summed(&realised)).abs() < 1e-9);
}

#[test]
fn test_pipeline_end_to_end() {
    let mut rng = StdRng::seed_from_u64(15);
    for _ in 0..TRIALS {
        let mut p = setup(&mut rng);
        let config = ScaffoldConfig {
            anneal_steps: 200,
            seed: Some(3),
            ..ScaffoldConfig::default()
        };
        let report = run_pipeline(&p.graph, &p.desired, &mut p.reference, &config);
        assert_valid(&p.reference, p.node_count);
        let summary = report.final_summary().unwrap();
        assert!((summary.score - reference_score(&p.graph, &p.reference)).abs() <= slack(&p.graph));
        assert!(report.annealing.is_some());
        assert_eq!(report.stages.first().unwrap().stage, "greedy construction");
    }
}
