// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end evaluation of small synthetic pages.

use segeval::{
    DocumentScore, Evaluator, MatchKind, Point, Region, RegionSet, Role, SignificanceRule,
    SweepCurve, Tally, Threshold, Warning, aggregate, evaluate_document, evaluate_document_sweep,
};

fn l_shape(label: &str, x: f64, y: f64) -> Region {
    Region::new(
        label,
        vec![
            Point::new(x, y),
            Point::new(x + 60.0, y),
            Point::new(x + 60.0, y + 20.0),
            Point::new(x + 30.0, y + 20.0),
            Point::new(x + 30.0, y + 40.0),
            Point::new(x, y + 40.0),
        ],
    )
}

/// Header, a paragraph split in two, two lines merged into one, a concave
/// figure, a missed caption and a spurious detection.
fn page() -> (RegionSet, RegionSet) {
    let reference = RegionSet::new(
        "page",
        Role::Reference,
        vec![
            Region::rectangle("header", 0.0, 0.0, 100.0, 10.0),
            Region::rectangle("text", 0.0, 20.0, 100.0, 30.0),
            Region::rectangle("text", 0.0, 60.0, 100.0, 10.0),
            Region::rectangle("text", 0.0, 72.0, 100.0, 8.0),
            l_shape("figure", 0.0, 90.0),
            Region::rectangle("caption", 70.0, 90.0, 30.0, 10.0),
        ],
    );
    let test = RegionSet::new(
        "page",
        Role::Test,
        vec![
            Region::rectangle("header", 0.0, 0.0, 100.0, 10.0),
            Region::rectangle("text", 0.0, 20.0, 100.0, 15.0),
            Region::rectangle("text", 0.0, 35.0, 100.0, 15.0),
            Region::rectangle("text", 0.0, 58.0, 100.0, 24.0),
            Region::rectangle("figure", 0.0, 90.0, 60.0, 40.0),
            Region::rectangle("text", 200.0, 200.0, 10.0, 10.0),
        ],
    );
    (reference, test)
}

fn assert_accounting(tally: &Tally) {
    let r = &tally.by_reference;
    assert_eq!(
        r.correct + r.split + r.merge + r.complex + r.missed,
        tally.reference_regions
    );
    assert_eq!(r.false_detection, 0);
    let s = &tally.by_test;
    assert_eq!(
        s.correct + s.split + s.merge + s.complex + s.false_detection,
        tally.test_regions
    );
    assert_eq!(s.missed, 0);
}

#[test]
fn test_page_classification() {
    let (reference, test) = page();
    let score = evaluate_document(&reference, &test, 0.5).unwrap();
    let tally = score.tally;
    assert_accounting(&tally);

    assert_eq!(tally.reference_regions, 6);
    assert_eq!(tally.test_regions, 6);
    assert_eq!(tally.by_reference.correct, 2);
    assert_eq!(tally.by_reference.split, 1);
    assert_eq!(tally.by_reference.merge, 2);
    assert_eq!(tally.by_reference.missed, 1);
    assert_eq!(tally.by_test.correct, 2);
    assert_eq!(tally.by_test.split, 2);
    assert_eq!(tally.by_test.merge, 1);
    assert_eq!(tally.by_test.false_detection, 1);
    assert_eq!(tally.correspondences.get(MatchKind::Split), 1);
    assert_eq!(tally.correspondences.get(MatchKind::Merge), 1);

    assert_eq!(tally.links.significant_links, 6);
    assert_eq!(tally.links.over_segmented, 1);
    assert_eq!(tally.links.extra_splits, 1);
    assert_eq!(tally.links.under_segmented, 1);
    assert_eq!(tally.links.extra_merges, 1);

    assert!((tally.region_accuracy() - 2.0 / 6.0).abs() < 1e-12);
    assert!((tally.false_detection_rate() - 1.0 / 6.0).abs() < 1e-12);
    assert!(score.warnings.is_empty());
}

#[test]
fn test_page_split_lost_above_half() {
    let (reference, test) = page();
    let tally = evaluate_document(&reference, &test, 0.6).unwrap().tally;
    assert_accounting(&tally);
    assert_eq!(tally.by_reference.split, 0);
    assert_eq!(tally.by_reference.missed, 2);
    assert_eq!(tally.by_test.false_detection, 3);
    assert_eq!(tally.by_reference.merge, 2);
}

#[test]
fn test_page_sweep_is_monotone() {
    let (reference, test) = page();
    let thresholds: Vec<f64> = (1..=10).map(|k| k as f64 / 10.0).collect();
    let sweep = evaluate_document_sweep(&reference, &test, &thresholds).unwrap();
    assert_eq!(sweep.len(), 10);

    let tallies: Vec<&Tally> = sweep.values().map(|s| &s.tally).collect();
    for tally in &tallies {
        assert_accounting(tally);
    }
    for pair in tallies.windows(2) {
        let (lower, higher) = (pair[0], pair[1]);
        assert!(higher.links.significant_links <= lower.links.significant_links);
        assert!(higher.by_reference.missed >= lower.by_reference.missed);
        assert!(higher.by_test.false_detection >= lower.by_test.false_detection);
    }

    let curve = SweepCurve::from_documents(&sweep);
    assert_eq!(curve.points.len(), 10);
    assert!(curve.points.windows(2).all(|w| w[0].threshold < w[1].threshold));
}

#[test]
fn test_identical_sets_are_all_correct() {
    let regions = vec![
        l_shape("figure", 0.0, 0.0),
        Region::new(
            "text",
            vec![
                Point::new(100.0, 0.0),
                Point::new(140.0, 10.0),
                Point::new(110.0, 30.0),
            ],
        ),
        Region::rectangle("text", 0.1, 50.3, 33.3, 7.7),
    ];
    let reference = RegionSet::new("doc", Role::Reference, regions.clone());
    let test = RegionSet::new("doc", Role::Test, regions);

    for rule in [
        SignificanceRule::Reference,
        SignificanceRule::Smaller,
        SignificanceRule::Union,
        SignificanceRule::Coverage { relative: 0.2 },
    ] {
        let evaluator = Evaluator::new().with_rule(rule);
        for t in [0.01, 0.5, 0.99, 1.0] {
            let tally = evaluator.evaluate(&reference, &test, t).unwrap().tally;
            assert_eq!(tally.by_reference.correct, 3, "{} at {}", rule, t);
            assert_eq!(tally.by_test.correct, 3);
            assert_eq!(tally.region_accuracy(), 1.0);
            assert_eq!(tally.false_detection_rate(), 0.0);
        }
    }
}

#[test]
fn test_disjoint_sets() {
    let reference = RegionSet::new(
        "doc",
        Role::Reference,
        vec![
            Region::rectangle("text", 0.0, 0.0, 10.0, 10.0),
            Region::rectangle("text", 20.0, 0.0, 10.0, 10.0),
        ],
    );
    let test = RegionSet::new(
        "doc",
        Role::Test,
        vec![
            // Shares an edge with the first reference region.
            Region::rectangle("text", 10.0, 0.0, 10.0, 10.0),
            Region::rectangle("text", 0.0, 50.0, 10.0, 10.0),
            Region::rectangle("text", 50.0, 50.0, 10.0, 10.0),
        ],
    );
    for t in [0.1, 0.5, 1.0] {
        let tally = evaluate_document(&reference, &test, t).unwrap().tally;
        assert_eq!(tally.by_reference.missed, 2);
        assert_eq!(tally.by_test.false_detection, 3);
        assert_eq!(tally.links.significant_links, 0);
        assert_eq!(tally.region_accuracy(), 0.0);
    }
}

#[test]
fn test_empty_test_set() {
    let (reference, _) = page();
    let test = RegionSet::new("page", Role::Test, Vec::new());
    let score = evaluate_document(&reference, &test, 0.5).unwrap();
    assert_eq!(score.tally.by_reference.missed, 6);
    assert_eq!(score.tally.by_test.false_detection, 0);
    assert_eq!(score.tally.region_accuracy(), 0.0);
    assert_eq!(score.tally.false_detection_rate(), 0.0);
    assert_eq!(
        score.warnings,
        vec![Warning::EmptySet {
            role: Role::Test,
            excluded: 0
        }]
    );
}

#[test]
fn test_overlapping_regions_within_a_set() {
    let reference = RegionSet::new(
        "doc",
        Role::Reference,
        vec![
            Region::rectangle("text", 0.0, 0.0, 10.0, 10.0),
            Region::rectangle("text", 5.0, 0.0, 10.0, 10.0),
        ],
    );
    let test = RegionSet::new(
        "doc",
        Role::Test,
        vec![Region::rectangle("text", 0.0, 0.0, 15.0, 10.0)],
    );
    let tally = evaluate_document(&reference, &test, 0.9).unwrap().tally;
    assert_eq!(tally.by_reference.merge, 2);
    assert_eq!(tally.by_test.merge, 1);
}

#[test]
fn test_corpus_micro_average() {
    let (reference, test) = page();
    let identical = RegionSet::new("page", Role::Test, reference.regions().to_vec());
    let pairs = vec![(reference.clone(), test), (reference, identical)];

    let result = Evaluator::new()
        .evaluate_corpus(&pairs, &[0.5], None)
        .unwrap();
    let corpus = &result.corpus[&Threshold::new(0.5).unwrap()];
    assert_eq!(corpus.documents, 2);
    assert_eq!(corpus.tally.reference_regions, 12);
    assert_eq!(corpus.tally.by_reference.correct, 8);
    assert!((corpus.tally.region_accuracy() - 8.0 / 12.0).abs() < 1e-12);

    let scores: Vec<DocumentScore> = result
        .documents
        .iter()
        .flat_map(|sweep| sweep.values().cloned())
        .collect();
    assert_eq!(&aggregate(&scores).unwrap(), corpus);
}

#[test]
fn test_empty_reference_set() {
    let (_, test) = page();
    let reference = RegionSet::new("page", Role::Reference, Vec::new());
    let score = evaluate_document(&reference, &test, 0.5).unwrap();
    let tally = &score.tally;
    assert_accounting(tally);
    assert_eq!(tally.reference_regions, 0);
    assert_eq!(tally.by_test.false_detection, 6);
    assert_eq!(tally.correspondences.get(MatchKind::FalseDetection), 6);
    assert_eq!(tally.links.significant_links, 0);
    assert_eq!(tally.region_accuracy(), 1.0);
    assert_eq!(tally.false_detection_rate(), 1.0);
    assert_eq!(
        score.warnings,
        vec![Warning::EmptySet {
            role: Role::Reference,
            excluded: 0
        }]
    );
}

#[test]
fn test_all_reference_regions_invalid() {
    let (_, test) = page();
    let reference = RegionSet::new(
        "page",
        Role::Reference,
        vec![
            Region::new("text", vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]),
            Region::new(
                "text",
                vec![
                    Point::new(0.0, 0.0),
                    Point::new(5.0, 5.0),
                    Point::new(10.0, 10.0),
                ],
            ),
        ],
    );
    let score = evaluate_document(&reference, &test, 0.5).unwrap();
    let tally = &score.tally;
    assert_accounting(tally);
    assert_eq!(tally.reference_regions, 0);
    assert_eq!(tally.excluded_references, 2);
    assert_eq!(tally.by_test.false_detection, 6);
    assert_eq!(tally.region_accuracy(), 1.0);

    assert_eq!(score.warnings.len(), 3);
    assert!(
        score.warnings[..2]
            .iter()
            .all(|w| matches!(w, Warning::ExcludedRegion { role: Role::Reference, .. }))
    );
    assert_eq!(
        score.warnings[2],
        Warning::EmptySet {
            role: Role::Reference,
            excluded: 2
        }
    );
}

#[test]
fn test_small_region_inside_large_region() {
    let reference = RegionSet::new(
        "plate",
        Role::Reference,
        vec![Region::rectangle("page", 0.0, 0.0, 100_000.0, 100_000.0)],
    );
    let test = RegionSet::new(
        "plate",
        Role::Test,
        vec![Region::rectangle("stamp", 10.0, 10.0, 3.0, 3.0)],
    );

    let smaller = Evaluator::new()
        .with_rule(SignificanceRule::Smaller)
        .evaluate(&reference, &test, 0.9)
        .unwrap()
        .tally;
    assert_eq!(smaller.by_reference.correct, 1);
    assert_eq!(smaller.by_test.false_detection, 0);

    let by_reference = evaluate_document(&reference, &test, 0.9).unwrap().tally;
    assert_eq!(by_reference.by_reference.missed, 1);
    assert_eq!(by_reference.by_test.false_detection, 1);
}
