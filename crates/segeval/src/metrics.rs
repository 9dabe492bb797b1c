// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-document tallies, corpus aggregation and threshold-sweep curves.
//!
//! Corpus scores are micro-averaged: raw tallies are summed across documents
//! before any rate is computed, so large documents weigh more than small
//! ones.

use crate::{
    Error,
    classify::{Classification, MatchKind, Threshold},
    overlap::{OverlapMatrix, Warning},
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fmt,
    ops::{Add, AddAssign},
};

/// Count per [`MatchKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub correct: usize,
    pub split: usize,
    pub merge: usize,
    pub complex: usize,
    pub missed: usize,
    pub false_detection: usize,
}

impl KindCounts {
    pub fn get(&self, kind: MatchKind) -> usize {
        match kind {
            MatchKind::Correct => self.correct,
            MatchKind::Split => self.split,
            MatchKind::Merge => self.merge,
            MatchKind::Complex => self.complex,
            MatchKind::Missed => self.missed,
            MatchKind::FalseDetection => self.false_detection,
        }
    }

    fn record(&mut self, kind: MatchKind, n: usize) {
        let slot = match kind {
            MatchKind::Correct => &mut self.correct,
            MatchKind::Split => &mut self.split,
            MatchKind::Merge => &mut self.merge,
            MatchKind::Complex => &mut self.complex,
            MatchKind::Missed => &mut self.missed,
            MatchKind::FalseDetection => &mut self.false_detection,
        };
        *slot += n;
    }

    pub fn total(&self) -> usize {
        MatchKind::ALL.iter().map(|&kind| self.get(kind)).sum()
    }
}

impl Add for KindCounts {
    type Output = KindCounts;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for KindCounts {
    fn add_assign(&mut self, rhs: Self) {
        for kind in MatchKind::ALL {
            self.record(kind, rhs.get(kind));
        }
    }
}

/// Significant-link statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStats {
    /// Number of significant links.
    pub significant_links: usize,
    /// Reference regions with more than one significant link.
    pub over_segmented: usize,
    /// Test regions with more than one significant link.
    pub under_segmented: usize,
    /// Links beyond the first, summed over over-segmented reference regions.
    pub extra_splits: usize,
    /// Links beyond the first, summed over under-segmented test regions.
    pub extra_merges: usize,
}

impl AddAssign for LinkStats {
    fn add_assign(&mut self, rhs: Self) {
        self.significant_links += rhs.significant_links;
        self.over_segmented += rhs.over_segmented;
        self.under_segmented += rhs.under_segmented;
        self.extra_splits += rhs.extra_splits;
        self.extra_merges += rhs.extra_merges;
    }
}

/// Raw counts for one document, or summed over a corpus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Valid reference regions.
    pub reference_regions: usize,
    /// Valid test regions.
    pub test_regions: usize,
    /// Reference regions per kind of the correspondence holding them.
    /// `false_detection` is always zero.
    pub by_reference: KindCounts,
    /// Test regions per kind of the correspondence holding them.
    /// `missed` is always zero.
    pub by_test: KindCounts,
    /// Correspondences per kind.
    pub correspondences: KindCounts,
    pub links: LinkStats,
    pub excluded_references: usize,
    pub excluded_tests: usize,
}

fn rate(count: usize, total: usize, empty: f64) -> f64 {
    if total == 0 {
        empty
    } else {
        count as f64 / total as f64
    }
}

impl Tally {
    /// Count the classified correspondences of one document.
    pub fn from_classification(matrix: &OverlapMatrix, classification: &Classification) -> Self {
        let mut tally = Tally {
            reference_regions: matrix.reference_count(),
            test_regions: matrix.test_count(),
            excluded_references: matrix.excluded_references(),
            excluded_tests: matrix.excluded_tests(),
            ..Default::default()
        };

        for correspondence in classification.correspondences() {
            let kind = correspondence.kind;
            tally.by_reference.record(kind, correspondence.references.len());
            tally.by_test.record(kind, correspondence.tests.len());
            tally.correspondences.record(kind, 1);
        }

        let mut reference_links = vec![0usize; matrix.reference_len()];
        let mut test_links = vec![0usize; matrix.test_len()];
        for &(i, j) in classification.links() {
            reference_links[i] += 1;
            test_links[j] += 1;
        }
        tally.links.significant_links = classification.links().len();
        for &n in reference_links.iter().filter(|&&n| n > 1) {
            tally.links.over_segmented += 1;
            tally.links.extra_splits += n - 1;
        }
        for &n in test_links.iter().filter(|&&n| n > 1) {
            tally.links.under_segmented += 1;
            tally.links.extra_merges += n - 1;
        }

        tally
    }

    /// Share of reference regions matched one-to-one. 1.0 with no reference
    /// regions.
    pub fn region_accuracy(&self) -> f64 {
        rate(self.by_reference.correct, self.reference_regions, 1.0)
    }

    /// Share of test regions without any significant link. 0.0 with no test
    /// regions.
    pub fn false_detection_rate(&self) -> f64 {
        rate(self.by_test.false_detection, self.test_regions, 0.0)
    }

    /// Share of reference regions with at least one significant link.
    pub fn recall(&self) -> f64 {
        1.0 - rate(self.by_reference.missed, self.reference_regions, 0.0)
    }

    /// Share of test regions with at least one significant link.
    pub fn precision(&self) -> f64 {
        1.0 - self.false_detection_rate()
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.reference_regions += rhs.reference_regions;
        self.test_regions += rhs.test_regions;
        self.by_reference += rhs.by_reference;
        self.by_test += rhs.by_test;
        self.correspondences += rhs.correspondences;
        self.links += rhs.links;
        self.excluded_references += rhs.excluded_references;
        self.excluded_tests += rhs.excluded_tests;
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "║ Regions:      {} reference, {} test ({} / {} excluded)",
            self.reference_regions, self.test_regions, self.excluded_references, self.excluded_tests
        )?;
        writeln!(f, "║ {:<16}{:>10}{:>10}{:>10}", "", "reference", "test", "groups")?;
        for kind in MatchKind::ALL {
            writeln!(
                f,
                "║   {:<14}{:>10}{:>10}{:>10}",
                kind.as_str(),
                self.by_reference.get(kind),
                self.by_test.get(kind),
                self.correspondences.get(kind)
            )?;
        }
        writeln!(
            f,
            "║ Links:        {} significant, {} over-segmented (+{}), {} under-segmented (+{})",
            self.links.significant_links,
            self.links.over_segmented,
            self.links.extra_splits,
            self.links.under_segmented,
            self.links.extra_merges
        )?;
        Ok(())
    }
}

/// Evaluation result of one document at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentScore {
    pub document: String,
    pub threshold: Threshold,
    pub tally: Tally,
    pub warnings: Vec<Warning>,
}

const RULE: &str = "╠══════════════════════════════════════════════════════════════╣";

impl fmt::Display for DocumentScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                  SEGMENTATION EVALUATION                     ║"
        )?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "║ Document:     {}", self.document)?;
        writeln!(f, "║ Threshold:    {}", self.threshold)?;
        write!(f, "{}", self.tally)?;
        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "║ Region accuracy:      {:.1}%",
            self.tally.region_accuracy() * 100.0
        )?;
        writeln!(
            f,
            "║ False detection rate: {:.1}%",
            self.tally.false_detection_rate() * 100.0
        )?;
        if !self.warnings.is_empty() {
            writeln!(f, "{}", RULE)?;
            writeln!(f, "║ Warnings:     {}", self.warnings.len())?;
            for warning in self.warnings.iter().take(5) {
                writeln!(f, "║   - {}", warning)?;
            }
            if self.warnings.len() > 5 {
                writeln!(f, "║   ... and {} more", self.warnings.len() - 5)?;
            }
        }
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )?;
        Ok(())
    }
}

/// Micro-averaged score of many documents at one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusScore {
    pub threshold: Threshold,
    pub documents: usize,
    pub tally: Tally,
    /// Warnings summed over every document.
    pub warnings: usize,
}

impl fmt::Display for CorpusScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "╔══════════════════════════════════════════════════════════════╗"
        )?;
        writeln!(
            f,
            "║                    CORPUS EVALUATION                         ║"
        )?;
        writeln!(f, "{}", RULE)?;
        writeln!(f, "║ Documents:    {}", self.documents)?;
        writeln!(f, "║ Threshold:    {}", self.threshold)?;
        write!(f, "{}", self.tally)?;
        writeln!(f, "{}", RULE)?;
        writeln!(
            f,
            "║ Region accuracy:      {:.1}%",
            self.tally.region_accuracy() * 100.0
        )?;
        writeln!(
            f,
            "║ False detection rate: {:.1}%",
            self.tally.false_detection_rate() * 100.0
        )?;
        writeln!(f, "║ Warnings:     {}", self.warnings)?;
        writeln!(
            f,
            "╚══════════════════════════════════════════════════════════════╝"
        )?;
        Ok(())
    }
}

/// Sum document scores taken at one threshold.
///
/// Fails on an empty list and when the scores disagree on the threshold.
pub fn aggregate(scores: &[DocumentScore]) -> Result<CorpusScore, Error> {
    let first = scores.first().ok_or_else(|| {
        Error::InvalidParameters("cannot aggregate an empty list of scores".to_string())
    })?;

    let mut corpus = CorpusScore {
        threshold: first.threshold,
        documents: 0,
        tally: Tally::default(),
        warnings: 0,
    };
    for score in scores {
        if score.threshold != corpus.threshold {
            return Err(Error::MixedThresholds(
                corpus.threshold.value(),
                score.threshold.value(),
            ));
        }
        corpus.documents += 1;
        corpus.tally += score.tally;
        corpus.warnings += score.warnings.len();
    }
    Ok(corpus)
}

/// Aggregate per-document sweeps threshold by threshold.
pub fn aggregate_sweep(
    sweeps: &[BTreeMap<Threshold, DocumentScore>],
) -> Result<BTreeMap<Threshold, CorpusScore>, Error> {
    let mut by_threshold: BTreeMap<Threshold, Vec<DocumentScore>> = BTreeMap::new();
    for sweep in sweeps {
        for (threshold, score) in sweep {
            by_threshold
                .entry(*threshold)
                .or_default()
                .push(score.clone());
        }
    }
    if by_threshold.is_empty() {
        return Err(Error::InvalidParameters(
            "cannot aggregate an empty list of sweeps".to_string(),
        ));
    }
    by_threshold
        .into_iter()
        .map(|(threshold, scores)| Ok((threshold, aggregate(&scores)?)))
        .collect()
}

/// One point of a sweep curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub threshold: Threshold,
    pub region_accuracy: f64,
    pub false_detection_rate: f64,
}

/// Region accuracy and false-detection rate as functions of the threshold,
/// ordered by ascending threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepCurve {
    pub points: Vec<SweepPoint>,
}

impl SweepCurve {
    pub fn new<'a>(tallies: impl IntoIterator<Item = (Threshold, &'a Tally)>) -> Self {
        let mut points: Vec<SweepPoint> = tallies
            .into_iter()
            .map(|(threshold, tally)| SweepPoint {
                threshold,
                region_accuracy: tally.region_accuracy(),
                false_detection_rate: tally.false_detection_rate(),
            })
            .collect();
        points.sort_by_key(|p| p.threshold);
        Self { points }
    }

    pub fn from_documents(sweep: &BTreeMap<Threshold, DocumentScore>) -> Self {
        Self::new(sweep.iter().map(|(t, score)| (*t, &score.tally)))
    }

    pub fn from_corpus(sweep: &BTreeMap<Threshold, CorpusScore>) -> Self {
        Self::new(sweep.iter().map(|(t, score)| (*t, &score.tally)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::{SignificanceRule, classify},
        overlap::OverlapEntry,
    };

    fn t(value: f64) -> Threshold {
        Threshold::new(value).unwrap()
    }

    fn score(document: &str, threshold: f64, tally: Tally) -> DocumentScore {
        DocumentScore {
            document: document.to_string(),
            threshold: t(threshold),
            tally,
            warnings: Vec::new(),
        }
    }

    fn split_tally(threshold: f64) -> Tally {
        let matrix = OverlapMatrix::from_entries(
            vec![Some(1.0)],
            vec![Some(0.5), Some(0.5)],
            vec![
                OverlapEntry {
                    reference: 0,
                    test: 0,
                    area: 0.5,
                },
                OverlapEntry {
                    reference: 0,
                    test: 1,
                    area: 0.5,
                },
            ],
        )
        .unwrap();
        let classification = classify(&matrix, t(threshold), SignificanceRule::Reference);
        Tally::from_classification(&matrix, &classification)
    }

    #[test]
    fn test_tally_split() {
        let tally = split_tally(0.4);
        assert_eq!(tally.reference_regions, 1);
        assert_eq!(tally.test_regions, 2);
        assert_eq!(tally.by_reference.split, 1);
        assert_eq!(tally.by_test.split, 2);
        assert_eq!(tally.correspondences.split, 1);
        assert_eq!(tally.links.significant_links, 2);
        assert_eq!(tally.links.over_segmented, 1);
        assert_eq!(tally.links.extra_splits, 1);
        assert_eq!(tally.links.under_segmented, 0);
        assert_eq!(tally.region_accuracy(), 0.0);
        assert_eq!(tally.false_detection_rate(), 0.0);
        assert_eq!(tally.recall(), 1.0);
    }

    #[test]
    fn test_tally_missed_and_false_detection() {
        let tally = split_tally(0.6);
        assert_eq!(tally.by_reference.missed, 1);
        assert_eq!(tally.by_test.false_detection, 2);
        assert_eq!(tally.correspondences.total(), 3);
        assert_eq!(tally.links, LinkStats::default());
        assert_eq!(tally.false_detection_rate(), 1.0);
        assert_eq!(tally.precision(), 0.0);
        assert_eq!(tally.recall(), 0.0);
    }

    #[test]
    fn test_empty_rates() {
        let tally = Tally::default();
        assert_eq!(tally.region_accuracy(), 1.0);
        assert_eq!(tally.false_detection_rate(), 0.0);
        assert_eq!(tally.recall(), 1.0);
        assert_eq!(tally.precision(), 1.0);
    }

    #[test]
    fn test_aggregate_is_micro_average() {
        let big = Tally {
            reference_regions: 9,
            test_regions: 9,
            by_reference: KindCounts {
                correct: 9,
                ..Default::default()
            },
            ..Default::default()
        };
        let small = Tally {
            reference_regions: 1,
            test_regions: 1,
            by_reference: KindCounts {
                missed: 1,
                ..Default::default()
            },
            by_test: KindCounts {
                false_detection: 1,
                ..Default::default()
            },
            ..Default::default()
        };

        let corpus = aggregate(&[score("a", 0.5, big), score("b", 0.5, small)]).unwrap();
        assert_eq!(corpus.documents, 2);
        assert_eq!(corpus.tally.reference_regions, 10);
        assert!((corpus.tally.region_accuracy() - 0.9).abs() < 1e-12);
        assert!((corpus.tally.false_detection_rate() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_errors() {
        assert!(matches!(aggregate(&[]), Err(Error::InvalidParameters(_))));
        let mixed = [
            score("a", 0.5, Tally::default()),
            score("b", 0.6, Tally::default()),
        ];
        assert!(matches!(
            aggregate(&mixed),
            Err(Error::MixedThresholds(a, b)) if a == 0.5 && b == 0.6
        ));
    }

    #[test]
    fn test_aggregate_sweep_and_curve() {
        let sweep = |document: &str| {
            [0.4, 0.6]
                .into_iter()
                .map(|threshold| (t(threshold), score(document, threshold, split_tally(threshold))))
                .collect::<BTreeMap<_, _>>()
        };
        let corpus = aggregate_sweep(&[sweep("a"), sweep("b")]).unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus[&t(0.4)].tally.by_reference.split, 2);
        assert_eq!(corpus[&t(0.6)].tally.by_test.false_detection, 4);

        let curve = SweepCurve::from_corpus(&corpus);
        let thresholds: Vec<f64> = curve.points.iter().map(|p| p.threshold.value()).collect();
        assert_eq!(thresholds, vec![0.4, 0.6]);
        assert_eq!(curve.points[1].false_detection_rate, 1.0);

        assert!(aggregate_sweep(&[]).is_err());
    }

    #[test]
    fn test_display_boxed_summary() {
        let text = score("page-7", 0.5, split_tally(0.4)).to_string();
        assert!(text.starts_with("╔"));
        assert!(text.contains("║ Document:     page-7"));
        assert!(text.contains("Region accuracy:      0.0%"));
        assert!(text.trim_end().ends_with("╝"));
    }
}
