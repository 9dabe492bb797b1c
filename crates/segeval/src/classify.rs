// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Correspondence classification.
//!
//! Overlaps whose ratio reaches the significance threshold link a reference
//! region to a test region. The connected components of the resulting
//! bipartite graph are the correspondences, and each one is classified by
//! how many reference and test regions it contains:
//!
//! | reference | test | kind             |
//! |-----------|------|------------------|
//! | 1         | 1    | `Correct`        |
//! | 1         | > 1  | `Split`          |
//! | > 1       | 1    | `Merge`          |
//! | > 1       | > 1  | `Complex`        |
//! | 1         | 0    | `Missed`         |
//! | 0         | 1    | `FalseDetection` |
//!
//! Classification is purely structural: no link is preferred over another
//! because of its area.

use crate::{
    Error,
    overlap::{OverlapEntry, OverlapMatrix},
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap, fmt, hash::Hash};

/// Slack on ratio comparisons so identical polygons stay significant at 1.
const RATIO_SLACK: f64 = 1e-9;

/// Significance threshold in `(0, 1]`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Self, Error> {
        if value > 0.0 && value <= 1.0 {
            Ok(Self(value))
        } else {
            Err(Error::InvalidThreshold(value))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Threshold {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq for Threshold {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Threshold {}

impl PartialOrd for Threshold {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Threshold {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Threshold {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an overlap is turned into a ratio compared against the threshold.
///
/// One rule applies to every link of an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificanceRule {
    /// `overlap / area(reference)`.
    #[default]
    Reference,
    /// `overlap / min(area(reference), area(test))`.
    Smaller,
    /// `overlap / area(reference ∪ test)`.
    Union,
    /// Margin-relative coverage: the overlap must hold at least `relative`
    /// of the reference region's total overlap and cover the threshold
    /// fraction of the reference region; failing the first condition, it
    /// must hold at least `relative` of the test region's total overlap and
    /// cover the threshold fraction of the test region.
    Coverage { relative: f64 },
}

impl SignificanceRule {
    /// Whether an overlap entry is a significant link at `threshold`.
    pub fn is_significant(
        &self,
        entry: &OverlapEntry,
        matrix: &OverlapMatrix,
        threshold: Threshold,
    ) -> bool {
        let (Some(reference_area), Some(test_area)) = (
            matrix.reference_area(entry.reference),
            matrix.test_area(entry.test),
        ) else {
            return false;
        };
        let t = threshold.value() - RATIO_SLACK;
        let overlap = entry.area;

        match *self {
            SignificanceRule::Reference => overlap / reference_area >= t,
            SignificanceRule::Smaller => overlap / reference_area.min(test_area) >= t,
            SignificanceRule::Union => overlap / (reference_area + test_area - overlap) >= t,
            SignificanceRule::Coverage { relative } => {
                let relative = relative - RATIO_SLACK;
                if overlap / matrix.reference_margin(entry.reference) >= relative {
                    overlap / reference_area >= t
                } else if overlap / matrix.test_margin(entry.test) >= relative {
                    overlap / test_area >= t
                } else {
                    false
                }
            }
        }
    }
}

impl fmt::Display for SignificanceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignificanceRule::Reference => write!(f, "reference"),
            SignificanceRule::Smaller => write!(f, "smaller"),
            SignificanceRule::Union => write!(f, "union"),
            SignificanceRule::Coverage { relative } => write!(f, "coverage({})", relative),
        }
    }
}

/// Error category of a correspondence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Correct,
    Split,
    Merge,
    Complex,
    Missed,
    FalseDetection,
}

impl MatchKind {
    pub const ALL: [MatchKind; 6] = [
        MatchKind::Correct,
        MatchKind::Split,
        MatchKind::Merge,
        MatchKind::Complex,
        MatchKind::Missed,
        MatchKind::FalseDetection,
    ];

    /// Kind of a component with `references` reference regions and `tests`
    /// test regions. An empty component has no kind.
    pub fn from_multiplicity(references: usize, tests: usize) -> Option<Self> {
        match (references, tests) {
            (0, 0) => None,
            (1, 0) => Some(MatchKind::Missed),
            (0, _) => Some(MatchKind::FalseDetection),
            (_, 0) => Some(MatchKind::Missed),
            (1, 1) => Some(MatchKind::Correct),
            (1, _) => Some(MatchKind::Split),
            (_, 1) => Some(MatchKind::Merge),
            _ => Some(MatchKind::Complex),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchKind::Correct => "correct",
            MatchKind::Split => "split",
            MatchKind::Merge => "merge",
            MatchKind::Complex => "complex",
            MatchKind::Missed => "missed",
            MatchKind::FalseDetection => "false_detection",
        }
    }
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connected group of reference and test regions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correspondence {
    pub kind: MatchKind,
    /// Reference region indices, ascending.
    pub references: Vec<usize>,
    /// Test region indices, ascending.
    pub tests: Vec<usize>,
}

/// Every valid region of a document assigned to exactly one correspondence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    threshold: Threshold,
    rule: SignificanceRule,
    correspondences: Vec<Correspondence>,
    links: Vec<(usize, usize)>,
}

impl Classification {
    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn rule(&self) -> SignificanceRule {
        self.rule
    }

    /// Correspondences holding reference regions come first, ordered by
    /// their smallest reference index; test-only ones follow by test index.
    pub fn correspondences(&self) -> &[Correspondence] {
        &self.correspondences
    }

    /// Significant `(reference, test)` links, sorted.
    pub fn links(&self) -> &[(usize, usize)] {
        &self.links
    }

    pub fn of_kind(&self, kind: MatchKind) -> impl Iterator<Item = &Correspondence> {
        self.correspondences.iter().filter(move |c| c.kind == kind)
    }
}

/// Union-find over `0..n` with path compression and union by rank.
struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            Ordering::Greater => self.parent[root_y] = root_x,
            Ordering::Less => self.parent[root_x] = root_y,
            Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }
}

/// Classify the correspondences of one document at one threshold.
///
/// A pure function of its inputs: sweeping thresholds re-runs it from the
/// same matrix with nothing carried over between runs.
pub fn classify(
    matrix: &OverlapMatrix,
    threshold: Threshold,
    rule: SignificanceRule,
) -> Classification {
    let links: Vec<(usize, usize)> = matrix
        .entries()
        .iter()
        .filter(|entry| rule.is_significant(entry, matrix, threshold))
        .map(|entry| (entry.reference, entry.test))
        .collect();

    // Reference region i is node i, test region j is node offset + j.
    let offset = matrix.reference_len();
    let mut sets = DisjointSets::new(offset + matrix.test_len());
    for &(i, j) in &links {
        sets.union(i, offset + j);
    }

    let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
    let mut groups: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
    for i in matrix.valid_references() {
        let root = sets.find(i);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push((Vec::new(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].0.push(i);
    }
    for j in matrix.valid_tests() {
        let root = sets.find(offset + j);
        let slot = *slot_of_root.entry(root).or_insert_with(|| {
            groups.push((Vec::new(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(j);
    }

    let correspondences = groups
        .into_iter()
        .filter_map(|(references, tests)| {
            let kind = MatchKind::from_multiplicity(references.len(), tests.len())?;
            Some(Correspondence {
                kind,
                references,
                tests,
            })
        })
        .collect();

    Classification {
        threshold,
        rule,
        correspondences,
        links,
    }
}
