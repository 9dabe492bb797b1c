// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Evaluation entry points.
//!
//! Every entry point validates its thresholds and the reference/test pairing
//! before any geometry is computed. The overlap matrix of a document is built
//! once and classified at each requested threshold.

use crate::{
    Error,
    classify::{SignificanceRule, Threshold, classify},
    metrics::{self, CorpusScore, DocumentScore, Tally},
    overlap::OverlapMatrix,
    region::{RegionSet, Role},
};
use rayon::prelude::*;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::Sender,
    },
};

/// Progress information for corpus evaluation.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Number of documents evaluated so far.
    pub current: usize,
    /// Total number of documents.
    pub total: usize,
}

/// Per-document sweeps of a corpus and their threshold-wise aggregates.
#[derive(Debug, Clone)]
pub struct CorpusEvaluation {
    /// One sweep per input pair, in input order.
    pub documents: Vec<BTreeMap<Threshold, DocumentScore>>,
    pub corpus: BTreeMap<Threshold, CorpusScore>,
}

/// Configurable evaluator.
///
/// # Examples
///
/// ```rust
/// use segeval::{Evaluator, Region, RegionSet, Role, SignificanceRule};
///
/// let reference = RegionSet::new(
///     "page",
///     Role::Reference,
///     vec![Region::rectangle("text", 0.0, 0.0, 10.0, 10.0)],
/// );
/// let test = RegionSet::new(
///     "page",
///     Role::Test,
///     vec![Region::rectangle("text", 1.0, 0.0, 10.0, 10.0)],
/// );
///
/// let evaluator = Evaluator::new().with_rule(SignificanceRule::Union);
/// let score = evaluator.evaluate(&reference, &test, 0.5)?;
/// assert_eq!(score.tally.by_reference.correct, 1);
/// # Ok::<(), segeval::Error>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    rule: SignificanceRule,
    parallel: bool,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            rule: SignificanceRule::default(),
            parallel: true,
        }
    }
}

fn check_pairing(reference: &RegionSet, test: &RegionSet) -> Result<(), Error> {
    if reference.role() != Role::Reference || test.role() != Role::Test {
        return Err(Error::MismatchedPairing {
            reference: reference.role(),
            test: test.role(),
        });
    }
    if reference.document() != test.document() {
        log::debug!(
            "pairing reference {} with test {}",
            reference.document(),
            test.document()
        );
    }
    Ok(())
}

fn validate_thresholds(thresholds: &[f64]) -> Result<Vec<Threshold>, Error> {
    if thresholds.is_empty() {
        return Err(Error::EmptyThresholds);
    }
    let mut validated = thresholds
        .iter()
        .map(|&t| Threshold::new(t))
        .collect::<Result<Vec<_>, _>>()?;
    validated.sort();
    validated.dedup();
    Ok(validated)
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `rule` to decide which overlaps are significant.
    pub fn with_rule(mut self, rule: SignificanceRule) -> Self {
        self.rule = rule;
        self
    }

    /// Compute overlaps on the rayon pool. Enabled by default.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn rule(&self) -> SignificanceRule {
        self.rule
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Overlap matrix of one document pair.
    pub fn overlaps(
        &self,
        reference: &RegionSet,
        test: &RegionSet,
    ) -> Result<OverlapMatrix, Error> {
        check_pairing(reference, test)?;
        Ok(OverlapMatrix::build(reference, test, self.parallel))
    }

    fn score(&self, document: &str, matrix: &OverlapMatrix, threshold: Threshold) -> DocumentScore {
        let classification = classify(matrix, threshold, self.rule);
        DocumentScore {
            document: document.to_string(),
            threshold,
            tally: Tally::from_classification(matrix, &classification),
            warnings: matrix.warnings().to_vec(),
        }
    }

    /// Score one document at one threshold.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip_all, fields(document = reference.document()))
    )]
    pub fn evaluate(
        &self,
        reference: &RegionSet,
        test: &RegionSet,
        threshold: f64,
    ) -> Result<DocumentScore, Error> {
        let threshold = Threshold::new(threshold)?;
        let matrix = self.overlaps(reference, test)?;
        Ok(self.score(reference.document(), &matrix, threshold))
    }

    /// Score one document at several thresholds.
    ///
    /// Duplicate thresholds collapse into one entry.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip_all, fields(document = reference.document()))
    )]
    pub fn sweep(
        &self,
        reference: &RegionSet,
        test: &RegionSet,
        thresholds: &[f64],
    ) -> Result<BTreeMap<Threshold, DocumentScore>, Error> {
        let thresholds = validate_thresholds(thresholds)?;
        let matrix = self.overlaps(reference, test)?;
        log::debug!(
            "{}: classifying {} overlaps at {} thresholds",
            reference.document(),
            matrix.entries().len(),
            thresholds.len()
        );

        let document = reference.document();
        let scores = if self.parallel {
            thresholds
                .par_iter()
                .map(|&t| (t, self.score(document, &matrix, t)))
                .collect()
        } else {
            thresholds
                .iter()
                .map(|&t| (t, self.score(document, &matrix, t)))
                .collect()
        };
        Ok(scores)
    }

    /// Evaluate many document pairs on the rayon pool.
    ///
    /// Pairing and thresholds are checked for every pair before any work
    /// starts. Progress is reported once per finished document.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
    pub fn evaluate_corpus(
        &self,
        pairs: &[(RegionSet, RegionSet)],
        thresholds: &[f64],
        progress: Option<Sender<Progress>>,
    ) -> Result<CorpusEvaluation, Error> {
        validate_thresholds(thresholds)?;
        for (reference, test) in pairs {
            check_pairing(reference, test)?;
        }

        let total = pairs.len();
        let done = AtomicUsize::new(0);
        if let Some(progress) = &progress {
            let _ = progress.send(Progress { current: 0, total });
        }

        let documents = pairs
            .par_iter()
            .map(|(reference, test)| {
                let sweep = self.sweep(reference, test, thresholds);
                let current = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &progress {
                    let _ = progress.send(Progress { current, total });
                }
                sweep
            })
            .collect::<Result<Vec<_>, _>>()?;

        let corpus = metrics::aggregate_sweep(&documents)?;
        Ok(CorpusEvaluation { documents, corpus })
    }
}

/// Score one document at one threshold with the default rule.
pub fn evaluate_document(
    reference: &RegionSet,
    test: &RegionSet,
    threshold: f64,
) -> Result<DocumentScore, Error> {
    Evaluator::default().evaluate(reference, test, threshold)
}

/// Score one document at several thresholds with the default rule.
pub fn evaluate_document_sweep(
    reference: &RegionSet,
    test: &RegionSet,
    thresholds: &[f64],
) -> Result<BTreeMap<Threshold, DocumentScore>, Error> {
    Evaluator::default().sweep(reference, test, thresholds)
}

/// Micro-averaged corpus score of document scores sharing one threshold.
pub fn aggregate(scores: &[DocumentScore]) -> Result<CorpusScore, Error> {
    metrics::aggregate(scores)
}
