// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Tab-separated score report.
//!
//! One row per document and threshold, plus one `corpus` row per threshold.
//! The header is written with the first row.

use crate::{
    Error,
    metrics::{CorpusScore, DocumentScore, Tally},
};
use serde::Serialize;
use std::{fs::File, io, path::Path};

#[derive(Debug, Serialize)]
struct ReportRow<'a> {
    scope: &'static str,
    document: &'a str,
    documents: usize,
    threshold: f64,
    reference_regions: usize,
    test_regions: usize,
    correct: usize,
    split: usize,
    merge: usize,
    complex: usize,
    missed: usize,
    test_correct: usize,
    test_split: usize,
    test_merge: usize,
    test_complex: usize,
    false_detection: usize,
    significant_links: usize,
    over_segmented: usize,
    under_segmented: usize,
    extra_splits: usize,
    extra_merges: usize,
    excluded_references: usize,
    excluded_tests: usize,
    region_accuracy: f64,
    false_detection_rate: f64,
    warnings: usize,
}

impl<'a> ReportRow<'a> {
    fn new(
        scope: &'static str,
        document: &'a str,
        documents: usize,
        threshold: f64,
        tally: &Tally,
        warnings: usize,
    ) -> Self {
        Self {
            scope,
            document,
            documents,
            threshold,
            reference_regions: tally.reference_regions,
            test_regions: tally.test_regions,
            correct: tally.by_reference.correct,
            split: tally.by_reference.split,
            merge: tally.by_reference.merge,
            complex: tally.by_reference.complex,
            missed: tally.by_reference.missed,
            test_correct: tally.by_test.correct,
            test_split: tally.by_test.split,
            test_merge: tally.by_test.merge,
            test_complex: tally.by_test.complex,
            false_detection: tally.by_test.false_detection,
            significant_links: tally.links.significant_links,
            over_segmented: tally.links.over_segmented,
            under_segmented: tally.links.under_segmented,
            extra_splits: tally.links.extra_splits,
            extra_merges: tally.links.extra_merges,
            excluded_references: tally.excluded_references,
            excluded_tests: tally.excluded_tests,
            region_accuracy: tally.region_accuracy(),
            false_detection_rate: tally.false_detection_rate(),
            warnings,
        }
    }
}

/// Writes score rows to any [`io::Write`].
pub struct ReportWriter<W: io::Write> {
    writer: csv::Writer<W>,
}

impl ReportWriter<File> {
    /// Create (or truncate) a report file.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: io::Write> ReportWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_writer(inner),
        }
    }

    pub fn write_document(&mut self, score: &DocumentScore) -> Result<(), Error> {
        self.writer.serialize(ReportRow::new(
            "document",
            &score.document,
            1,
            score.threshold.value(),
            &score.tally,
            score.warnings.len(),
        ))?;
        Ok(())
    }

    pub fn write_corpus(&mut self, score: &CorpusScore) -> Result<(), Error> {
        self.writer.serialize(ReportRow::new(
            "corpus",
            "",
            score.documents,
            score.threshold.value(),
            &score.tally,
            score.warnings,
        ))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, Error> {
        self.writer
            .into_inner()
            .map_err(|e| Error::IoError(e.into_error()))
    }
}
