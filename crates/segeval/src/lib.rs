// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # segeval
//!
//! Geometric evaluation of document-image segmentation. A reference
//! (ground-truth) set of labeled polygonal regions is compared against a
//! test set produced by a segmentation algorithm, and every region is
//! classified as part of a correct match, a split, a merge, a complex
//! many-to-many correspondence, a missed region or a false detection.
//!
//! ## Pipeline
//!
//! 1. Region outlines are validated into simple polygons. Invalid regions
//!    are excluded and reported as [`Warning`]s.
//! 2. Candidate pairs are pruned with an R-tree over bounding boxes and the
//!    exact intersection area of each candidate is computed.
//! 3. Overlaps whose ratio reaches the threshold link two regions; connected
//!    components of the links are the correspondences.
//! 4. Correspondences are counted into a [`Tally`], per document or summed
//!    over a corpus.
//!
//! ## Quick Start
//!
//! ```rust
//! use segeval::{Region, RegionSet, Role, evaluate_document};
//!
//! let reference = RegionSet::new(
//!     "page-001",
//!     Role::Reference,
//!     vec![Region::rectangle("text", 0.0, 0.0, 100.0, 40.0)],
//! );
//! let test = RegionSet::new(
//!     "page-001",
//!     Role::Test,
//!     vec![
//!         Region::rectangle("text", 0.0, 0.0, 50.0, 40.0),
//!         Region::rectangle("text", 50.0, 0.0, 50.0, 40.0),
//!     ],
//! );
//!
//! let score = evaluate_document(&reference, &test, 0.4)?;
//! assert_eq!(score.tally.by_reference.split, 1);
//! println!("{}", score);
//! # Ok::<(), segeval::Error>(())
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: emits `tracing` spans around the evaluation entry points.

mod classify;
mod config;
mod error;
mod evaluate;
mod geometry;
mod index;
mod metrics;
mod overlap;
mod reader;
mod region;
mod report;

pub use crate::{
    classify::{
        Classification, Correspondence, MatchKind, SignificanceRule, Threshold, classify,
    },
    config::{ENV_PREFIX, EvalConfig, MAX_SWEEP_POINTS, RuleName, parse_sweep},
    error::Error,
    evaluate::{
        CorpusEvaluation, Evaluator, Progress, aggregate, evaluate_document,
        evaluate_document_sweep,
    },
    geometry::{BoundingBox, GeometryError, Point, Polygon, Tolerance, intersection_area},
    index::CandidateIndex,
    metrics::{
        CorpusScore, DocumentScore, KindCounts, LinkStats, SweepCurve, SweepPoint, Tally,
        aggregate_sweep,
    },
    overlap::{OverlapEntry, OverlapMatrix, Warning},
    reader::{
        CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoRle, CocoSegmentation,
        LabelMeFile, LabelMeShape, RegionReadOptions, RegionReader, lif_region_type,
        parse_catinfo,
    },
    region::{Region, RegionSet, Role},
    report::ReportWriter,
};
