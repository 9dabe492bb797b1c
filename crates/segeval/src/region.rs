// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Labeled regions and per-document region sets.

use crate::geometry::{GeometryError, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the comparison a region set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ground-truth regions.
    Reference,
    /// Regions produced by the segmentation under evaluation.
    Test,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Reference => write!(f, "reference"),
            Role::Test => write!(f, "test"),
        }
    }
}

/// A labeled region outline.
///
/// The outline is kept as read from the source file. It is validated into a
/// [`Polygon`] when the document is evaluated, so a malformed region only
/// excludes itself instead of failing the whole file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Region type, e.g. "text" or "figure". Not used for matching.
    pub label: String,
    /// Outline vertices, implicitly closed.
    pub outline: Vec<Point>,
}

impl Region {
    pub fn new(label: impl Into<String>, outline: Vec<Point>) -> Self {
        Self {
            label: label.into(),
            outline,
        }
    }

    /// Axis-aligned rectangle region from its top-left corner and size.
    pub fn rectangle(label: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(
            label,
            vec![
                Point::new(x, y),
                Point::new(x + width, y),
                Point::new(x + width, y + height),
                Point::new(x, y + height),
            ],
        )
    }

    /// Validate the outline.
    pub fn polygon(&self) -> Result<Polygon, GeometryError> {
        Polygon::new(self.outline.clone())
    }
}

/// Regions of one document on one side of the comparison.
///
/// A region's index is its position in the set; indices are unique within a
/// set and unrelated across sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSet {
    document: String,
    role: Role,
    regions: Vec<Region>,
}

impl RegionSet {
    pub fn new(document: impl Into<String>, role: Role, regions: Vec<Region>) -> Self {
        Self {
            document: document.into(),
            role,
            regions,
        }
    }

    /// Document identifier, usually the source file stem.
    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Keep only regions whose label is in `labels`.
    ///
    /// An empty label list keeps every region. Indices of the returned set
    /// are positions in the restricted set.
    pub fn restrict_to<S: AsRef<str>>(&self, labels: &[S]) -> RegionSet {
        if labels.is_empty() {
            return self.clone();
        }
        let regions = self
            .regions
            .iter()
            .filter(|r| labels.iter().any(|l| l.as_ref() == r.label))
            .cloned()
            .collect();
        RegionSet {
            document: self.document.clone(),
            role: self.role,
            regions,
        }
    }
}
