// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Sparse reference × test overlap matrix for one document.

use crate::{
    Error,
    geometry::{GeometryError, Polygon, intersection_area},
    index::CandidateIndex,
    region::{RegionSet, Role},
};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

/// Recoverable problem found while evaluating a document.
///
/// Warnings never abort evaluation; they are attached to the document score
/// so that every excluded region stays visible in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// A region failed polygon validation and was left out of the matrix.
    ExcludedRegion {
        role: Role,
        index: usize,
        label: String,
        error: GeometryError,
    },
    /// A set has no valid region left. The document is still scored, with
    /// every region of the other set Missed or FalseDetection.
    EmptySet { role: Role, excluded: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExcludedRegion {
                role,
                index,
                label,
                error,
            } => write!(
                f,
                "{} region {} ({}) excluded: {}",
                role, index, label, error
            ),
            Warning::EmptySet { role, excluded } => write!(
                f,
                "{} set has no valid region ({} excluded)",
                role, excluded
            ),
        }
    }
}

/// Exact intersection area between one reference and one test region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverlapEntry {
    pub reference: usize,
    pub test: usize,
    pub area: f64,
}

/// Overlap areas between the regions of a reference set and a test set.
///
/// Only pairs with a non-zero intersection are stored. Regions are addressed
/// by their index in the source set; excluded regions keep their slot with no
/// area.
#[derive(Debug, Clone)]
pub struct OverlapMatrix {
    reference_areas: Vec<Option<f64>>,
    test_areas: Vec<Option<f64>>,
    entries: Vec<OverlapEntry>,
    reference_links: Vec<Vec<usize>>,
    test_links: Vec<Vec<usize>>,
    reference_margins: Vec<f64>,
    test_margins: Vec<f64>,
    warnings: Vec<Warning>,
}

/// Validate every region of a set, recording exclusions.
fn prepare(set: &RegionSet, warnings: &mut Vec<Warning>) -> Vec<Option<Polygon>> {
    let polygons: Vec<Option<Polygon>> = set
        .regions()
        .iter()
        .enumerate()
        .map(|(index, region)| match region.polygon() {
            Ok(polygon) => Some(polygon),
            Err(error) => {
                warnings.push(Warning::ExcludedRegion {
                    role: set.role(),
                    index,
                    label: region.label.clone(),
                    error,
                });
                None
            }
        })
        .collect();

    if polygons.iter().all(Option::is_none) {
        warnings.push(Warning::EmptySet {
            role: set.role(),
            excluded: polygons.len(),
        });
    }
    polygons
}

impl OverlapMatrix {
    /// Compute the overlap matrix of one document.
    ///
    /// Test regions are indexed in an R-tree; each valid reference region is
    /// measured only against the test regions whose boxes it touches. With
    /// `parallel` set, reference regions are processed on the rayon pool.
    pub fn build(reference: &RegionSet, test: &RegionSet, parallel: bool) -> Self {
        let mut warnings = Vec::new();
        let reference_polygons = prepare(reference, &mut warnings);
        let test_polygons = prepare(test, &mut warnings);

        let index = CandidateIndex::new(
            test_polygons
                .iter()
                .enumerate()
                .filter_map(|(j, p)| p.as_ref().map(|p| (j, *p.bounds()))),
        );

        let overlaps_of = |(i, polygon): (usize, &Polygon)| -> Vec<OverlapEntry> {
            index
                .candidates(polygon.bounds())
                .into_iter()
                .filter_map(|j| {
                    let other = test_polygons[j].as_ref()?;
                    let area = intersection_area(polygon, other);
                    (area > 0.0).then_some(OverlapEntry {
                        reference: i,
                        test: j,
                        area,
                    })
                })
                .collect()
        };

        let valid: Vec<(usize, &Polygon)> = reference_polygons
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i, p)))
            .collect();

        let entries: Vec<OverlapEntry> = if parallel {
            valid.par_iter().copied().flat_map_iter(&overlaps_of).collect()
        } else {
            valid.iter().copied().flat_map(&overlaps_of).collect()
        };

        log::debug!(
            "{}: {} reference x {} test regions indexed, {} overlapping pairs",
            reference.document(),
            valid.len(),
            index.len(),
            entries.len()
        );

        let area_of = |p: &Option<Polygon>| p.as_ref().map(Polygon::area);
        let mut matrix = Self::assemble(
            reference_polygons.iter().map(area_of).collect(),
            test_polygons.iter().map(area_of).collect(),
            entries,
        );
        matrix.warnings = warnings;
        matrix
    }

    /// Assemble a matrix from precomputed areas and overlap entries.
    ///
    /// `None` marks an excluded region. Fails when an entry addresses a
    /// region that does not exist or is excluded, or has a non-positive area.
    pub fn from_entries(
        reference_areas: Vec<Option<f64>>,
        test_areas: Vec<Option<f64>>,
        entries: Vec<OverlapEntry>,
    ) -> Result<Self, Error> {
        for entry in &entries {
            let valid = reference_areas.get(entry.reference).is_some_and(Option::is_some)
                && test_areas.get(entry.test).is_some_and(Option::is_some)
                && entry.area > 0.0;
            if !valid {
                return Err(Error::InvalidParameters(format!(
                    "overlap entry ({}, {}, {}) does not address two valid regions",
                    entry.reference, entry.test, entry.area
                )));
            }
        }
        Ok(Self::assemble(reference_areas, test_areas, entries))
    }

    fn assemble(
        reference_areas: Vec<Option<f64>>,
        test_areas: Vec<Option<f64>>,
        mut entries: Vec<OverlapEntry>,
    ) -> Self {
        entries.sort_by_key(|e| (e.reference, e.test));

        let mut reference_links = vec![Vec::new(); reference_areas.len()];
        let mut test_links = vec![Vec::new(); test_areas.len()];
        let mut reference_margins = vec![0.0; reference_areas.len()];
        let mut test_margins = vec![0.0; test_areas.len()];
        for (k, entry) in entries.iter().enumerate() {
            reference_links[entry.reference].push(k);
            test_links[entry.test].push(k);
            reference_margins[entry.reference] += entry.area;
            test_margins[entry.test] += entry.area;
        }

        Self {
            reference_areas,
            test_areas,
            entries,
            reference_links,
            test_links,
            reference_margins,
            test_margins,
            warnings: Vec::new(),
        }
    }

    /// All non-zero overlaps, sorted by `(reference, test)`.
    pub fn entries(&self) -> &[OverlapEntry] {
        &self.entries
    }

    /// Number of region slots in the reference set, excluded ones included.
    pub fn reference_len(&self) -> usize {
        self.reference_areas.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_areas.len()
    }

    /// Area of a reference region, `None` if it was excluded.
    pub fn reference_area(&self, index: usize) -> Option<f64> {
        self.reference_areas.get(index).copied().flatten()
    }

    pub fn test_area(&self, index: usize) -> Option<f64> {
        self.test_areas.get(index).copied().flatten()
    }

    /// Sum of a reference region's overlaps with every test region.
    pub fn reference_margin(&self, index: usize) -> f64 {
        self.reference_margins.get(index).copied().unwrap_or(0.0)
    }

    pub fn test_margin(&self, index: usize) -> f64 {
        self.test_margins.get(index).copied().unwrap_or(0.0)
    }

    pub fn reference_entries(&self, index: usize) -> impl Iterator<Item = &OverlapEntry> {
        self.reference_links
            .get(index)
            .into_iter()
            .flatten()
            .map(|&k| &self.entries[k])
    }

    pub fn test_entries(&self, index: usize) -> impl Iterator<Item = &OverlapEntry> {
        self.test_links
            .get(index)
            .into_iter()
            .flatten()
            .map(|&k| &self.entries[k])
    }

    /// Indices of reference regions that passed validation.
    pub fn valid_references(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.reference_areas.len()).filter(|&i| self.reference_areas[i].is_some())
    }

    pub fn valid_tests(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.test_areas.len()).filter(|&j| self.test_areas[j].is_some())
    }

    pub fn reference_count(&self) -> usize {
        self.valid_references().count()
    }

    pub fn test_count(&self) -> usize {
        self.valid_tests().count()
    }

    pub fn excluded_references(&self) -> usize {
        self.reference_len() - self.reference_count()
    }

    pub fn excluded_tests(&self) -> usize {
        self.test_len() - self.test_count()
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }
}
