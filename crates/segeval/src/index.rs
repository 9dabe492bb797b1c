// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Candidate pruning with an R-tree over region bounding boxes.
//!
//! Two polygons can only intersect if their bounding boxes intersect, so a
//! box query never drops a real overlap. It may return pairs whose polygons
//! are disjoint; the geometry kernel settles those.

use crate::geometry::BoundingBox;
use rstar::{AABB, RTree, RTreeObject};

/// Envelope for R-tree spatial indexing.
#[derive(Debug, Clone, Copy)]
struct RegionEnvelope {
    aabb: AABB<[f64; 2]>,
    index: usize,
}

impl RTreeObject for RegionEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

fn to_aabb(bounds: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bounds.min.x, bounds.min.y], [bounds.max.x, bounds.max.y])
}

/// Read-only spatial index over the regions of one document.
///
/// Built once, then queried concurrently (`RTree` is `Sync`).
pub struct CandidateIndex {
    tree: RTree<RegionEnvelope>,
}

impl CandidateIndex {
    /// Bulk-load `(region index, bounding box)` pairs.
    pub fn new(entries: impl IntoIterator<Item = (usize, BoundingBox)>) -> Self {
        let envelopes = entries
            .into_iter()
            .map(|(index, bounds)| RegionEnvelope {
                aabb: to_aabb(&bounds),
                index,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(envelopes),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of regions whose box intersects or touches `bounds`, ascending.
    pub fn candidates(&self, bounds: &BoundingBox) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&to_aabb(bounds))
            .map(|envelope| envelope.index)
            .collect();
        found.sort_unstable();
        found
    }
}
