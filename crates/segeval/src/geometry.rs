// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Polygon geometry kernel.
//!
//! Exact area and pairwise intersection area for simple polygons. Polygons
//! are validated once at construction, so the measuring functions never
//! fail.
//!
//! The intersection of two general (possibly concave) simple polygons is
//! measured by vertical slab decomposition. Every vertex of either polygon
//! and every crossing between an edge of one polygon and an edge of the
//! other yields an x-coordinate; between two consecutive coordinates the set
//! of edges crossing a vertical line, and their vertical order, is fixed.
//! The length of the vertical cross-section of `a ∩ b` is therefore linear
//! inside each slab and the slab contributes `width × length(mid-x)`.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::{fmt, ops::Sub};

/// Relative tolerance applied to the coordinate range of the inputs.
const RELATIVE_EPSILON: f64 = 1e-9;

/// A point in document coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Cross product of two vectors.
fn cross(a: Point, b: Point) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Axis-aligned bounding box `(min, max)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Bounding box of a point list, `None` when the list is empty.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = BoundingBox {
            min: *first,
            max: *first,
        };
        for p in &points[1..] {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Largest side of the box.
    pub fn extent(&self) -> f64 {
        self.width().max(self.height())
    }

    /// Closed-box intersection test: boxes that only touch intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Smallest box containing both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }
}

/// Comparison tolerances proportional to the coordinate range of the inputs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    /// Distances at or below this value are treated as zero.
    pub linear: f64,
    /// Areas at or below this value are treated as zero.
    pub area: f64,
}

impl Tolerance {
    /// Tolerance for inputs spanning `extent` units.
    pub fn for_extent(extent: f64) -> Self {
        let scale = extent.abs();
        Self {
            linear: RELATIVE_EPSILON * scale,
            area: RELATIVE_EPSILON * scale * scale,
        }
    }

    pub fn for_bounds(bounds: &BoundingBox) -> Self {
        Self::for_extent(bounds.extent())
    }
}

/// Reasons a point list cannot be used as a region polygon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GeometryError {
    /// Fewer than three vertices.
    TooFewPoints(usize),
    /// The vertex at this index has a NaN or infinite coordinate.
    NonFiniteCoordinate(usize),
    /// The vertex at this index repeats the previous vertex.
    RepeatedPoint(usize),
    /// All vertices are collinear.
    ZeroArea,
    /// The edges starting at these two vertex indices cross.
    SelfIntersecting(usize, usize),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::TooFewPoints(n) => {
                write!(f, "polygon has {} points, at least 3 are required", n)
            }
            GeometryError::NonFiniteCoordinate(i) => {
                write!(f, "vertex {} has a non-finite coordinate", i)
            }
            GeometryError::RepeatedPoint(i) => {
                write!(f, "vertex {} repeats the previous vertex", i)
            }
            GeometryError::ZeroArea => write!(f, "polygon has zero area"),
            GeometryError::SelfIntersecting(i, j) => {
                write!(f, "edges {} and {} cross each other", i, j)
            }
        }
    }
}

impl std::error::Error for GeometryError {}

/// A validated simple polygon, implicitly closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Point>,
    bounds: BoundingBox,
    signed_area: f64,
}

impl Polygon {
    /// Validate a vertex ring.
    ///
    /// The ring must not repeat its first vertex at the end. Rejects rings
    /// with fewer than three points, non-finite coordinates, repeated
    /// consecutive points, zero area, or crossing edges.
    pub fn new(vertices: Vec<Point>) -> Result<Self, GeometryError> {
        let n = vertices.len();
        if n < 3 {
            return Err(GeometryError::TooFewPoints(n));
        }
        if let Some(i) = vertices.iter().position(|p| !p.is_finite()) {
            return Err(GeometryError::NonFiniteCoordinate(i));
        }
        let bounds = BoundingBox::from_points(&vertices).ok_or(GeometryError::TooFewPoints(n))?;
        let tolerance = Tolerance::for_bounds(&bounds);

        for i in 0..n {
            let j = (i + 1) % n;
            if vertices[i].distance(&vertices[j]) <= tolerance.linear {
                return Err(GeometryError::RepeatedPoint(j));
            }
        }

        let signed_area = shoelace(&vertices);
        if signed_area.abs() <= tolerance.area {
            return Err(GeometryError::ZeroArea);
        }

        if let Some((i, j)) = find_crossing_edges(&vertices) {
            return Err(GeometryError::SelfIntersecting(i, j));
        }

        Ok(Self {
            vertices,
            bounds,
            signed_area,
        })
    }

    /// Validate a flat coordinate list `[x1, y1, x2, y2, ...]`.
    pub fn from_coords(coords: &[f64]) -> Result<Self, GeometryError> {
        let points = coords
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect();
        Self::new(points)
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Shoelace area, positive for counter-clockwise rings (y axis up).
    pub fn signed_area(&self) -> f64 {
        self.signed_area
    }

    pub fn area(&self) -> f64 {
        self.signed_area.abs()
    }
}

/// Shoelace formula evaluated relative to the first vertex.
///
/// Terms involving the first vertex vanish, so the closing edge needs no
/// explicit term.
fn shoelace(vertices: &[Point]) -> f64 {
    let origin = vertices[0];
    let twice: f64 = vertices
        .iter()
        .tuple_windows()
        .map(|(a, b)| cross(*a - origin, *b - origin))
        .sum();
    twice / 2.0
}

/// Closed ring edges as `(start, end)` pairs.
fn ring_edges(vertices: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
    vertices
        .iter()
        .copied()
        .zip(vertices.iter().copied().cycle().skip(1))
}

/// First pair of non-adjacent edges that properly cross.
fn find_crossing_edges(vertices: &[Point]) -> Option<(usize, usize)> {
    let n = vertices.len();
    if n < 4 {
        return None;
    }
    for i in 0..n {
        let a0 = vertices[i];
        let a1 = vertices[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let b0 = vertices[j];
            let b1 = vertices[(j + 1) % n];
            if segments_cross(a0, a1, b0, b1) {
                return Some((i, j));
            }
        }
    }
    None
}

/// Proper crossing test: endpoints strictly on opposite sides.
fn segments_cross(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let d1 = cross(b1 - b0, a0 - b0);
    let d2 = cross(b1 - b0, a1 - b0);
    let d3 = cross(a1 - a0, b0 - a0);
    let d4 = cross(a1 - a0, b1 - a0);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

/// x-coordinate where two segments meet, if they do.
///
/// Parallel segments return `None`: any contact between them happens at an
/// endpoint, which is already a slab boundary.
fn crossing_x(p0: Point, p1: Point, q0: Point, q1: Point) -> Option<f64> {
    if p0.x.max(p1.x) < q0.x.min(q1.x) || q0.x.max(q1.x) < p0.x.min(p1.x) {
        return None;
    }
    let r = p1 - p0;
    let s = q1 - q0;
    let denom = cross(r, s);
    if denom == 0.0 {
        return None;
    }
    let qp = q0 - p0;
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    let slack = RELATIVE_EPSILON;
    if (-slack..=1.0 + slack).contains(&t) && (-slack..=1.0 + slack).contains(&u) {
        Some(p0.x + t * r.x)
    } else {
        None
    }
}

/// Vertical cross-section of a ring at `x` as sorted, disjoint `(y0, y1)`
/// spans, using the even-odd rule.
fn cross_section(vertices: &[Point], x: f64, ys: &mut Vec<f64>, spans: &mut Vec<(f64, f64)>) {
    ys.clear();
    spans.clear();
    for (p, q) in ring_edges(vertices) {
        if (p.x < x) != (q.x < x) {
            ys.push(p.y + (x - p.x) * (q.y - p.y) / (q.x - p.x));
        }
    }
    ys.sort_by(f64::total_cmp);
    spans.extend(ys.chunks_exact(2).map(|c| (c[0], c[1])));
}

/// Total length shared by two sorted lists of disjoint spans.
fn overlap_length(a: &[(f64, f64)], b: &[(f64, f64)]) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut total = 0.0;
    while i < a.len() && j < b.len() {
        let lo = a[i].0.max(b[j].0);
        let hi = a[i].1.min(b[j].1);
        if hi > lo {
            total += hi - lo;
        }
        if a[i].1 < b[j].1 {
            i += 1;
        } else {
            j += 1;
        }
    }
    total
}

/// Exact area of the intersection of two simple polygons.
///
/// Returns 0 for disjoint polygons and for polygons that only share
/// boundary, and for slivers below the area tolerance of the pair.
pub fn intersection_area(a: &Polygon, b: &Polygon) -> f64 {
    if !a.bounds.intersects(&b.bounds) {
        return 0.0;
    }
    let combined = a.bounds.union(&b.bounds);
    // Scaled to the smaller operand so a small region inside a large one
    // keeps its overlap.
    let tolerance = Tolerance::for_extent(a.bounds.extent().min(b.bounds.extent()));

    // Work relative to the combined box so large offsets keep precision.
    let origin = combined.min;
    let pa: Vec<Point> = a.vertices.iter().map(|p| *p - origin).collect();
    let pb: Vec<Point> = b.vertices.iter().map(|p| *p - origin).collect();

    let lo = a.bounds.min.x.max(b.bounds.min.x) - origin.x;
    let hi = a.bounds.max.x.min(b.bounds.max.x) - origin.x;
    if hi - lo <= tolerance.linear {
        return 0.0;
    }

    let mut xs = Vec::with_capacity(pa.len() + pb.len() + 2);
    xs.push(lo);
    xs.push(hi);
    xs.extend(
        pa.iter()
            .chain(&pb)
            .map(|p| p.x)
            .filter(|x| *x > lo && *x < hi),
    );
    for (p0, p1) in ring_edges(&pa) {
        for (q0, q1) in ring_edges(&pb) {
            if let Some(x) = crossing_x(p0, p1, q0, q1).filter(|x| *x > lo && *x < hi) {
                xs.push(x);
            }
        }
    }
    xs.sort_by(f64::total_cmp);
    xs.dedup_by(|next, kept| *next - *kept <= tolerance.linear);

    let mut ys = Vec::new();
    let mut spans_a = Vec::new();
    let mut spans_b = Vec::new();
    let mut area = 0.0;
    for (x0, x1) in xs.iter().copied().tuple_windows() {
        let mid = 0.5 * (x0 + x1);
        cross_section(&pa, mid, &mut ys, &mut spans_a);
        if spans_a.is_empty() {
            continue;
        }
        cross_section(&pb, mid, &mut ys, &mut spans_b);
        area += (x1 - x0) * overlap_length(&spans_a, &spans_b);
    }

    if area <= tolerance.area { 0.0 } else { area }
}
