// ==========================================
// Space Stowage - Geometry value objects
// ==========================================
// Frame: container-local (width, depth, height)
// Open face: depth = 0 plane, extraction along +depth
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default tolerance for floating point comparisons on coordinates.
pub const GEOMETRY_EPSILON: f64 = 1e-6;

// ==========================================
// Dimensions - extent along each axis
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self { width, depth, height }
    }

    pub fn volume(&self) -> f64 {
        self.width * self.depth * self.height
    }

    /// All three extents finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        [self.width, self.depth, self.height]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }

    /// `true` when `self` fits inside `outer` without rotation.
    pub fn fits_within(&self, outer: &Dimensions, eps: f64) -> bool {
        self.width <= outer.width + eps
            && self.depth <= outer.depth + eps
            && self.height <= outer.height + eps
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.depth, self.height)
    }
}

// ==========================================
// Coordinates - a point in the container frame
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub width: f64,
    pub depth: f64,
    pub height: f64,
}

impl Coordinates {
    pub const ORIGIN: Coordinates = Coordinates {
        width: 0.0,
        depth: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, depth: f64, height: f64) -> Self {
        Self { width, depth, height }
    }

    pub fn offset(&self, dims: &Dimensions) -> Coordinates {
        Coordinates {
            width: self.width + dims.width,
            depth: self.depth + dims.depth,
            height: self.height + dims.height,
        }
    }

    fn is_finite(&self) -> bool {
        self.width.is_finite() && self.depth.is_finite() && self.height.is_finite()
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.width, self.depth, self.height)
    }
}

// ==========================================
// BoundingBox - axis-aligned box, end = start + dims
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub start_coordinates: Coordinates,
    pub end_coordinates: Coordinates,
}

impl BoundingBox {
    pub fn new(start: Coordinates, end: Coordinates) -> Self {
        Self {
            start_coordinates: start,
            end_coordinates: end,
        }
    }

    /// Box of the given extent anchored at `start`.
    pub fn at(start: Coordinates, dims: &Dimensions) -> Self {
        Self::new(start, start.offset(dims))
    }

    /// Whole interior of a container of the given dimensions.
    pub fn container_bounds(dims: &Dimensions) -> Self {
        Self::at(Coordinates::ORIGIN, dims)
    }

    pub fn start(&self) -> &Coordinates {
        &self.start_coordinates
    }

    pub fn end(&self) -> &Coordinates {
        &self.end_coordinates
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.end_coordinates.width - self.start_coordinates.width,
            depth: self.end_coordinates.depth - self.start_coordinates.depth,
            height: self.end_coordinates.height - self.start_coordinates.height,
        }
    }

    pub fn volume(&self) -> f64 {
        self.dimensions().volume()
    }

    /// Finite coordinates with end strictly beyond start on every axis.
    pub fn is_well_formed(&self) -> bool {
        self.start_coordinates.is_finite()
            && self.end_coordinates.is_finite()
            && self.dimensions().is_valid()
    }

    /// Interiors overlap. Boxes that only share a face do not intersect.
    pub fn intersects(&self, other: &BoundingBox, eps: f64) -> bool {
        let (a0, a1) = (&self.start_coordinates, &self.end_coordinates);
        let (b0, b1) = (&other.start_coordinates, &other.end_coordinates);
        a0.width < b1.width - eps
            && b0.width < a1.width - eps
            && a0.depth < b1.depth - eps
            && b0.depth < a1.depth - eps
            && a0.height < b1.height - eps
            && b0.height < a1.height - eps
    }

    /// Overlap of the (width, height) footprints, i.e. the projection along
    /// the extraction axis. Touching edges do not count.
    pub fn overlaps_face_projection(&self, other: &BoundingBox, eps: f64) -> bool {
        let (a0, a1) = (&self.start_coordinates, &self.end_coordinates);
        let (b0, b1) = (&other.start_coordinates, &other.end_coordinates);
        a0.width < b1.width - eps
            && b0.width < a1.width - eps
            && a0.height < b1.height - eps
            && b0.height < a1.height - eps
    }

    pub fn contains(&self, inner: &BoundingBox, eps: f64) -> bool {
        let (o0, o1) = (&self.start_coordinates, &self.end_coordinates);
        let (i0, i1) = (&inner.start_coordinates, &inner.end_coordinates);
        i0.width >= o0.width - eps
            && i0.depth >= o0.depth - eps
            && i0.height >= o0.height - eps
            && i1.width <= o1.width + eps
            && i1.depth <= o1.depth + eps
            && i1.height <= o1.height + eps
    }

    /// Same box within tolerance.
    pub fn approx_eq(&self, other: &BoundingBox, eps: f64) -> bool {
        let close = |a: f64, b: f64| (a - b).abs() <= eps;
        let (a0, a1) = (&self.start_coordinates, &self.end_coordinates);
        let (b0, b1) = (&other.start_coordinates, &other.end_coordinates);
        close(a0.width, b0.width)
            && close(a0.depth, b0.depth)
            && close(a0.height, b0.height)
            && close(a1.width, b1.width)
            && close(a1.depth, b1.depth)
            && close(a1.height, b1.height)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_coordinates, self.end_coordinates)
    }
}
