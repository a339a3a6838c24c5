use std::fmt;
use std::ops::Index;

use nalgebra::{Matrix2x3, Matrix3, Point2, Vector3};

use crate::error::{Result, ScanError};

/// A point in image space: x is the column, y is the row, origin at the
/// top-left of the image and y growing downward.
pub type Point = Point2<f64>;

/// Distance metric used when measuring corner-to-corner spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Euclidean,
    Manhattan,
}

/// The metric used everywhere rectified output dimensions are derived.
pub const RECTIFY_METRIC: Metric = Metric::Euclidean;

pub fn distance(a: &Point, b: &Point, metric: Metric) -> f64 {
    let d = b - a;
    match metric {
        Metric::Euclidean => d.norm(),
        Metric::Manhattan => d.x.abs() + d.y.abs(),
    }
}

/// Append a homogeneous coordinate of 1 to each point so affine matrices can
/// be applied with a single multiply.
pub fn lift(points: &[Point]) -> Vec<Vector3<f64>> {
    points.iter().map(|p| p.to_homogeneous()).collect()
}

/// Semantic role of each slot in a [`CornerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CornerRole {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl CornerRole {
    pub const ALL: [CornerRole; 4] = [
        CornerRole::TopLeft,
        CornerRole::TopRight,
        CornerRole::BottomRight,
        CornerRole::BottomLeft,
    ];

    pub fn index(self) -> usize {
        match self {
            CornerRole::TopLeft => 0,
            CornerRole::TopRight => 1,
            CornerRole::BottomRight => 2,
            CornerRole::BottomLeft => 3,
        }
    }
}

impl fmt::Display for CornerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CornerRole::TopLeft => "top-left",
            CornerRole::TopRight => "top-right",
            CornerRole::BottomRight => "bottom-right",
            CornerRole::BottomLeft => "bottom-left",
        };
        f.write_str(name)
    }
}

/// Output slot `i` takes the point held in input slot `table[i]`.
pub type RolePermutation = [usize; 4];

/// After a clockwise quarter turn the old bottom-left becomes the top-left.
pub const ROTATE_CW_ROLES: RolePermutation = [3, 0, 1, 2];
/// Mirroring left/right swaps the members of each row.
pub const FLIP_HORIZONTAL_ROLES: RolePermutation = [1, 0, 3, 2];
/// Mirroring top/bottom swaps the rows and keeps left/right within each.
pub const FLIP_VERTICAL_ROLES: RolePermutation = [3, 2, 1, 0];

/// Four document corners in role order: top-left, top-right, bottom-right,
/// bottom-left. Only meaningful alongside the image whose coordinate space it
/// shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerSet {
    points: [Point; 4],
}

impl CornerSet {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Build a set from a slice, which must hold exactly four points.
    pub fn try_from_slice(points: &[Point]) -> Result<Self> {
        let points: [Point; 4] = points.try_into().map_err(|_| {
            ScanError::InvalidInput(format!("expected 4 corners, got {}", points.len()))
        })?;
        Ok(Self { points })
    }

    /// The rectangle covering the whole image.
    pub fn full_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self::new([
            Point::new(0.0, 0.0),
            Point::new(w, 0.0),
            Point::new(w, h),
            Point::new(0.0, h),
        ])
    }

    pub fn points(&self) -> &[Point; 4] {
        &self.points
    }

    pub fn permute(&self, table: &RolePermutation) -> Self {
        Self::new(std::array::from_fn(|i| self.points[table[i]]))
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.points.map(|p| Point::from(p.coords * factor)))
    }

    /// Whether every corner lies within `eps` (per axis) of its counterpart.
    pub fn approx_eq(&self, other: &CornerSet, eps: f64) -> bool {
        self.points
            .iter()
            .zip(other.points.iter())
            .all(|(a, b)| (a - b).amax() <= eps)
    }
}

impl Index<CornerRole> for CornerSet {
    type Output = Point;

    fn index(&self, role: CornerRole) -> &Point {
        &self.points[role.index()]
    }
}

impl Index<usize> for CornerSet {
    type Output = Point;

    fn index(&self, index: usize) -> &Point {
        &self.points[index]
    }
}

impl TryFrom<&[Point]> for CornerSet {
    type Error = ScanError;

    fn try_from(points: &[Point]) -> Result<Self> {
        Self::try_from_slice(points)
    }
}

impl fmt::Display for CornerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (role, p)) in CornerRole::ALL.iter().zip(self.points.iter()).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}=({:.1}, {:.1})", role, p.x, p.y)?;
        }
        Ok(())
    }
}

/// Map each corner through a 2x3 affine matrix. Slots are not reordered.
pub fn apply_affine(matrix: &Matrix2x3<f64>, corners: &CornerSet) -> CornerSet {
    let lifted = lift(corners.points());
    CornerSet::new(std::array::from_fn(|i| Point::from(matrix * lifted[i])))
}

/// Transform a point through a 3x3 projective matrix
pub fn transform_point(matrix: &Matrix3<f64>, p: &Point) -> Point {
    let result = matrix * p.to_homogeneous();
    Point::new(result.x / result.z, result.y / result.z)
}

/// Twice the signed area of the triangle (o, a, b).
pub fn cross(o: &Point, a: &Point, b: &Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}
