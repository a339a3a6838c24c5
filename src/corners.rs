use crate::error::{Result, ScanError};
use crate::geometry::{CornerRole, CornerSet, Point};

/// Canonicalize four unordered points into role order.
///
/// Top-left has the smallest `x + y` and bottom-right the largest. The
/// anti-diagonal pair is split by `y - x`: top-right has the smallest,
/// bottom-left the largest. Ties go to the earliest point.
///
/// Near-degenerate input (for example four almost collinear points, or a
/// quadrilateral rotated close to 45 degrees) can assign one point to two
/// roles. That is a known limitation of the heuristic and is not corrected.
pub fn sort_corners(points: &[Point; 4]) -> CornerSet {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;

    CornerSet::new([
        points[arg_extreme(points, sum, false)],
        points[arg_extreme(points, diff, false)],
        points[arg_extreme(points, sum, true)],
        points[arg_extreme(points, diff, true)],
    ])
}

/// Index of the first point with the minimum (or maximum) key.
fn arg_extreme(points: &[Point; 4], key: impl Fn(&Point) -> f64, max: bool) -> usize {
    let mut best = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let (k, current) = (key(p), key(&points[best]));
        if (max && k > current) || (!max && k < current) {
            best = i;
        }
    }
    best
}

/// Corners picked one at a time, as a user does when clicking on a photo.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CornerSelection {
    slots: [Option<Point>; 4],
}

impl CornerSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, role: CornerRole, point: Point) {
        self.slots[role.index()] = Some(point);
    }

    pub fn clear(&mut self, role: CornerRole) {
        self.slots[role.index()] = None;
    }

    pub fn get(&self, role: CornerRole) -> Option<Point> {
        self.slots[role.index()]
    }

    pub fn missing(&self) -> Vec<CornerRole> {
        CornerRole::ALL
            .into_iter()
            .filter(|role| self.slots[role.index()].is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// The selected corners as-is, in the slots the user assigned.
    pub fn complete(&self) -> Result<CornerSet> {
        match self.slots {
            [Some(tl), Some(tr), Some(br), Some(bl)] => Ok(CornerSet::new([tl, tr, br, bl])),
            _ => Err(ScanError::MissingCorners {
                missing: self.missing(),
            }),
        }
    }

    /// The selected corners re-ordered by [`sort_corners`], so slot
    /// assignment mistakes do not flip the rectified output.
    pub fn sorted(&self) -> Result<CornerSet> {
        let set = self.complete()?;
        Ok(sort_corners(set.points()))
    }
}
