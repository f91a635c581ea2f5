//! Footprint arithmetic for houses.
//!
//! A house covers a [`HOUSE_SIZE`]² square. Its anchor is one corner of that
//! square and its rotation decides which way the square extends: toward
//! decreasing x and y at 0°, toward increasing x and y at 180°.

use itertools::iproduct;

use crate::{
    catalog::Rotation,
    math::{Dimensions, Point},
};

pub const HOUSE_SIZE: isize = 4;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Footprint {
    anchor: Point,
    rotation: Rotation,
}

impl Footprint {
    pub const fn new(anchor: Point, rotation: Rotation) -> Self {
        Footprint { anchor, rotation }
    }

    pub const fn anchor(self) -> Point {
        self.anchor
    }

    pub const fn rotation(self) -> Rotation {
        self.rotation
    }

    /// Only half turns are meaningful for houses.
    pub const fn is_valid_rotation(rotation: Rotation) -> bool {
        matches!(rotation, Rotation::Deg0 | Rotation::Deg180)
    }

    /// +1 if the footprint grows toward increasing coordinates, -1 otherwise.
    const fn extent_sign(self) -> isize {
        match self.rotation {
            Rotation::Deg180 | Rotation::Deg270 => 1,
            Rotation::Deg0 | Rotation::Deg90 => -1,
        }
    }

    /// The corner diagonally across from the anchor.
    pub const fn opposite_corner(self) -> Point {
        let d = (HOUSE_SIZE - 1) * self.extent_sign();
        Point::new(self.anchor.x + d, self.anchor.y + d)
    }

    /// Two inclusive corners of the covered area, with `0.x <= 1.x && 0.y <= 1.y`.
    pub fn area_corners(self) -> (Point, Point) {
        let far = self.opposite_corner();
        (
            Point::new(self.anchor.x.min(far.x), self.anchor.y.min(far.y)),
            Point::new(self.anchor.x.max(far.x), self.anchor.y.max(far.y)),
        )
    }

    /// The same covered area, anchored at the opposite corner and facing the
    /// other way.
    pub const fn rotated(self) -> Footprint {
        Footprint { anchor: self.opposite_corner(), rotation: self.rotation.flipped() }
    }

    /// All covered cells, anchor first.
    pub fn cells(self) -> impl Iterator<Item = Point> {
        let sign = self.extent_sign();
        iproduct!(0..HOUSE_SIZE, 0..HOUSE_SIZE)
            .map(move |(j, i)| Point::new(self.anchor.x + i * sign, self.anchor.y + j * sign))
    }

    pub fn contains(self, point: Point) -> bool {
        let (near, far) = self.area_corners();
        (near.x..=far.x).contains(&point.x) && (near.y..=far.y).contains(&point.y)
    }

    pub fn fits_within(self, dims: Dimensions) -> bool {
        let (near, far) = self.area_corners();
        dims.contains(near) && dims.contains(far)
    }

    /// Whether any tile is covered by both footprints.
    pub fn overlaps(self, other: Footprint) -> bool {
        let spans = |fp: Footprint| {
            let (near, far) = fp.area_corners();
            (near.x..=far.x, near.y..=far.y)
        };
        let ((xs, ys), (other_xs, other_ys)) = (spans(self), spans(other));
        xs.start() <= other_xs.end()
            && other_xs.start() <= xs.end()
            && ys.start() <= other_ys.end()
            && other_ys.start() <= ys.end()
    }
}
