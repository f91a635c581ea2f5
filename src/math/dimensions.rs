use serde::{Deserialize, Serialize};

use crate::math::Point;

/// 2D dimensions with a width and a height.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
#[derive(Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub const fn new(width: usize, height: usize) -> Self {
        Dimensions { width, height }
    }

    pub const fn width(self) -> usize {
        self.width
    }

    pub const fn height(self) -> usize {
        self.height
    }

    pub const fn area(self) -> usize {
        self.width * self.height
    }

    pub const fn contains(self, point: Point) -> bool {
        point.x >= 0
            && point.x < self.width as isize
            && point.y >= 0
            && point.y < self.height as isize
    }

    /// Iterates points within this rectangle, row by row.
    /// For yielded points, `0 <= x < self.width` and `0 <= y < self.height`.
    pub const fn iter_within(self) -> DimensionsIter {
        DimensionsIter::new(self)
    }

    pub const fn empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Iterates exclusively - yielded values are never equal to the x or y of
/// `dims`
pub struct DimensionsIter {
    dims: Dimensions,
    current: Point,
}

impl DimensionsIter {
    pub const fn new(dims: Dimensions) -> Self {
        DimensionsIter { dims, current: Point::new(0, 0) }
    }
}

impl Iterator for DimensionsIter {
    type Item = Point;
    fn next(&mut self) -> Option<Self::Item> {
        if self.dims.empty() || self.current.y >= self.dims.height as isize {
            return None;
        }
        let val = self.current;

        // Step x, step y and reset x if out of bounds
        self.current.x += 1;
        if self.current.x >= self.dims.width as isize {
            self.current.x = 0;
            self.current.y += 1;
        }

        Some(val)
    }
}
