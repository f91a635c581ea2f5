use std::{
    fmt::{Display, Formatter},
    ops::{Add, Mul, Neg, Sub},
};

use enum_iterator::Sequence;
use enum_map::Enum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, Default)]
#[derive(PartialEq, Eq, Hash, Ord, PartialOrd)]
#[derive(Serialize, Deserialize)]
pub struct Point {
    pub x: isize,
    pub y: isize,
}

impl Display for Point {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four grid-aligned neighbor directions.
///
/// `Up` points toward decreasing `y`, `Left` toward decreasing `x`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence, Enum)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const fn offset(self) -> Point {
        match self {
            Direction::Up => Point::new(0, -1),
            Direction::Right => Point::new(1, 0),
            Direction::Down => Point::new(0, 1),
            Direction::Left => Point::new(-1, 0),
        }
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Right => Direction::Left,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
        }
    }
}

impl Point {
    pub const fn new(x: isize, y: isize) -> Self {
        Point { x, y }
    }

    pub const fn manhattan_mag(self) -> usize {
        self.x.unsigned_abs() + self.y.unsigned_abs()
    }

    pub fn manhattan_to(self, other: Point) -> usize {
        (self - other).manhattan_mag()
    }

    /// The adjacent point in `direction`. Not bounds-checked.
    pub const fn step(self, direction: Direction) -> Point {
        let offset = direction.offset();
        Point::new(self.x + offset.x, self.y + offset.y)
    }

    /// The four neighbors, ordered up, right, down, left.
    pub const fn neighbors(self) -> [Point; 4] {
        [
            self.step(Direction::Up),
            self.step(Direction::Right),
            self.step(Direction::Down),
            self.step(Direction::Left),
        ]
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        self + (-rhs)
    }
}

impl Mul<isize> for Point {
    type Output = Point;
    fn mul(self, rhs: isize) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}
