use std::ops::Div;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{Dimensions, Direction, Point};

/// A point was used to index a grid it does not lie within.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("{point} is out of bounds for a {}x{} grid", dims.width, dims.height)]
pub struct OutOfBounds {
    pub point: Point,
    pub dims: Dimensions,
}

/// The 4-neighborhood of a cell. Entries are `None` past the grid edges.
pub type Neighbors<'a, T> = EnumMap<Direction, Option<&'a T>>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    data: Vec<T>,
    dims: Dimensions,
}

impl<T> Grid<T> {
    pub const fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        debug_assert_eq!(self.data.len() % self.dims.width, 0);
        self.data.chunks_exact(self.dims.width)
    }

    pub fn from_fn<F>(dims: Dimensions, map_fn: F) -> Self
    where
        F: FnMut(Point) -> T,
    {
        Grid { data: dims.iter_within().map(map_fn).collect(), dims }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (Point, &T)> {
        self.data.iter().enumerate().map(|(i, val)| (self.index_to_point(i), val))
    }

    pub fn contains(&self, point: Point) -> bool {
        self.dims.contains(point)
    }

    pub fn get(&self, point: Point) -> Result<&T, OutOfBounds> {
        self.data_index(point).map(|i| &self.data[i])
    }

    pub fn get_mut(&mut self, point: Point) -> Result<&mut T, OutOfBounds> {
        self.data_index(point).map(|i| &mut self.data[i])
    }

    /// Overwrites the cell at `point`, returning the previous value.
    pub fn set(&mut self, point: Point, mut item: T) -> Result<T, OutOfBounds> {
        let i = self.data_index(point)?;
        std::mem::swap(&mut self.data[i], &mut item);
        Ok(item)
    }

    /// The up/right/down/left neighbors of `point`, without wraparound.
    pub fn neighbors4(&self, point: Point) -> Result<Neighbors<'_, T>, OutOfBounds> {
        self.data_index(point)?;
        Ok(EnumMap::from_fn(|d: Direction| self.get(point.step(d)).ok()))
    }

    pub fn check(&self, point: Point) -> Result<Point, OutOfBounds> {
        self.data_index(point).map(|_| point)
    }

    fn data_index(&self, point: Point) -> Result<usize, OutOfBounds> {
        if !self.dims.contains(point) {
            return Err(OutOfBounds { point, dims: self.dims });
        }
        Ok(point.x as usize + (point.y as usize * self.dims.width))
    }

    fn index_to_point(&self, index: usize) -> Point {
        Point::new((index % self.dims.width) as isize, index.div(self.dims.width) as isize)
    }

    pub fn try_from_vec(dims: Dimensions, data: Vec<T>) -> Option<Self> {
        if dims.width * dims.height != data.len() {
            return None;
        }
        Some(Grid { data, dims })
    }
}

impl<T: Clone> Grid<T> {
    pub fn new_fill(dims: Dimensions, value: T) -> Self {
        let Some(flat_size) = dims.width.checked_mul(dims.height) else {
            panic!("Dimensions too large! {}*{} would overflow", dims.width, dims.height);
        };
        Grid { data: vec![value; flat_size], dims }
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use itertools::Itertools;
    use test_case::test_matrix;

    use super::*;

    fn numbered(dims: Dimensions) -> Grid<usize> {
        let mut n = 0;
        Grid::from_fn(dims, |_| {
            n += 1;
            n
        })
    }

    #[test_matrix(
        [1, 20, 30],
        [1, 20, 30]
    )]
    fn out_of_bounds_access_fails(width: usize, height: usize) {
        let dims = Dimensions::new(width, height);
        let mut grid = Grid::new_fill(dims, 0u8);
        let (w, h) = (width as isize, height as isize);

        let outside = [
            Point::new(-1, 0),
            Point::new(0, -1),
            Point::new(w, 0),
            Point::new(0, h),
            Point::new(w, h),
            Point::new(-1, -1),
            Point::new(w + 1000, h / 2),
            Point::new(isize::MIN, isize::MAX),
        ];
        for p in outside {
            assert_eq!(grid.get(p), Err(OutOfBounds { point: p, dims }));
            assert_eq!(grid.set(p, 1), Err(OutOfBounds { point: p, dims }));
            assert!(grid.neighbors4(p).is_err());
        }
        assert!(grid.iter().all(|v| *v == 0));

        // On 1-wide or 1-high grids some of these corners coincide.
        let corners = [Point::new(0, 0), Point::new(w - 1, h - 1), Point::new(w - 1, 0)];
        for p in corners.into_iter().unique() {
            assert_ok!(grid.get(p));
            assert_eq!(grid.set(p, 7), Ok(0));
            assert_eq!(grid.get(p), Ok(&7));
        }
    }

    #[test]
    fn neighbors_stop_at_edges() {
        let grid = numbered(Dimensions::new(3, 3));

        let corner = grid.neighbors4(Point::new(0, 0)).unwrap();
        assert_none!(corner[Direction::Up]);
        assert_none!(corner[Direction::Left]);
        assert_eq!(corner[Direction::Right], Some(&2));
        assert_eq!(corner[Direction::Down], Some(&4));

        let center = grid.neighbors4(Point::new(1, 1)).unwrap();
        assert_eq!(center.values().copied().flatten().copied().collect::<Vec<_>>(), vec![2, 6, 8, 4]);

        let far = grid.neighbors4(Point::new(2, 2)).unwrap();
        assert_none!(far[Direction::Right]);
        assert_none!(far[Direction::Down]);
    }

    #[test]
    fn enumerate_matches_get() {
        let grid = numbered(Dimensions::new(4, 2));
        for (p, v) in grid.enumerate() {
            assert_eq!(grid.get(p), Ok(v));
        }
        assert_eq!(grid.iter_rows().count(), 2);
    }

    #[test]
    fn try_from_vec_checks_length() {
        assert_none!(Grid::try_from_vec(Dimensions::new(2, 2), vec![0; 3]));
        assert_some!(Grid::try_from_vec(Dimensions::new(2, 2), vec![0; 4]));
    }
}
