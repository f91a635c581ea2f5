//! The authoritative world state: one grid of tiles, each holding a block
//! (ground surface) and an object (what sits on top of it).

use itertools::Itertools;
use log::warn;

use crate::{
    catalog::{BlockType, ObjectType, Rotation},
    house::Footprint,
    math::{Dimensions, Grid, OutOfBounds, Point},
};

pub mod records;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Block {
    pub kind: BlockType,
    pub rotation: Rotation,
}

impl Block {
    pub const fn new(kind: BlockType, rotation: Rotation) -> Self {
        Block { kind, rotation }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Object {
    pub kind: ObjectType,
    pub rotation: Rotation,
}

impl Object {
    pub const EMPTY: Object = Object { kind: ObjectType::Empty, rotation: Rotation::Deg0 };

    pub const fn new(kind: ObjectType, rotation: Rotation) -> Self {
        Object { kind, rotation }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Tile {
    pub block: Block,
    pub object: Object,
}

impl Tile {
    pub const fn new(block: Block, object: Object) -> Self {
        Tile { block, object }
    }

    /// Bare ground with nothing on it, the only place new trees and houses go.
    pub fn is_buildable(&self) -> bool {
        self.block.kind.is_cleared() && self.object.kind.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    tiles: Grid<Tile>,
}

impl World {
    pub fn new(tiles: Grid<Tile>) -> Self {
        World { tiles }
    }

    /// A world of unplaced blocks with nothing on them.
    pub fn blank(dims: Dimensions) -> Self {
        World { tiles: Grid::new_fill(dims, Tile::default()) }
    }

    /// A world of cleared, empty ground.
    pub fn cleared(dims: Dimensions) -> Self {
        let tile = Tile::new(Block::new(BlockType::Cleared, Rotation::Deg0), Object::EMPTY);
        World { tiles: Grid::new_fill(dims, tile) }
    }

    pub fn dims(&self) -> Dimensions {
        self.tiles.dims()
    }

    pub fn tiles(&self) -> &Grid<Tile> {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut Grid<Tile> {
        &mut self.tiles
    }

    pub fn tile(&self, point: Point) -> Result<&Tile, OutOfBounds> {
        self.tiles.get(point)
    }

    pub fn block(&self, point: Point) -> Result<Block, OutOfBounds> {
        self.tiles.get(point).map(|t| t.block)
    }

    pub fn object(&self, point: Point) -> Result<Object, OutOfBounds> {
        self.tiles.get(point).map(|t| t.object)
    }

    /// Footprints of every house anchored in this world.
    pub fn houses(&self) -> impl Iterator<Item = Footprint> {
        self.tiles
            .enumerate()
            .filter(|(_, tile)| tile.object.kind.is_house())
            .map(|(p, tile)| Footprint::new(p, tile.object.rotation))
    }

    /// Resolves the house a tile belongs to, whether it is the anchor or one
    /// of the occupied cells.
    pub fn house_at(&self, point: Point) -> Result<Option<Footprint>, OutOfBounds> {
        let object = self.tiles.get(point)?.object;
        Ok(match object.kind {
            ObjectType::House(_) => Some(Footprint::new(point, object.rotation)),
            ObjectType::Occupied { anchor } => self
                .tiles
                .get(anchor)
                .ok()
                .filter(|t| t.object.kind.is_house())
                .map(|t| Footprint::new(anchor, t.object.rotation)),
            _ => None,
        })
    }

    /// Occupied cells whose back-reference does not lead to a house covering
    /// them.
    pub fn dangling_occupied(&self) -> Vec<Point> {
        self.tiles
            .enumerate()
            .filter(|(p, tile)| {
                tile.object.kind.is_occupied()
                    && !self.house_at(*p).ok().flatten().is_some_and(|fp| fp.contains(*p))
            })
            .map(|(p, _)| p)
            .collect_vec()
    }

    /// Points occupied cells at the house covering them, and empties the ones
    /// no house covers.
    ///
    /// Returns the number of cells that were emptied.
    pub fn repair_occupancy(&mut self) -> usize {
        let houses = self.houses().collect_vec();
        let mut emptied = 0;
        for point in self.dangling_occupied() {
            let owner = houses.iter().find(|fp| fp.contains(point)).map(|fp| fp.anchor());
            let Ok(tile) = self.tiles.get_mut(point) else { continue };
            match owner {
                Some(anchor) => tile.object.kind = ObjectType::Occupied { anchor },
                None => {
                    warn!("Occupied tile at {point} is not covered by any house, clearing it");
                    tile.object = Object::EMPTY;
                    emptied += 1;
                }
            }
        }
        emptied
    }
}

#[cfg(test)]
mod tests {
    use assertables::*;

    use super::*;
    use crate::catalog::HouseColor;

    fn with_house(world: &mut World, fp: Footprint) {
        for p in fp.cells() {
            let kind = if p == fp.anchor() {
                ObjectType::House(HouseColor::Red)
            } else {
                ObjectType::Occupied { anchor: fp.anchor() }
            };
            world.tiles_mut().get_mut(p).unwrap().object = Object::new(kind, fp.rotation());
        }
    }

    #[test]
    fn house_at_resolves_occupied_cells() {
        let mut world = World::cleared(Dimensions::new(8, 8));
        let fp = Footprint::new(Point::new(5, 5), Rotation::Deg0);
        with_house(&mut world, fp);

        assert_eq!(world.house_at(Point::new(5, 5)), Ok(Some(fp)));
        assert_eq!(world.house_at(Point::new(2, 2)), Ok(Some(fp)));
        assert_eq!(world.house_at(Point::new(6, 6)), Ok(None));
        assert_err!(world.house_at(Point::new(8, 0)));
        assert_is_empty!(world.dangling_occupied());
    }

    #[test]
    fn repair_retargets_and_clears() {
        let mut world = World::cleared(Dimensions::new(8, 8));
        let fp = Footprint::new(Point::new(0, 0), Rotation::Deg180);
        with_house(&mut world, fp);

        let stray = Point::new(7, 7);
        let misdirected = Point::new(1, 1);
        world.tiles_mut().get_mut(stray).unwrap().object.kind =
            ObjectType::Occupied { anchor: Point::new(7, 0) };
        world.tiles_mut().get_mut(misdirected).unwrap().object.kind =
            ObjectType::Occupied { anchor: Point::new(3, 3) };

        assert_eq!(world.dangling_occupied(), vec![misdirected, stray]);
        assert_eq!(world.repair_occupancy(), 1);
        assert_eq!(world.object(stray).unwrap(), Object::EMPTY);
        assert_eq!(
            world.object(misdirected).unwrap().kind,
            ObjectType::Occupied { anchor: Point::new(0, 0) }
        );
        assert_is_empty!(world.dangling_occupied());
    }
}
