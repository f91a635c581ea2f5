//! Road auto-tiling.
//!
//! Every road tile's shape is a pure function of which of its four neighbors
//! are roads as well. The resolver recomputes that for the whole grid, since
//! adding or removing one road changes the shape of every road next to it.

use enum_iterator::Sequence;
use enum_map::EnumMap;
use itertools::Itertools;
use log::{debug, trace};
use static_assertions::const_assert_eq;

use crate::{
    catalog::{BlockType, RoadShape, Rotation},
    math::{Direction, Grid, OutOfBounds, Point},
    world::{Block, Tile},
};

/// Shapes indexed by connectivity code, bits ordered top, right, bottom, left
/// from most to least significant.
const SHAPES_BY_CODE: [RoadShape; 16] = {
    use RoadShape::*;
    [
        Isolated,          // 0000
        RightEnd,          // 000l
        TopEnd,            // 00b0
        CornerBottomLeft,  // 00bl
        LeftEnd,           // 0r00
        Horizontal,        // 0r0l
        CornerBottomRight, // 0rb0
        TeeNoTop,          // 0rbl
        BottomEnd,         // t000
        CornerTopLeft,     // t00l
        Vertical,          // t0b0
        TeeNoRight,        // t0bl
        CornerTopRight,    // tr00
        TeeNoBottom,       // tr0l
        TeeNoLeft,         // trb0
        Junction,          // trbl
    ]
};

const_assert_eq!(<RoadShape as Sequence>::CARDINALITY, SHAPES_BY_CODE.len());

const fn direction_bit(direction: Direction) -> u8 {
    match direction {
        Direction::Up => 0b1000,
        Direction::Right => 0b0100,
        Direction::Down => 0b0010,
        Direction::Left => 0b0001,
    }
}

/// Packs a 4-neighborhood into its connectivity code.
pub fn connectivity_code(connections: &EnumMap<Direction, bool>) -> u8 {
    connections
        .iter()
        .fold(0, |code, (d, &linked)| if linked { code | direction_bit(d) } else { code })
}

pub fn shape_for(connections: &EnumMap<Direction, bool>) -> RoadShape {
    SHAPES_BY_CODE[connectivity_code(connections) as usize]
}

/// Which neighbors of `point` are roads. Missing neighbors past the edge
/// count as not connected.
pub fn road_links(grid: &Grid<Tile>, point: Point) -> Result<EnumMap<Direction, bool>, OutOfBounds> {
    Ok(grid
        .neighbors4(point)?
        .map(|_, neighbor| neighbor.is_some_and(|tile| tile.block.kind.is_road())))
}

/// Re-tags every road tile with the shape its live neighborhood calls for,
/// and resets its rotation.
///
/// Non-road tiles are left alone. Returns the points that changed, so a
/// second pass over an unchanged grid returns nothing.
pub fn resolve_roads(grid: &mut Grid<Tile>) -> Vec<Point> {
    let updates = grid
        .enumerate()
        .filter(|(_, tile)| tile.block.kind.is_road())
        .filter_map(|(point, tile)| {
            let links = road_links(grid, point).ok()?;
            let resolved = Block::new(BlockType::Road(shape_for(&links)), Rotation::Deg0);
            (tile.block != resolved).then_some((point, resolved))
        })
        .collect_vec();

    for &(point, block) in &updates {
        if let Ok(tile) = grid.get_mut(point) {
            trace!("Road at {point}: {} -> {}", tile.block.kind, block.kind);
            tile.block = block;
        }
    }
    debug!("Road pass re-tagged {} tiles", updates.len());

    updates.into_iter().map(|(point, _)| point).collect()
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use enum_iterator::all;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use test_case::test_case;

    use super::*;
    use crate::{math::Dimensions, world::World};

    fn road() -> Block {
        Block::new(BlockType::Road(RoadShape::Isolated), Rotation::Deg0)
    }

    fn place_roads(world: &mut World, points: &[Point]) {
        for &p in points {
            world.tiles_mut().get_mut(p).unwrap().block = road();
        }
    }

    fn shape_at(world: &World, p: Point) -> Option<RoadShape> {
        world.block(p).unwrap().kind.road_shape()
    }

    #[test]
    fn table_agrees_with_shape_connections() {
        for code in 0..16u8 {
            let shape = SHAPES_BY_CODE[code as usize];
            assert_eq!(connectivity_code(&shape.connections()), code, "{shape:?}");
        }
        for shape in all::<RoadShape>() {
            assert_eq!(shape_for(&shape.connections()), shape);
        }
    }

    #[test_case(0b0000, RoadShape::Isolated)]
    #[test_case(0b0001, RoadShape::RightEnd)]
    #[test_case(0b0010, RoadShape::TopEnd)]
    #[test_case(0b0011, RoadShape::CornerBottomLeft)]
    #[test_case(0b0100, RoadShape::LeftEnd)]
    #[test_case(0b0101, RoadShape::Horizontal)]
    #[test_case(0b0110, RoadShape::CornerBottomRight)]
    #[test_case(0b0111, RoadShape::TeeNoTop)]
    #[test_case(0b1000, RoadShape::BottomEnd)]
    #[test_case(0b1001, RoadShape::CornerTopLeft)]
    #[test_case(0b1010, RoadShape::Vertical)]
    #[test_case(0b1011, RoadShape::TeeNoRight)]
    #[test_case(0b1100, RoadShape::CornerTopRight)]
    #[test_case(0b1101, RoadShape::TeeNoBottom)]
    #[test_case(0b1110, RoadShape::TeeNoLeft)]
    #[test_case(0b1111, RoadShape::Junction)]
    fn neighborhood_resolves_to_shape(code: u8, expected: RoadShape) {
        let center = Point::new(1, 1);
        let mut world = World::cleared(Dimensions::new(3, 3));
        place_roads(&mut world, &[center]);
        for d in all::<Direction>() {
            if code & direction_bit(d) != 0 {
                place_roads(&mut world, &[center.step(d)]);
            }
        }

        resolve_roads(world.tiles_mut());

        assert_eq!(shape_at(&world, center), Some(expected));
    }

    #[test]
    fn edges_count_as_unconnected() {
        let mut world = World::cleared(Dimensions::new(1, 1));
        place_roads(&mut world, &[Point::new(0, 0)]);
        resolve_roads(world.tiles_mut());
        assert_eq!(shape_at(&world, Point::new(0, 0)), Some(RoadShape::Isolated));
    }

    #[test]
    fn resolver_is_idempotent() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xD1);
        for _ in 0..20 {
            let dims = Dimensions::new(rng.gen_range(1..12), rng.gen_range(1..12));
            let mut world = World::cleared(dims);
            let roads = dims.iter_within().filter(|_| rng.gen_bool(0.45)).collect_vec();
            place_roads(&mut world, &roads);

            resolve_roads(world.tiles_mut());
            let once = world.clone();
            let changed = resolve_roads(world.tiles_mut());

            assert_is_empty!(changed);
            assert_eq!(world, once);
        }
    }

    #[test]
    fn only_road_tiles_are_touched() {
        let mut world = World::cleared(Dimensions::new(4, 4));
        place_roads(&mut world, &[Point::new(1, 1), Point::new(1, 2)]);
        world.tiles_mut().get_mut(Point::new(1, 1)).unwrap().block.rotation = Rotation::Deg270;
        let before = world.clone();

        let changed = resolve_roads(world.tiles_mut());

        assert_eq!(changed, vec![Point::new(1, 1), Point::new(1, 2)]);
        assert_eq!(world.block(Point::new(1, 1)).unwrap().rotation, Rotation::Deg0);
        for (p, tile) in world.tiles().enumerate() {
            if !changed.contains(&p) {
                assert_eq!(tile, before.tile(p).unwrap());
            }
        }
    }
}
