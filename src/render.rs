//! Flattens the world into what a renderer needs: one item per block and
//! per visible object, each with the model to draw, its yaw and its position
//! in world space.

use std::fmt::{Display, Formatter};

use crate::{
    catalog::{BlockType, ObjectType, Rotation},
    config::RenderConfig,
    math::Point,
    world::World,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Model {
    Block(BlockType),
    Object(ObjectType),
}

impl Display for Model {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Model::Block(kind) => Display::fmt(kind, f),
            Model::Object(kind) => Display::fmt(kind, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderItem {
    pub model: Model,
    pub rotation: Rotation,
    pub cell: Point,
    /// `(x * tile_size, elevation, y * tile_size)`
    pub world_position: [f32; 3],
    pub selected: bool,
}

pub fn world_position(cell: Point, elevation: f32, config: &RenderConfig) -> [f32; 3] {
    [cell.x as f32 * config.tile_size, elevation, cell.y as f32 * config.tile_size]
}

/// Block items for every tile, followed by object items where something is
/// drawn. Empty and occupied tiles have no object item; occupied tiles are
/// covered by their house's model.
pub fn project(world: &World, selected: Option<Point>, config: &RenderConfig) -> Vec<RenderItem> {
    let tiles = world.tiles();
    let blocks = tiles.enumerate().map(|(cell, tile)| RenderItem {
        model: Model::Block(tile.block.kind),
        rotation: tile.block.rotation,
        cell,
        world_position: world_position(cell, config.block_elevation, config),
        selected: selected == Some(cell),
    });
    let objects = tiles
        .enumerate()
        .filter(|(_, tile)| !(tile.object.kind.is_empty() || tile.object.kind.is_occupied()))
        .map(|(cell, tile)| RenderItem {
            model: Model::Object(tile.object.kind),
            rotation: tile.object.rotation,
            cell,
            world_position: world_position(cell, config.object_elevation, config),
            selected: selected == Some(cell),
        });
    blocks.chain(objects).collect()
}

#[cfg(test)]
mod tests {
    use assertables::*;

    use super::*;
    use crate::{catalog::HouseColor, math::Dimensions, world::Object};

    #[test]
    fn positions_scale_with_tile_size() {
        let config = RenderConfig { tile_size: 2.0, block_elevation: 0.0, object_elevation: 1.0 };
        assert_eq!(world_position(Point::new(3, 4), 0.0, &config), [6.0, 0.0, 8.0]);
        assert_eq!(world_position(Point::new(0, 1), 1.0, &config), [0.0, 1.0, 2.0]);
    }

    #[test]
    fn occupied_and_empty_tiles_draw_no_object() {
        let mut world = World::cleared(Dimensions::new(4, 4));
        for (p, kind) in [
            (Point::new(3, 3), ObjectType::House(HouseColor::Green)),
            (Point::new(2, 3), ObjectType::Occupied { anchor: Point::new(3, 3) }),
            (Point::new(0, 0), ObjectType::MatureTree),
        ] {
            world.tiles_mut().get_mut(p).unwrap().object = Object::new(kind, Rotation::Deg0);
        }

        let items = project(&world, Some(Point::new(0, 0)), &RenderConfig::default());

        assert_eq!(items.iter().filter(|i| matches!(i.model, Model::Block(_))).count(), 16);
        let objects = items.iter().filter(|i| matches!(i.model, Model::Object(_))).collect::<Vec<_>>();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].model, Model::Object(ObjectType::MatureTree));
        assert_eq!(objects[0].world_position, [0.0, 1.0, 0.0]);
        assert!(objects[0].selected);
        assert_eq!(objects[1].model.to_string(), "house-green");
        assert!(!objects[1].selected);
        assert_eq!(items.iter().filter(|i| i.selected).count(), 2);
        assert_none!(
            items.iter().find(|i| matches!(i.model, Model::Object(ObjectType::Occupied { .. })))
        );
    }
}
