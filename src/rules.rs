//! The placement rules: what each editing action requires of the target tile
//! and what it changes.
//!
//! Every action is planned against an unmodified world first. Only when the
//! whole plan is valid are its writes committed, so a rejected action never
//! leaves a partial footprint or patch behind.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use enum_iterator::{Sequence, all};
use itertools::{Itertools, iproduct};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{BlockType, ObjectType, RoadShape, Rotation, is_tree},
    house::Footprint,
    math::{Dimensions, OutOfBounds, Point},
    roads::resolve_roads,
    world::{Block, Object, Tile, World},
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize)]
#[derive(Sequence)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    ClearGrass,
    PlantGrass,
    GrowTree,
    WaterTree,
    ChopTree,
    BuildRoad,
    RemoveRoad,
    BuildHouse,
    RemoveHouse,
    RotateHouse,
}

impl Action {
    pub const fn name(self) -> &'static str {
        use Action::*;
        match self {
            ClearGrass => "clear-grass",
            PlantGrass => "plant-grass",
            GrowTree => "grow-tree",
            WaterTree => "water-tree",
            ChopTree => "chop-tree",
            BuildRoad => "build-road",
            RemoveRoad => "remove-road",
            BuildHouse => "build-house",
            RemoveHouse => "remove-house",
            RotateHouse => "rotate-house",
        }
    }

    /// Actions after which road shapes have to be recomputed.
    pub const fn touches_roads(self) -> bool {
        matches!(self, Action::BuildRoad | Action::RemoveRoad)
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action `{0}`")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<Action>().find(|a| a.name() == s).ok_or_else(|| UnknownAction(s.to_owned()))
    }
}

/// Why an action's precondition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the ground is not grass")]
    NotGrass,
    #[error("the tile is not cleared, empty ground")]
    NotBuildable,
    #[error("something already stands on the tile")]
    NotEmpty,
    #[error("there is no young tree to water")]
    NothingToWater,
    #[error("the tree is already fully grown")]
    FullyGrown,
    #[error("there is no tree")]
    NotATree,
    #[error("the ground is not a road")]
    NotARoad,
    #[error("there is no house")]
    NotAHouse,
    #[error("the house would reach past the edge of the world")]
    FootprintOutOfBounds,
    #[error("the house would cover {0}, which is not cleared, empty ground")]
    FootprintBlocked(Point),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlacementError {
    #[error(transparent)]
    OutOfBounds(#[from] OutOfBounds),
    #[error("cannot {action} at {target}: {reason}")]
    PreconditionNotMet { action: Action, target: Point, reason: Rejection },
}

impl PlacementError {
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            PlacementError::PreconditionNotMet { reason, .. } => Some(*reason),
            PlacementError::OutOfBounds(_) => None,
        }
    }
}

/// What a successful action did to the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    pub target: Point,
    /// Tiles the action itself wrote to, in the order they were written.
    pub changed: Vec<Point>,
    /// Road tiles whose shape the follow-up road pass updated.
    pub resolved_roads: Vec<Point>,
}

impl ActionReport {
    /// Legal, but nothing visibly changed.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.resolved_roads.is_empty()
    }

    /// Every tile that needs redrawing.
    pub fn dirty(&self) -> impl Iterator<Item = Point> {
        self.changed.iter().chain(&self.resolved_roads).copied().unique()
    }
}

type Plan = Vec<(Point, Tile)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementEngine {
    grass_patch: Dimensions,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        PlacementEngine { grass_patch: Dimensions::new(5, 5) }
    }
}

impl PlacementEngine {
    pub const fn new(grass_patch: Dimensions) -> Self {
        PlacementEngine { grass_patch }
    }

    pub const fn grass_patch(&self) -> Dimensions {
        self.grass_patch
    }

    /// Validates `action` at `target` and applies it to `world`.
    ///
    /// On error the world is untouched. Road-changing actions are followed by
    /// a road pass over the whole grid.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        action: Action,
        target: Point,
        world: &mut World,
        rng: &mut R,
    ) -> Result<ActionReport, PlacementError> {
        world.tiles().check(target)?;
        let writes = self
            .plan(action, target, world, rng)
            .map_err(|reason| PlacementError::PreconditionNotMet { action, target, reason })?;

        let mut changed = Vec::with_capacity(writes.len());
        for (point, tile) in writes {
            let slot = world.tiles_mut().get_mut(point)?;
            if *slot != tile {
                *slot = tile;
                changed.push(point);
            }
        }

        let resolved_roads =
            if action.touches_roads() { resolve_roads(world.tiles_mut()) } else { Vec::new() };

        debug!(
            "{action} at {target}: {} tiles changed, {} roads re-tagged",
            changed.len(),
            resolved_roads.len()
        );
        Ok(ActionReport { action, target, changed, resolved_roads })
    }

    fn plan<R: Rng + ?Sized>(
        &self,
        action: Action,
        target: Point,
        world: &World,
        rng: &mut R,
    ) -> Result<Plan, Rejection> {
        let tile = *world.tile(target).map_err(|_| Rejection::NotBuildable)?;
        let with_block = |block: Block| vec![(target, Tile { block, ..tile })];
        let with_object = |object: Object| vec![(target, Tile { object, ..tile })];

        Ok(match action {
            Action::ClearGrass => {
                if !tile.block.kind.is_grass() {
                    return Err(Rejection::NotGrass);
                }
                with_block(Block { kind: BlockType::Cleared, ..tile.block })
            }
            Action::PlantGrass => {
                if !tile.is_buildable() {
                    return Err(Rejection::NotBuildable);
                }
                self.plan_grass_patch(target, world, rng)
            }
            Action::GrowTree => {
                if !tile.is_buildable() {
                    return Err(Rejection::NotBuildable);
                }
                with_object(Object::new(ObjectType::PlantedTree, rng.r#gen()))
            }
            Action::WaterTree => {
                let grown = match tile.object.kind {
                    ObjectType::PlantedTree => ObjectType::GrowingTree,
                    ObjectType::GrowingTree => ObjectType::MatureTree,
                    ObjectType::MatureTree => return Err(Rejection::FullyGrown),
                    _ => return Err(Rejection::NothingToWater),
                };
                with_object(Object { kind: grown, ..tile.object })
            }
            Action::ChopTree => {
                if !is_tree(tile.object.kind) {
                    return Err(Rejection::NotATree);
                }
                with_object(Object::EMPTY)
            }
            Action::BuildRoad => {
                if !tile.object.kind.is_empty() {
                    return Err(Rejection::NotEmpty);
                }
                if tile.block.kind.is_road() {
                    Vec::new()
                } else {
                    with_block(Block::new(BlockType::Road(RoadShape::Isolated), Rotation::Deg0))
                }
            }
            Action::RemoveRoad => {
                if !tile.block.kind.is_road() {
                    return Err(Rejection::NotARoad);
                }
                with_block(Block::new(BlockType::Cleared, Rotation::Deg0))
            }
            Action::BuildHouse => plan_build_house(target, world, rng)?,
            Action::RemoveHouse => {
                let footprint = house_footprint(target, world)?;
                footprint
                    .cells()
                    .filter_map(|p| world.tile(p).ok().map(|t| (p, *t)))
                    .filter(|&(p, tile)| owned_by(footprint, p, &tile))
                    .map(|(p, tile)| (p, Tile { object: Object::EMPTY, ..tile }))
                    .collect()
            }
            Action::RotateHouse => plan_rotate_house(house_footprint(target, world)?, world)?,
        })
    }

    /// Grass goes on every cleared, empty tile of the patch starting at
    /// `target`. Tiles past the edge or in use are skipped.
    fn plan_grass_patch<R: Rng + ?Sized>(&self, target: Point, world: &World, rng: &mut R) -> Plan {
        let (w, h) = (self.grass_patch.width as isize, self.grass_patch.height as isize);
        iproduct!(0..h, 0..w)
            .map(|(j, i)| target + Point::new(i, j))
            .filter_map(|p| world.tile(p).ok().filter(|t| t.is_buildable()).map(|t| (p, *t)))
            .map(|(p, tile)| {
                let block = Block::new(BlockType::Grass(rng.r#gen()), rng.r#gen());
                (p, Tile { block, ..tile })
            })
            .collect()
    }
}

/// The house's anchor, or a tile occupied on its behalf.
fn owned_by(footprint: Footprint, point: Point, tile: &Tile) -> bool {
    point == footprint.anchor()
        || tile.object.kind == ObjectType::Occupied { anchor: footprint.anchor() }
}

fn house_footprint(target: Point, world: &World) -> Result<Footprint, Rejection> {
    world.house_at(target).ok().flatten().ok_or(Rejection::NotAHouse)
}

fn plan_build_house<R: Rng + ?Sized>(
    anchor: Point,
    world: &World,
    rng: &mut R,
) -> Result<Plan, Rejection> {
    let footprint = Footprint::new(anchor, Rotation::Deg0);
    if !footprint.fits_within(world.dims()) {
        return Err(Rejection::FootprintOutOfBounds);
    }
    let tiles = footprint
        .cells()
        .map(|p| match world.tile(p) {
            Ok(t) if t.is_buildable() => Ok((p, *t)),
            _ => Err(Rejection::FootprintBlocked(p)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let house = ObjectType::House(rng.r#gen());
    Ok(tiles
        .into_iter()
        .map(|(p, tile)| {
            let kind = if p == anchor { house } else { ObjectType::Occupied { anchor } };
            (p, Tile { object: Object::new(kind, footprint.rotation()), ..tile })
        })
        .collect())
}

/// Moves the house to the opposite corner of its footprint, facing the other
/// way, and points every covered tile at the new anchor.
fn plan_rotate_house(footprint: Footprint, world: &World) -> Result<Plan, Rejection> {
    if !footprint.fits_within(world.dims()) {
        return Err(Rejection::FootprintOutOfBounds);
    }
    let house = world
        .object(footprint.anchor())
        .map_err(|_| Rejection::NotAHouse)?
        .kind;
    let rotated = footprint.rotated();
    let anchor = rotated.anchor();

    rotated
        .cells()
        .map(|p| {
            let tile = *world.tile(p).map_err(|_| Rejection::FootprintOutOfBounds)?;
            if !owned_by(footprint, p, &tile) {
                return Err(Rejection::FootprintBlocked(p));
            }
            let object = if p == anchor {
                Object::new(house, rotated.rotation())
            } else {
                Object::new(ObjectType::Occupied { anchor }, Rotation::Deg0)
            };
            Ok((p, Tile { object, ..tile }))
        })
        .collect()
}
