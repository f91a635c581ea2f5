//! The closed set of block and object types a tile can hold, plus the
//! classification predicates placement rules are written against.
//!
//! Every type has a stable string tag, which is what the persisted layers
//! carry.

use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use derive_more::IsVariant;
use enum_iterator::{Sequence, all};
use enum_map::EnumMap;
use rand::{
    Rng,
    distributions::{Distribution, Standard},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::{Direction, Point};

/// A tag string that does not name any known type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} tag `{tag}`")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub tag: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[derive(Sequence)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    pub const fn from_degrees(degrees: u16) -> Option<Rotation> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Yaw in radians, for the rendering side.
    pub fn radians(self) -> f32 {
        f32::from(self.degrees()).to_radians()
    }

    /// Rotated by half a turn.
    pub const fn flipped(self) -> Rotation {
        match self {
            Rotation::Deg0 => Rotation::Deg180,
            Rotation::Deg90 => Rotation::Deg270,
            Rotation::Deg180 => Rotation::Deg0,
            Rotation::Deg270 => Rotation::Deg90,
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> u16 {
        rotation.degrees()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is not a quarter-turn rotation")]
pub struct InvalidRotation(pub u16);

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;
    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(degrees).ok_or(InvalidRotation(degrees))
    }
}

impl Distribution<Rotation> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Rotation {
        match rng.gen_range(0..4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum GrassVariant {
    One,
    Two,
}

impl GrassVariant {
    pub const fn tag(self) -> &'static str {
        match self {
            GrassVariant::One => "grass-1",
            GrassVariant::Two => "grass-2",
        }
    }
}

impl Distribution<GrassVariant> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GrassVariant {
        if rng.r#gen() { GrassVariant::One } else { GrassVariant::Two }
    }
}

/// Visual variant of a road tile, named after which sides connect to
/// neighboring road tiles.
///
/// End pieces are named after where the cap sits: a `TopEnd` is the top tip
/// of a vertical line and only connects downward.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum RoadShape {
    Isolated,
    TopEnd,
    BottomEnd,
    LeftEnd,
    RightEnd,
    Vertical,
    Horizontal,
    CornerTopRight,
    CornerBottomRight,
    CornerBottomLeft,
    CornerTopLeft,
    TeeNoTop,
    TeeNoRight,
    TeeNoBottom,
    TeeNoLeft,
    Junction,
}

impl RoadShape {
    pub const fn tag(self) -> &'static str {
        use RoadShape::*;
        match self {
            Isolated => "road-isolated",
            TopEnd => "road-end-top",
            BottomEnd => "road-end-bottom",
            LeftEnd => "road-end-left",
            RightEnd => "road-end-right",
            Vertical => "road-vertical",
            Horizontal => "road-horizontal",
            CornerTopRight => "road-corner-top-right",
            CornerBottomRight => "road-corner-bottom-right",
            CornerBottomLeft => "road-corner-bottom-left",
            CornerTopLeft => "road-corner-top-left",
            TeeNoTop => "road-tee-no-top",
            TeeNoRight => "road-tee-no-right",
            TeeNoBottom => "road-tee-no-bottom",
            TeeNoLeft => "road-tee-no-left",
            Junction => "road-junction",
        }
    }

    /// Whether this shape joins the neighbor in `direction`.
    pub const fn connects(self, direction: Direction) -> bool {
        use Direction::*;
        use RoadShape::*;
        match self {
            Isolated => false,
            TopEnd => matches!(direction, Down),
            BottomEnd => matches!(direction, Up),
            LeftEnd => matches!(direction, Right),
            RightEnd => matches!(direction, Left),
            Vertical => matches!(direction, Up | Down),
            Horizontal => matches!(direction, Left | Right),
            CornerTopRight => matches!(direction, Up | Right),
            CornerBottomRight => matches!(direction, Down | Right),
            CornerBottomLeft => matches!(direction, Down | Left),
            CornerTopLeft => matches!(direction, Up | Left),
            TeeNoTop => !matches!(direction, Up),
            TeeNoRight => !matches!(direction, Right),
            TeeNoBottom => !matches!(direction, Down),
            TeeNoLeft => !matches!(direction, Left),
            Junction => true,
        }
    }

    pub fn connections(self) -> EnumMap<Direction, bool> {
        EnumMap::from_fn(|d| self.connects(d))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[derive(Sequence)]
pub enum HouseColor {
    Red,
    Blue,
    Green,
    Yellow,
    White,
}

impl HouseColor {
    pub const PALETTE: [HouseColor; 5] =
        [HouseColor::Red, HouseColor::Blue, HouseColor::Green, HouseColor::Yellow, HouseColor::White];

    pub const fn tag(self) -> &'static str {
        match self {
            HouseColor::Red => "house-red",
            HouseColor::Blue => "house-blue",
            HouseColor::Green => "house-green",
            HouseColor::Yellow => "house-yellow",
            HouseColor::White => "house-white",
        }
    }
}

/// Uniform over [`HouseColor::PALETTE`].
impl Distribution<HouseColor> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HouseColor {
        HouseColor::PALETTE[rng.gen_range(0..HouseColor::PALETTE.len())]
    }
}

/// The ground surface of a tile.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[derive(Sequence, IsVariant)]
pub enum BlockType {
    /// Not yet placed.
    #[default]
    Base,
    Grass(GrassVariant),
    /// Bare ground, the only surface trees and houses go on.
    Cleared,
    Road(RoadShape),
}

impl BlockType {
    pub const fn tag(self) -> &'static str {
        match self {
            BlockType::Base => "base",
            BlockType::Grass(variant) => variant.tag(),
            BlockType::Cleared => "cleared",
            BlockType::Road(shape) => shape.tag(),
        }
    }

    pub const fn road_shape(self) -> Option<RoadShape> {
        match self {
            BlockType::Road(shape) => Some(shape),
            _ => None,
        }
    }
}

impl Display for BlockType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for BlockType {
    type Err = UnknownTag;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        all::<BlockType>()
            .find(|b| b.tag() == s)
            .ok_or_else(|| UnknownTag { kind: "block", tag: s.to_owned() })
    }
}

/// What sits on top of a tile's block.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
#[derive(IsVariant)]
pub enum ObjectType {
    #[default]
    Empty,
    PlantedTree,
    GrowingTree,
    MatureTree,
    /// The anchor tile of a house.
    House(HouseColor),
    /// Covered by the house anchored at `anchor`.
    Occupied { anchor: Point },
}

impl ObjectType {
    pub const OCCUPIED_TAG: &'static str = "occupied";

    pub const fn tag(self) -> &'static str {
        match self {
            ObjectType::Empty => "empty",
            ObjectType::PlantedTree => "planted-tree",
            ObjectType::GrowingTree => "growing-tree",
            ObjectType::MatureTree => "mature-tree",
            ObjectType::House(color) => color.tag(),
            ObjectType::Occupied { .. } => Self::OCCUPIED_TAG,
        }
    }

    pub const fn anchor(self) -> Option<Point> {
        match self {
            ObjectType::Occupied { anchor } => Some(anchor),
            _ => None,
        }
    }

    /// Every object type that can be named by its tag alone, which is all of
    /// them except [`ObjectType::Occupied`].
    pub fn taggable() -> impl Iterator<Item = ObjectType> {
        [ObjectType::Empty, ObjectType::PlantedTree, ObjectType::GrowingTree, ObjectType::MatureTree]
            .into_iter()
            .chain(all::<HouseColor>().map(ObjectType::House))
    }
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectType::Occupied { anchor } => write!(f, "{} by {anchor}", self.tag()),
            _ => f.write_str(self.tag()),
        }
    }
}

/// Parses every tag except `occupied`, which cannot be rebuilt without its
/// anchor.
impl FromStr for ObjectType {
    type Err = UnknownTag;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::taggable()
            .find(|o| o.tag() == s)
            .ok_or_else(|| UnknownTag { kind: "object", tag: s.to_owned() })
    }
}

pub fn is_road(block: BlockType) -> bool {
    block.is_road()
}

pub fn is_grass(block: BlockType) -> bool {
    block.is_grass()
}

pub fn is_tree(object: ObjectType) -> bool {
    matches!(object, ObjectType::PlantedTree | ObjectType::GrowingTree | ObjectType::MatureTree)
}

pub fn is_house(object: ObjectType) -> bool {
    object.is_house()
}
