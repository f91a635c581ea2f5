//! Persisted form of a [`World`].
//!
//! Each layer is stored as a JSON array of columns (outer index is x, inner
//! index is y), each cell a record `{type, rotation, id: {x, y}}`. Occupied
//! object records also carry the `anchor` of the house covering them.

use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    catalog::{BlockType, ObjectType, Rotation, UnknownTag},
    house::Footprint,
    math::{Dimensions, Grid, Point},
    world::{Block, Object, Tile, World},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub rotation: Rotation,
    pub id: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<Point>,
}

pub type LayerRecords = Vec<Vec<CellRecord>>;

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("layer has no cells")]
    Empty,
    #[error("column {x} has {len} cells, expected {expected}")]
    Ragged { x: usize, len: usize, expected: usize },
    #[error("cell at {at} claims to be at {id}")]
    IdMismatch { at: Point, id: Point },
    #[error("cell at {at} has an unusable type")]
    Tag {
        at: Point,
        #[source]
        source: UnknownTag,
    },
    #[error("house at {at} has rotation {degrees}, houses only face 0 or 180")]
    HouseRotation { at: Point, degrees: u16 },
    #[error("house at {at} reaches past the edge of the world")]
    HouseOutOfBounds { at: Point },
    #[error("houses at {at} and {other} overlap")]
    HouseOverlap { at: Point, other: Point },
    #[error("house at {at} does not occupy {cell}")]
    HouseIncomplete { at: Point, cell: Point },
    #[error("block layer is {}x{} but object layer is {}x{}", blocks.width, blocks.height, objects.width, objects.height)]
    DimensionMismatch { blocks: Dimensions, objects: Dimensions },
    #[error("layer is not valid JSON")]
    Json(#[from] serde_json::Error),
}

fn layer_dims(records: &LayerRecords) -> Result<Dimensions, LayerError> {
    let width = records.len();
    let height = records.first().map_or(0, Vec::len);
    if width == 0 || height == 0 {
        return Err(LayerError::Empty);
    }
    if let Some((x, column)) = records.iter().find_position(|column| column.len() != height) {
        return Err(LayerError::Ragged { x, len: column.len(), expected: height });
    }
    Ok(Dimensions::new(width, height))
}

/// Looks up the record for `at`, checking that it agrees about its own
/// position.
fn record_at(records: &LayerRecords, at: Point) -> Result<&CellRecord, LayerError> {
    let record = &records[at.x as usize][at.y as usize];
    if record.id != at {
        return Err(LayerError::IdMismatch { at, id: record.id });
    }
    Ok(record)
}

fn decode_object(record: &CellRecord, at: Point) -> Result<Object, LayerError> {
    let kind = if record.kind == ObjectType::OCCUPIED_TAG {
        // An anchorless occupied cell points at itself, which never resolves
        // to a house and gets picked up by the occupancy repair.
        ObjectType::Occupied { anchor: record.anchor.unwrap_or(at) }
    } else {
        record.kind.parse().map_err(|source| LayerError::Tag { at, source })?
    };
    if kind.is_house() && !Footprint::is_valid_rotation(record.rotation) {
        return Err(LayerError::HouseRotation { at, degrees: record.rotation.degrees() });
    }
    Ok(Object::new(kind, record.rotation))
}

/// Every house lies inside the world and no two houses share a tile.
fn check_house_placement(world: &World) -> Result<(), LayerError> {
    let houses = world.houses().collect_vec();
    if let Some(fp) = houses.iter().find(|fp| !fp.fits_within(world.dims())) {
        return Err(LayerError::HouseOutOfBounds { at: fp.anchor() });
    }
    if let Some((fp, other)) = houses.iter().tuple_combinations().find(|(a, b)| a.overlaps(**b)) {
        return Err(LayerError::HouseOverlap { at: fp.anchor(), other: other.anchor() });
    }
    Ok(())
}

/// Every non-anchor tile of a house is occupied on that house's behalf.
fn check_house_occupancy(world: &World) -> Result<(), LayerError> {
    for fp in world.houses() {
        let occupied = ObjectType::Occupied { anchor: fp.anchor() };
        let stray = fp.cells().skip(1).find(|&p| !world.object(p).is_ok_and(|o| o.kind == occupied));
        if let Some(cell) = stray {
            return Err(LayerError::HouseIncomplete { at: fp.anchor(), cell });
        }
    }
    Ok(())
}

impl World {
    fn layer_records<F>(&self, mut to_record: F) -> LayerRecords
    where
        F: FnMut(Point, &Tile) -> CellRecord,
    {
        let dims = self.dims();
        (0..dims.width as isize)
            .map(|x| {
                (0..dims.height as isize)
                    .filter_map(|y| {
                        let p = Point::new(x, y);
                        self.tile(p).ok().map(|tile| to_record(p, tile))
                    })
                    .collect_vec()
            })
            .collect_vec()
    }

    pub fn block_records(&self) -> LayerRecords {
        self.layer_records(|id, tile| CellRecord {
            kind: tile.block.kind.tag().to_owned(),
            rotation: tile.block.rotation,
            id,
            anchor: None,
        })
    }

    pub fn object_records(&self) -> LayerRecords {
        self.layer_records(|id, tile| CellRecord {
            kind: tile.object.kind.tag().to_owned(),
            rotation: tile.object.rotation,
            id,
            anchor: tile.object.kind.anchor(),
        })
    }

    /// Rebuilds a world from its two layers.
    ///
    /// Occupied cells that lack an anchor, or whose anchor is not a house
    /// covering them, are repaired against the houses present. Houses must
    /// fit the world, must not overlap, and must fully occupy their footprint.
    pub fn from_records(blocks: &LayerRecords, objects: &LayerRecords) -> Result<World, LayerError> {
        let dims = layer_dims(blocks)?;
        let object_dims = layer_dims(objects)?;
        if dims != object_dims {
            return Err(LayerError::DimensionMismatch { blocks: dims, objects: object_dims });
        }

        let tiles = dims
            .iter_within()
            .map(|at| -> Result<Tile, LayerError> {
                let block_record = record_at(blocks, at)?;
                let kind = block_record
                    .kind
                    .parse::<BlockType>()
                    .map_err(|source| LayerError::Tag { at, source })?;
                let block = Block::new(kind, block_record.rotation);
                let object = decode_object(record_at(objects, at)?, at)?;
                Ok(Tile::new(block, object))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let tiles = Grid::try_from_vec(dims, tiles).ok_or(LayerError::Empty)?;

        let mut world = World::new(tiles);
        check_house_placement(&world)?;
        let dangling = world.dangling_occupied().len();
        if dangling > 0 {
            warn!("Repairing {dangling} occupied tiles with a missing or stale anchor");
            world.repair_occupancy();
        }
        check_house_occupancy(&world)?;
        Ok(world)
    }

    /// Serializes both layers to JSON, blocks first.
    pub fn encode_layers(&self) -> Result<(String, String), serde_json::Error> {
        Ok((
            serde_json::to_string(&self.block_records())?,
            serde_json::to_string(&self.object_records())?,
        ))
    }

    pub fn decode_layers(blocks: &str, objects: &str) -> Result<World, LayerError> {
        let blocks: LayerRecords = serde_json::from_str(blocks)?;
        let objects: LayerRecords = serde_json::from_str(objects)?;
        let world = World::from_records(&blocks, &objects)?;
        info!("Decoded a {}x{} world", world.dims().width, world.dims().height);
        Ok(world)
    }
}
