//! Random population of a fresh world.

use log::info;
use rand::{
    Rng,
    distributions::{Distribution, WeightedError, WeightedIndex},
};

use crate::{
    catalog::{BlockType, GrassVariant},
    config::GenerationWeights,
    math::{Dimensions, Grid},
    world::{Block, Object, Tile, World},
};

/// Draws block types according to [`GenerationWeights`].
#[derive(Debug, Clone)]
pub struct BlockSampler {
    kinds: [BlockType; 3],
    index: WeightedIndex<u32>,
}

impl BlockSampler {
    pub fn new(weights: &GenerationWeights) -> Result<Self, WeightedError> {
        let kinds = [
            BlockType::Grass(GrassVariant::One),
            BlockType::Grass(GrassVariant::Two),
            BlockType::Cleared,
        ];
        let index = WeightedIndex::new([weights.grass_1, weights.grass_2, weights.cleared])?;
        Ok(BlockSampler { kinds, index })
    }
}

impl Distribution<Block> for BlockSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block {
        Block::new(self.kinds[self.index.sample(rng)], rng.r#gen())
    }
}

/// A world of randomly chosen and rotated ground with nothing standing on it.
pub fn generate_world<R: Rng + ?Sized>(
    dims: Dimensions,
    weights: &GenerationWeights,
    rng: &mut R,
) -> Result<World, WeightedError> {
    let sampler = BlockSampler::new(weights)?;
    let tiles = Grid::from_fn(dims, |_| Tile::new(sampler.sample(rng), Object::EMPTY));
    info!("Generated a {}x{} world", dims.width, dims.height);
    Ok(World::new(tiles))
}
