//! TOML configuration. Every section and field is optional and falls back to
//! its default.

use std::{fs, path::Path};

use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{math::Dimensions, rules::PlacementEngine};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TownConfig {
    pub world: WorldConfig,
    pub generation: GenerationWeights,
    pub placement: PlacementConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    /// Fixed seed for generation and placement randomness. Drawn from the OS
    /// when absent.
    pub seed: Option<u64>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { width: 20, height: 20, seed: None }
    }
}

impl WorldConfig {
    pub fn dims(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Relative weights of the block types a fresh world is populated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationWeights {
    pub grass_1: u32,
    pub grass_2: u32,
    pub cleared: u32,
}

impl Default for GenerationWeights {
    fn default() -> Self {
        GenerationWeights { grass_1: 30, grass_2: 60, cleared: 10 }
    }
}

impl GenerationWeights {
    pub fn total(&self) -> u64 {
        [self.grass_1, self.grass_2, self.cleared].iter().map(|&w| u64::from(w)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    pub grass_patch: Dimensions,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig { grass_patch: PlacementEngine::default().grass_patch() }
    }
}

impl PlacementConfig {
    pub fn engine(&self) -> PlacementEngine {
        PlacementEngine::new(self.grass_patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub tile_size: f32,
    pub block_elevation: f32,
    pub object_elevation: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig { tile_size: 2.0, block_elevation: 0.0, object_elevation: 1.0 }
    }
}

impl TownConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: TownConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = Self::from_toml(&fs::read_to_string(path)?)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.world.dims().area() == 0 {
            return Err(ConfigError::Invalid("world dimensions must be non-zero"));
        }
        if self.generation.total() == 0 {
            return Err(ConfigError::Invalid("generation weights must not all be zero"));
        }
        if self.placement.grass_patch.area() == 0 {
            return Err(ConfigError::Invalid("grass patch must be non-empty"));
        }
        if !(self.render.tile_size.is_finite() && self.render.tile_size > 0.0) {
            return Err(ConfigError::Invalid("tile size must be positive"));
        }
        Ok(())
    }
}
