//! World model and editing rules for a tile-based town builder.
//!
//! A [`World`] is a grid of tiles, each holding a ground block and an object
//! standing on it. All edits go through the [`PlacementEngine`], which checks
//! an action's preconditions before applying it and re-tags road shapes
//! afterwards. The [`WorldStore`] wraps a world with persistence, selection
//! and change notification.

pub mod catalog;
pub mod config;
pub mod generate;
pub mod house;
pub mod math;
pub mod render;
pub mod roads;
pub mod rules;
pub mod store;
pub mod world;

pub use catalog::{BlockType, ObjectType, Rotation};
pub use config::TownConfig;
pub use math::{Dimensions, Direction, Grid, OutOfBounds, Point};
pub use rules::{Action, ActionReport, PlacementEngine, PlacementError, Rejection};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError, WorldStore};
pub use world::World;
