pub mod dimensions;
pub mod grid;
pub mod point;

pub use dimensions::Dimensions;
pub use grid::{Grid, Neighbors, OutOfBounds};
pub use point::{Direction, Point};
