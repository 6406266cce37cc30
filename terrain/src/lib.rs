//! Line-aligned sampling windows over radio links, and the raster
//! sample grids taken inside them.

mod deadline;
mod error;
mod grid;
mod link;
mod math;
mod rectangle;

pub use crate::{
    deadline::Deadline,
    error::TerrainError,
    grid::{columns_for_length, sample, GridSpec, SampleGrid, SampleMode},
    link::Link,
    rectangle::{make_rectangles, Rectangle, RectangleBuilder},
};
pub use geo;
pub use raster;
