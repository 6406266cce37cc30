use raster::RasterError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TerrainError {
    #[error("missing required parameters")]
    Builder,

    #[error("schema: {0}")]
    Schema(String),

    #[error("link {id}: {reason}")]
    Geometry { id: usize, reason: &'static str },

    #[error("invalid relative buffer {0}")]
    Buffer(f64),

    #[error("invalid grid resolution {rows}x{cols}")]
    Resolution { rows: usize, cols: usize },

    #[error("invalid distance per column {0}")]
    DistPerCol(f64),

    #[error("rectangle {id}: ({x}, {y}) outside raster coverage")]
    Coverage { id: usize, x: f64, y: f64 },

    #[error("rectangle {id}: no data at ({x}, {y})")]
    NoData { id: usize, x: f64, y: f64 },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Raster(#[from] RasterError),
}
