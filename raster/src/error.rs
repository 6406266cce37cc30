use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("unrecognized raster format {0}")]
    Format(PathBuf),

    #[error("invalid HGT name {0}")]
    HgtName(PathBuf),

    #[error("invalid HGT file len {0} for {1}")]
    HgtLen(u64, PathBuf),

    #[error("no georeferencing tags in {0}")]
    Georeference(PathBuf),

    #[error("unsupported raster: {0}")]
    Unsupported(String),

    #[error("invalid ASCII grid: {0}")]
    AsciiGrid(String),

    #[error("invalid raster dimensions {0}x{1}")]
    Dimensions(usize, usize),

    #[error("invalid pixel size ({0}, {1})")]
    PixelSize(f64, f64),

    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },
}
