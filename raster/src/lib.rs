//! Single-band, north-up, georeferenced rasters.
//!
//! Supported formats:
//!
//! 1. GeoTIFF (`.tif`, `.tiff`), decoded into memory.
//! 1. NASADEM/SRTM elevation tiles (`.hgt`), memory mapped.
//! 1. ESRI ASCII grids (`.asc`), parsed into memory.
//!
//! # References
//!
//! 1. [OGC GeoTIFF Standard](https://docs.ogc.org/is/19-008r4/19-008r4.html)
//! 1. [HGT file layout](https://www.researchgate.net/profile/Pierre-Boulanger-4/publication/228924813/figure/fig8/AS:300852653903880@1448740270695/Description-of-a-HGT-file-structure-The-name-file-in-this-case-is-N20W100HGT.png)
//! 1. [SRTM Collection User Guide](https://lpdaac.usgs.gov/documents/179/SRTM_User_Guide_V3.pdf)
//! 1. [Esri ASCII raster format](https://desktop.arcgis.com/en/arcmap/latest/manage-data/raster-and-images/esri-ascii-raster-format.htm)

mod ascii;
mod error;
mod geotiff;
mod hgt;
mod transform;

pub use crate::{error::RasterError, transform::GeoTransform};
pub use geo;
use geo::geometry::{Coord, Rect};
use log::debug;
use memmap2::Mmap;
use std::{ffi::OsStr, mem::size_of, path::Path};

/// Base floating point type used for all coordinates and calculations.
pub type C = f64;

/// How to derive a value for a coordinate that falls between pixel
/// centers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resampling {
    /// Value of the pixel whose area contains the coordinate.
    #[default]
    Nearest,

    /// Bilinear interpolation between the four surrounding pixel
    /// centers, clamped to the outermost centers at the raster border.
    Bilinear,
}

pub struct Raster {
    /// Pixel ↔ world mapping.
    transform: GeoTransform,

    /// Number of (columns, rows) in this raster.
    dimensions: (usize, usize),

    /// Sentinel marking missing samples, if the source declares one.
    nodata: Option<f32>,

    /// Samples, row-major starting at the north-west pixel.
    samples: SampleStore,
}

enum SampleStore {
    InMem(Box<[f32]>),
    /// Raw big-endian `i16` samples (HGT layout).
    MemMap(Mmap),
}

impl SampleStore {
    fn get_unchecked(&self, index: usize) -> f32 {
        match self {
            Self::InMem(samples) => samples[index],
            Self::MemMap(raw) => {
                let start = index * size_of::<i16>();
                f32::from(i16::from_be_bytes([raw[start], raw[start + 1]]))
            }
        }
    }
}

impl Raster {
    /// Returns an in-memory raster from row-major `samples`.
    pub fn new(
        transform: GeoTransform,
        dimensions @ (cols, rows): (usize, usize),
        samples: Vec<f32>,
        nodata: Option<f32>,
    ) -> Result<Self, RasterError> {
        if cols == 0 || rows == 0 {
            return Err(RasterError::Dimensions(cols, rows));
        }
        if !transform.is_valid() {
            let Coord { x, y } = transform.pixel_size;
            return Err(RasterError::PixelSize(x, y));
        }
        if samples.len() != cols * rows {
            return Err(RasterError::SampleCount {
                expected: cols * rows,
                found: samples.len(),
            });
        }
        Ok(Self {
            transform,
            dimensions,
            nodata,
            samples: SampleStore::InMem(samples.into_boxed_slice()),
        })
    }

    /// Opens the raster at `path`, choosing a reader by file extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        debug!("opening raster {path:?}");
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("tif" | "tiff") => Self::load_geotiff(path),
            Some("hgt") => Self::memmap_hgt(path),
            Some("asc") => Self::load_ascii_grid(path),
            _ => Err(RasterError::Format(path.to_owned())),
        }
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Returns the (columns, rows) of this raster.
    pub fn dimensions(&self) -> (usize, usize) {
        self.dimensions
    }

    /// Returns the number of samples in this raster.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        let (cols, rows) = self.dimensions;
        cols * rows
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    /// Returns true if `value` is NaN or equals this raster's nodata
    /// sentinel.
    pub fn is_nodata(&self, value: C) -> bool {
        value.is_nan() || self.nodata.map_or(false, |nodata| value == C::from(nodata))
    }

    /// Returns the area covered by this raster's pixels.
    pub fn extent(&self) -> Rect<C> {
        self.transform.extent(self.dimensions)
    }

    /// Returns true if `coord` lies within (or on the border of) this
    /// raster's extent.
    pub fn contains(&self, coord: Coord<C>) -> bool {
        let extent = self.extent();
        let (min, max) = (extent.min(), extent.max());
        min.x <= coord.x && coord.x <= max.x && min.y <= coord.y && coord.y <= max.y
    }

    /// Returns the sample of the pixel containing `coord`, if any.
    pub fn get(&self, coord: Coord<C>) -> Option<f32> {
        self.coord_to_xy(coord).map(|xy| self.get_xy_unchecked(xy))
    }

    /// Returns the sample at pixel `(col, row)`, if any.
    pub fn get_xy(&self, (col, row): (usize, usize)) -> Option<f32> {
        let (cols, rows) = self.dimensions;
        (col < cols && row < rows).then(|| self.get_xy_unchecked((col, row)))
    }

    /// Returns the value at `coord` using `resampling`, or `None` if
    /// `coord` lies outside this raster.
    ///
    /// Bilinear results touching a nodata pixel are reported as the
    /// nodata sentinel.
    pub fn sample(&self, coord: Coord<C>, resampling: Resampling) -> Option<C> {
        match resampling {
            Resampling::Nearest => self.get(coord).map(C::from),
            Resampling::Bilinear => self.bilinear(coord),
        }
    }
}

/// Private API
impl Raster {
    fn get_xy_unchecked(&self, (col, row): (usize, usize)) -> f32 {
        self.samples.get_unchecked(self.xy_to_linear_index((col, row)))
    }

    fn xy_to_linear_index(&self, (col, row): (usize, usize)) -> usize {
        self.dimensions.0 * row + col
    }

    /// Returns the pixel whose area contains `coord`.
    ///
    /// Coordinates on the east or south border belong to the last
    /// column or row.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn coord_to_xy(&self, coord: Coord<C>) -> Option<(usize, usize)> {
        if !self.contains(coord) {
            return None;
        }
        let (cols, rows) = self.dimensions;
        let pixel = self.transform.world_to_pixel(coord);
        let col = (pixel.x.floor().max(0.0) as usize).min(cols - 1);
        let row = (pixel.y.floor().max(0.0) as usize).min(rows - 1);
        Some((col, row))
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn bilinear(&self, coord: Coord<C>) -> Option<C> {
        if !self.contains(coord) {
            return None;
        }
        let (cols, rows) = self.dimensions;
        let pixel = self.transform.world_to_pixel(coord);
        // Shift into pixel-center space.
        let fx = (pixel.x - 0.5).clamp(0.0, (cols - 1) as C);
        let fy = (pixel.y - 0.5).clamp(0.0, (rows - 1) as C);
        let (x0, y0) = (fx.floor() as usize, fy.floor() as usize);
        let (x1, y1) = ((x0 + 1).min(cols - 1), (y0 + 1).min(rows - 1));
        let (tx, ty) = (fx - x0 as C, fy - y0 as C);

        let corners = [(x0, y0), (x1, y0), (x0, y1), (x1, y1)]
            .map(|xy| C::from(self.get_xy_unchecked(xy)));
        if let Some(nodata) = corners.iter().find(|v| self.is_nodata(**v)) {
            return Some(*nodata);
        }
        let [v00, v10, v01, v11] = corners;
        let top = v00 + (v10 - v00) * tx;
        let bottom = v01 + (v11 - v01) * tx;
        Some(top + (bottom - top) * ty)
    }
}

#[cfg(test)]
pub(crate) fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("raster-{}-{name}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
