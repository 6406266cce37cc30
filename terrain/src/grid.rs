//! Raster sample grids over [`Rectangle`]s.

use crate::{math::linspace, Deadline, Rectangle, TerrainError};
use geo::geometry::Coord;
use log::debug;
use raster::{Raster, Resampling, C};
use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

/// What each grid value holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SampleMode {
    /// The raster value at the sample point.
    #[default]
    Elevation,

    /// Line-of-sight height minus the raster value at the sample
    /// point. Negative values are obstructions.
    Clearance,
}

/// Shape and lookup policy of a sample grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    /// Samples across the path.
    pub rows: usize,

    /// Samples along the path.
    pub cols: usize,

    pub mode: SampleMode,

    pub resampling: Resampling,

    /// Value substituted for nodata samples. Without one, nodata is an
    /// error.
    pub nodata_fill: Option<C>,
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize) -> Result<Self, TerrainError> {
        if rows == 0 || cols == 0 {
            return Err(TerrainError::Resolution { rows, cols });
        }
        Ok(Self {
            rows,
            cols,
            mode: SampleMode::default(),
            resampling: Resampling::default(),
            nodata_fill: None,
        })
    }

    #[must_use]
    pub fn mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }

    #[must_use]
    pub fn nodata_fill(mut self, fill: Option<C>) -> Self {
        self.nodata_fill = fill;
        self
    }
}

/// Returns the number of columns needed to sample a path of `length`
/// at most every `dist_per_col` units.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn columns_for_length(length: C, dist_per_col: C) -> Result<usize, TerrainError> {
    if !(dist_per_col.is_finite() && dist_per_col > 0.0) {
        return Err(TerrainError::DistPerCol(dist_per_col));
    }
    Ok((length / dist_per_col).floor().max(0.0) as usize + 1)
}

/// Row-major `rows × cols` values sampled over one [`Rectangle`].
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    /// Id of the sampled rectangle.
    pub id: usize,
    rows: usize,
    cols: usize,
    mode: SampleMode,
    values: Vec<C>,
}

impl SampleGrid {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn mode(&self) -> SampleMode {
        self.mode
    }

    /// Returns all values, row-major.
    pub fn values(&self) -> &[C] {
        &self.values
    }

    pub fn get(&self, row: usize, col: usize) -> Option<C> {
        (row < self.rows && col < self.cols).then(|| self.values[row * self.cols + col])
    }

    pub fn row(&self, row: usize) -> Option<&[C]> {
        (row < self.rows).then(|| &self.values[row * self.cols..(row + 1) * self.cols])
    }

    /// Fraction of negative values.
    ///
    /// For [`SampleMode::Clearance`] grids this is the fraction of
    /// sample points where terrain rises above the line-of-sight.
    #[allow(clippy::cast_precision_loss)]
    pub fn obstruction(&self) -> C {
        let obstructed = self.values.iter().filter(|v| **v < 0.0).count();
        obstructed as C / self.values.len() as C
    }

    /// Writes one line per row, values comma-separated in scientific
    /// notation with `precision` fractional digits.
    pub fn write_csv(&self, mut wtr: impl Write, precision: usize) -> io::Result<()> {
        for row in self.values.chunks_exact(self.cols) {
            for (col, value) in row.iter().enumerate() {
                if col > 0 {
                    wtr.write_all(b",")?;
                }
                write!(wtr, "{value:.precision$e}")?;
            }
            wtr.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes this grid to `<dir>/<id>.csv` and returns its path.
    ///
    /// The file only appears once it is complete.
    pub fn save(&self, dir: &Path, precision: usize) -> Result<PathBuf, TerrainError> {
        let out_path = dir.join(format!("{}.csv", self.id));
        let tmp_path = {
            let mut p = out_path.clone();
            p.set_extension("tmp");
            p
        };
        {
            let mut wtr = BufWriter::new(File::create(&tmp_path)?);
            self.write_csv(&mut wtr, precision)?;
            wtr.flush()?;
        }
        fs::rename(&tmp_path, &out_path)?;
        Ok(out_path)
    }
}

/// Samples `raster` on a `spec.rows × spec.cols` grid spanning `rect`.
///
/// Sample points are evenly spaced from edge to edge of the window:
/// columns run from behind the head to past the tail, rows run across
/// the path. The whole window must lie within the raster's extent.
pub fn sample(
    rect: &Rectangle,
    raster: &Raster,
    spec: &GridSpec,
    deadline: &Deadline,
) -> Result<SampleGrid, TerrainError> {
    let GridSpec {
        rows,
        cols,
        mode,
        resampling,
        nodata_fill,
    } = *spec;
    if rows == 0 || cols == 0 {
        return Err(TerrainError::Resolution { rows, cols });
    }
    deadline.check()?;

    let coverage_err = |Coord { x, y }: Coord<C>| TerrainError::Coverage { id: rect.id, x, y };
    if let Some(corner) = rect.corners().into_iter().find(|c| !raster.contains(*c)) {
        return Err(coverage_err(corner));
    }

    let local = rect.local_rect();
    let xs: Vec<C> = linspace(local.min().x, local.max().x, cols).collect();
    let ys: Vec<C> = linspace(local.min().y, local.max().y, rows).collect();
    let to_world = rect.world_transform();

    let mut values = Vec::with_capacity(rows * cols);
    for &y in &ys {
        deadline.check()?;
        for &x in &xs {
            let world = to_world.apply(Coord { x, y });
            let value = match raster.sample(world, resampling) {
                None => return Err(coverage_err(world)),
                Some(v) if raster.is_nodata(v) => {
                    nodata_fill.ok_or_else(|| TerrainError::NoData {
                        id: rect.id,
                        x: world.x,
                        y: world.y,
                    })?
                }
                Some(v) => v,
            };
            values.push(match mode {
                SampleMode::Elevation => value,
                SampleMode::Clearance => rect.los_height(x) - value,
            });
        }
    }

    debug!("sampled rectangle {}: {rows}x{cols} {mode:?}", rect.id);
    Ok(SampleGrid {
        id: rect.id,
        rows,
        cols,
        mode,
        values,
    })
}
