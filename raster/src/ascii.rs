//! ESRI ASCII grids.

use crate::{GeoTransform, Raster, RasterError, C};
use geo::geometry::Coord;
use std::{fs, path::Path, str::FromStr};

impl Raster {
    /// Returns a raster parsed from the ESRI ASCII grid at `path`.
    pub fn load_ascii_grid<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        fs::read_to_string(path)?.parse()
    }
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(C, bool)>,
    yll: Option<(C, bool)>,
    cellsize: Option<C>,
    nodata: Option<f32>,
}

impl FromStr for Raster {
    type Err = RasterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = |msg: String| RasterError::AsciiGrid(msg);
        let mut header = Header::default();
        let mut lines = s.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();

        // Header lines start with a keyword; the first numeric line
        // begins the samples.
        while let Some(&line) = lines.peek() {
            let mut fields = line.split_whitespace();
            let (Some(key), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                break;
            };
            if key.parse::<f64>().is_ok() {
                break;
            }
            let num = || {
                value
                    .parse::<C>()
                    .map_err(|_| err(format!("bad value {value:?} for {key}")))
            };
            let count = || {
                value
                    .parse::<usize>()
                    .map_err(|_| err(format!("bad value {value:?} for {key}")))
            };
            match key.to_ascii_lowercase().as_str() {
                "ncols" => header.ncols = Some(count()?),
                "nrows" => header.nrows = Some(count()?),
                "xllcorner" => header.xll = Some((num()?, false)),
                "xllcenter" => header.xll = Some((num()?, true)),
                "yllcorner" => header.yll = Some((num()?, false)),
                "yllcenter" => header.yll = Some((num()?, true)),
                "cellsize" => header.cellsize = Some(num()?),
                #[allow(clippy::cast_possible_truncation)]
                "nodata_value" => header.nodata = Some(num()? as f32),
                other => return Err(err(format!("unknown header key {other:?}"))),
            }
            lines.next();
        }

        let missing = |key: &str| err(format!("missing {key}"));
        let cols = header.ncols.ok_or_else(|| missing("ncols"))?;
        let rows = header.nrows.ok_or_else(|| missing("nrows"))?;
        let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
        let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;
        let cellsize = header.cellsize.ok_or_else(|| missing("cellsize"))?;

        let half = cellsize / 2.0;
        let west = if x_center { xll - half } else { xll };
        let south = if y_center { yll - half } else { yll };
        #[allow(clippy::cast_precision_loss)]
        let origin = Coord {
            x: west,
            y: south + rows as C * cellsize,
        };

        let mut samples = Vec::with_capacity(cols * rows);
        for token in lines.flat_map(str::split_whitespace) {
            let value = token
                .parse::<f32>()
                .map_err(|_| err(format!("bad sample {token:?}")))?;
            samples.push(value);
        }

        Self::new(
            GeoTransform::new(origin, Coord { x: cellsize, y: cellsize }),
            (cols, rows),
            samples,
            header.nodata,
        )
    }
}
