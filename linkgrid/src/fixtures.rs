//! Test inputs written to a per-process scratch directory.

use crate::options::{DispatchArgs, LinkArgs, ResamplingArg};
use serde_json::json;
use std::{
    fmt::Write,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("linkgrid-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Writes a FeatureCollection with one link per `(head, tail)` pair.
///
/// Every link has a 30 m transmitter and a 2 m receiver; even links
/// succeeded.
pub fn write_links(dir: &Path, lines: &[((f64, f64), (f64, f64))]) -> PathBuf {
    let features: Vec<_> = lines
        .iter()
        .enumerate()
        .map(|(i, ((x0, y0), (x1, y1)))| {
            json!({
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[x0, y0], [x1, y1]] },
                "properties": {
                    "elevation_tx": 30.0,
                    "elevation_rx": 2.0,
                    "success": i % 2 == 0,
                    "timestamp": 1_700_000_000 + i,
                    "id": format!("link-{i}"),
                }
            })
        })
        .collect();
    let path = dir.join("links.geojson");
    let collection = json!({ "type": "FeatureCollection", "features": features });
    std::fs::write(&path, collection.to_string()).unwrap();
    path
}

/// Writes a `cols × rows` ESRI ASCII grid of unit cells with its
/// south-west corner at the origin.
pub fn write_raster(
    dir: &Path,
    name: &str,
    (cols, rows): (usize, usize),
    value: impl Fn(usize, usize) -> f32,
) -> PathBuf {
    let mut grid = format!(
        "ncols {cols}\nnrows {rows}\nxllcorner 0\nyllcorner 0\ncellsize 1\nnodata_value -9999\n"
    );
    for row in 0..rows {
        let line: Vec<String> = (0..cols).map(|col| value(col, row).to_string()).collect();
        writeln!(grid, "{}", line.join(" ")).unwrap();
    }
    let path = dir.join(name);
    std::fs::write(&path, grid).unwrap();
    path
}

pub fn link_args(links: &Path, max_size: Option<usize>) -> LinkArgs {
    LinkArgs {
        links: links.to_owned(),
        head_field: "elevation_tx".to_string(),
        tail_field: "elevation_rx".to_string(),
        outcome_field: "success".to_string(),
        timestamp_field: "timestamp".to_string(),
        id_field: "id".to_string(),
        max_size: max_size.and_then(NonZeroUsize::new),
    }
}

pub fn dispatch_args(raster: &Path) -> DispatchArgs {
    DispatchArgs {
        raster: raster.to_owned(),
        relative_buffer: 0.1,
        max_dist: None,
        resampling: ResamplingArg::Nearest,
        nodata_fill: None,
        workers: Some(4),
        task_timeout: None,
        report: None,
    }
}
