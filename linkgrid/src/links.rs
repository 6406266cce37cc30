use crate::{options::LinkArgs, report::Failure};
use anyhow::Result;
use geo::geometry::{Coord, Line};
use geojson::{Feature, GeoJson, Value};
use log::{debug, info};
use std::{fs::File, io::BufReader, num::NonZeroUsize};
use terrain::{make_rectangles, Link, Rectangle, TerrainError};

/// Reads at most `max_size` links from the GeoJSON file in `args`.
///
/// Any feature missing its geometry or elevations aborts the load.
pub fn load(args: &LinkArgs) -> Result<Vec<Link>> {
    let rdr = BufReader::new(File::open(&args.links)?);
    let GeoJson::FeatureCollection(collection) = GeoJson::from_reader(rdr)? else {
        return Err(schema(format!("{:?} is not a FeatureCollection", args.links)));
    };
    let limit = args.max_size.map_or(usize::MAX, NonZeroUsize::get);
    let links = collection
        .features
        .iter()
        .take(limit)
        .enumerate()
        .map(|(index, feature)| parse_link(args, index, feature))
        .collect::<Result<Vec<_>>>()?;
    info!(
        "loaded {} of {} links from {:?}",
        links.len(),
        collection.features.len(),
        args.links
    );
    Ok(links)
}

/// Builds sampling windows for `links`, returning the windows that
/// could be built and a failure for each that could not.
///
/// Links longer than `max_dist` are skipped and reported as failures.
pub fn rectangles(
    links: &[Link],
    relative_buffer: f64,
    max_dist: Option<f64>,
) -> Result<(Vec<Rectangle>, Vec<Failure>)> {
    let lines: Vec<Line<f64>> = links.iter().map(|l| l.line).collect();
    let heads: Vec<f64> = links.iter().map(|l| l.head_elev_m).collect();
    let tails: Vec<f64> = links.iter().map(|l| l.tail_elev_m).collect();
    let mut rectangles = Vec::with_capacity(links.len());
    let mut failures = Vec::new();
    for (index, rectangle) in make_rectangles(&lines, &heads, &tails, relative_buffer)?
        .into_iter()
        .enumerate()
    {
        match rectangle {
            Ok(rectangle) => match max_dist {
                Some(max) if rectangle.length() > max => failures.push(Failure {
                    index,
                    reason: format!(
                        "skipped: length {:.3} exceeds max distance {max}",
                        rectangle.length()
                    ),
                }),
                _ => rectangles.push(rectangle),
            },
            Err(e) => failures.push(Failure {
                index,
                reason: e.to_string(),
            }),
        }
    }
    debug!(
        "{} rectangles, {} geometry failures",
        rectangles.len(),
        failures.len()
    );
    Ok((rectangles, failures))
}

fn schema(msg: String) -> anyhow::Error {
    TerrainError::Schema(msg).into()
}

fn parse_link(args: &LinkArgs, index: usize, feature: &Feature) -> Result<Link> {
    let line = match feature.geometry.as_ref().map(|g| &g.value) {
        Some(Value::LineString(coords)) if coords.len() >= 2 => {
            let to_coord = |position: &Vec<f64>| match position.as_slice() {
                [x, y, ..] => Ok(Coord { x: *x, y: *y }),
                _ => Err(schema(format!("feature {index}: position with < 2 values"))),
            };
            Line::new(
                to_coord(&coords[0])?,
                to_coord(&coords[coords.len() - 1])?,
            )
        }
        Some(_) => {
            return Err(schema(format!(
                "feature {index}: expected a LineString with 2 or more positions"
            )))
        }
        None => return Err(schema(format!("feature {index}: missing geometry"))),
    };

    let elevation = |field: &str| {
        feature
            .property(field)
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| schema(format!("feature {index}: missing numeric property {field:?}")))
    };
    let head_elev_m = elevation(&args.head_field)?;
    let tail_elev_m = elevation(&args.tail_field)?;

    let success = feature
        .property(&args.outcome_field)
        .and_then(|v| match v {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            _ => None,
        });
    let text = |field: &str| {
        feature.property(field).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    Ok(Link {
        line,
        head_elev_m,
        tail_elev_m,
        success,
        timestamp: text(&args.timestamp_field),
        id: text(&args.id_field),
    })
}
