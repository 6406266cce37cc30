//! Single-band GeoTIFF rasters.

use crate::{GeoTransform, Raster, RasterError};
use geo::geometry::Coord;
use log::debug;
use std::{fs::File, io::BufReader, path::Path};
use tiff::{
    decoder::{Decoder, DecodingResult, Limits},
    tags::Tag,
    ColorType,
};

/// `RasterTypeGeoKey`
const RASTER_TYPE_KEY: u16 = 1025;

/// `RasterPixelIsPoint`
const PIXEL_IS_POINT: u16 = 2;

impl Raster {
    /// Returns a raster decoded into memory from the GeoTIFF at `path`.
    ///
    /// Only the first image of the file is read, and it must be a
    /// single grayscale band georeferenced without rotation.
    pub fn load_geotiff<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let mut decoder =
            Decoder::new(BufReader::new(File::open(path)?))?.with_limits(Limits::unlimited());

        let colortype = decoder.colortype()?;
        if !matches!(colortype, ColorType::Gray(_)) {
            return Err(RasterError::Unsupported(format!(
                "{path:?} has color type {colortype:?}, expected a single band"
            )));
        }

        let (width, height) = decoder.dimensions()?;
        let dimensions = (width as usize, height as usize);

        let mut transform = read_transform(&mut decoder)?
            .ok_or_else(|| RasterError::Georeference(path.to_owned()))?;
        if pixel_is_point(&mut decoder)? {
            transform.origin.x -= transform.pixel_size.x / 2.0;
            transform.origin.y += transform.pixel_size.y / 2.0;
        }

        let nodata = decoder
            .find_tag(Tag::GdalNodata)?
            .map(|v| v.into_string())
            .transpose()?
            .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f32>().ok());

        let samples = into_f32(decoder.read_image()?);
        debug!(
            "decoded {path:?}: {}x{} origin {:?} pixel {:?} nodata {nodata:?}",
            dimensions.0, dimensions.1, transform.origin, transform.pixel_size
        );
        Self::new(transform, dimensions, samples, nodata)
    }
}

fn read_transform(
    decoder: &mut Decoder<BufReader<File>>,
) -> Result<Option<GeoTransform>, RasterError> {
    let scale = decoder
        .find_tag(Tag::ModelPixelScaleTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;
    let tiepoint = decoder
        .find_tag(Tag::ModelTiepointTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?;

    if let (Some(scale), Some(tiepoint)) = (scale, tiepoint) {
        let (&[sx, sy, ..], &[i, j, _, x, y, ..]) = (scale.as_slice(), tiepoint.as_slice()) else {
            return Err(RasterError::Unsupported(
                "truncated pixel scale or tiepoint".to_string(),
            ));
        };
        let origin = Coord {
            x: x - i * sx,
            y: y + j * sy,
        };
        return Ok(Some(GeoTransform::new(origin, Coord { x: sx, y: sy })));
    }

    let Some(matrix) = decoder
        .find_tag(Tag::ModelTransformationTag)?
        .map(|v| v.into_f64_vec())
        .transpose()?
    else {
        return Ok(None);
    };
    let &[m0, m1, _, m3, m4, m5, _, m7, ..] = matrix.as_slice() else {
        return Err(RasterError::Unsupported(
            "truncated model transformation".to_string(),
        ));
    };
    if m1 != 0.0 || m4 != 0.0 {
        return Err(RasterError::Unsupported(
            "rotated rasters are not supported".to_string(),
        ));
    }
    Ok(Some(GeoTransform::new(
        Coord { x: m3, y: m7 },
        Coord { x: m0, y: -m5 },
    )))
}

fn pixel_is_point(decoder: &mut Decoder<BufReader<File>>) -> Result<bool, RasterError> {
    let Some(keys) = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)?
        .map(|v| v.into_u16_vec())
        .transpose()?
    else {
        return Ok(false);
    };
    // Four-word header followed by (key, location, count, value) entries.
    Ok(keys
        .chunks_exact(4)
        .skip(1)
        .any(|entry| entry[0] == RASTER_TYPE_KEY && entry[1] == 0 && entry[3] == PIXEL_IS_POINT))
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn into_f32(result: DecodingResult) -> Vec<f32> {
    match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|s| s as f32).collect(),
        #[allow(unreachable_patterns)]
        _ => Vec::new(),
    }
}
