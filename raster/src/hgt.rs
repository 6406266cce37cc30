//! NASADEM/SRTM elevation (`.hgt`) tiles.
//!
//! A tile covers one degree of latitude and longitude. Samples are
//! big-endian `i16`, row-major from the north edge, and the outermost
//! samples are centered on the tile's edges.

use crate::{GeoTransform, Raster, RasterError, SampleStore, C};
use byteorder::{BigEndian as BE, ReadBytesExt};
use geo::geometry::Coord;
use log::debug;
use memmap2::Mmap;
use std::{ffi::OsStr, fs::File, io::BufReader, mem::size_of, path::Path};

const ARCSEC_PER_DEG: C = 3600.0;

/// Sentinel used by SRTM for voids.
const VOID: f32 = -32768.0;

impl Raster {
    /// Returns a raster read into memory from the HGT file at `path`.
    pub fn load_hgt<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let (resolution, dimensions @ (cols, rows)) = extract_resolution(&path)?;
        let transform = tile_transform(parse_sw_corner(&path)?, resolution);

        let mut file = BufReader::new(File::open(path)?);

        let samples = {
            let mut sample_store = Vec::with_capacity(cols * rows);
            for _ in 0..(cols * rows) {
                let sample = file.read_i16::<BE>()?;
                sample_store.push(f32::from(sample));
            }
            SampleStore::InMem(sample_store.into_boxed_slice())
        };

        Ok(Self {
            transform,
            dimensions,
            nodata: Some(VOID),
            samples,
        })
    }

    /// Returns a raster using the memory-mapped HGT file as storage.
    pub fn memmap_hgt<P: AsRef<Path>>(path: P) -> Result<Self, RasterError> {
        let (resolution, dimensions) = extract_resolution(&path)?;
        let transform = tile_transform(parse_sw_corner(&path)?, resolution);

        let samples = {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            SampleStore::MemMap(mmap)
        };

        Ok(Self {
            transform,
            dimensions,
            nodata: Some(VOID),
            samples,
        })
    }
}

/// Returns the transform for a tile whose south-west sample is centered
/// on `sw_corner`.
fn tile_transform(sw_corner: Coord<i16>, resolution: u8) -> GeoTransform {
    let pixel = C::from(resolution) / ARCSEC_PER_DEG;
    let half = pixel / 2.0;
    GeoTransform::new(
        Coord {
            x: C::from(sw_corner.x) - half,
            y: C::from(sw_corner.y) + 1.0 + half,
        },
        Coord { x: pixel, y: pixel },
    )
}

fn extract_resolution<P: AsRef<Path>>(path: P) -> Result<(u8, (usize, usize)), RasterError> {
    const RES_1_ARCSECONDS_FILE_LEN: u64 = 3601 * 3601 * size_of::<u16>() as u64;
    const RES_3_ARCSECONDS_FILE_LEN: u64 = 1201 * 1201 * size_of::<u16>() as u64;
    match path.as_ref().metadata().map(|m| m.len())? {
        RES_1_ARCSECONDS_FILE_LEN => Ok((1, (3601, 3601))),
        RES_3_ARCSECONDS_FILE_LEN => Ok((3, (1201, 1201))),
        invalid_len => {
            debug!("rejecting {:?} with len {invalid_len}", path.as_ref());
            Err(RasterError::HgtLen(invalid_len, path.as_ref().to_owned()))
        }
    }
}

fn parse_sw_corner<P: AsRef<Path>>(path: P) -> Result<Coord<i16>, RasterError> {
    let mk_err = || RasterError::HgtName(path.as_ref().to_owned());
    let name = path
        .as_ref()
        .file_stem()
        .and_then(OsStr::to_str)
        .ok_or_else(mk_err)?;
    if name.len() != 7 || !name.is_ascii() {
        return Err(mk_err());
    }
    let lat_sign = match &name[0..1] {
        "N" | "n" => 1,
        "S" | "s" => -1,
        _ => return Err(mk_err()),
    };
    let lat = lat_sign * name[1..3].parse::<i16>().map_err(|_| mk_err())?;
    let lon_sign = match &name[3..4] {
        "E" | "e" => 1,
        "W" | "w" => -1,
        _ => return Err(mk_err()),
    };
    let lon = lon_sign * name[4..7].parse::<i16>().map_err(|_| mk_err())?;
    Ok(Coord { x: lon, y: lat })
}
