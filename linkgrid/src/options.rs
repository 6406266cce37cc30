use clap::{Args, Parser, ValueEnum};
use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

/// Attach raster terrain features to radio links.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Sample a grid of raster values around each link and write one
    /// CSV file per link.
    Sample(Sample),

    /// Estimate the fraction of each link's path obstructed by
    /// terrain.
    Obstruction(Obstruction),

    /// Evaluate a path loss model over each link's length.
    Pathloss(Pathloss),
}

#[derive(Debug, Clone, Args)]
pub struct LinkArgs {
    /// GeoJSON FeatureCollection of LineString links. The first
    /// coordinate is the transmitter, the last the receiver.
    #[arg(short, long)]
    pub links: PathBuf,

    /// Property holding the transmitter's elevation.
    #[arg(long, default_value = "elevation_tx")]
    pub head_field: String,

    /// Property holding the receiver's elevation.
    #[arg(long, default_value = "elevation_rx")]
    pub tail_field: String,

    /// Property holding the transmission outcome.
    #[arg(long, default_value = "success")]
    pub outcome_field: String,

    #[arg(long, default_value = "timestamp")]
    pub timestamp_field: String,

    #[arg(long, default_value = "id")]
    pub id_field: String,

    /// Process at most this many links.
    #[arg(short = 'n', long)]
    pub max_size: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, Args)]
pub struct DispatchArgs {
    /// Raster (.tif, .hgt, .asc) in the same coordinate system as the
    /// links.
    #[arg(short, long)]
    pub raster: PathBuf,

    /// Padding around each link, as a fraction of its length.
    #[arg(short = 'b', long, default_value_t = 0.1)]
    pub relative_buffer: f64,

    #[arg(long, value_enum, default_value_t = ResamplingArg::Nearest)]
    pub resampling: ResamplingArg,

    /// Skip links longer than this, in raster units.
    #[arg(long)]
    pub max_dist: Option<f64>,

    /// Replace nodata samples with this value instead of failing the
    /// link.
    #[arg(long)]
    pub nodata_fill: Option<f64>,

    /// Worker threads [default: available CPUs].
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-link time limit in seconds.
    #[arg(long, value_parser = parse_secs)]
    pub task_timeout: Option<Duration>,

    /// Also write the run report as JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResamplingArg {
    /// Pixel containing the sample point.
    Nearest,
    /// Interpolate between the four nearest pixel centers.
    Bilinear,
}

impl From<ResamplingArg> for raster::Resampling {
    fn from(arg: ResamplingArg) -> Self {
        match arg {
            ResamplingArg::Nearest => Self::Nearest,
            ResamplingArg::Bilinear => Self::Bilinear,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct Sample {
    #[command(flatten)]
    pub links: LinkArgs,

    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Samples across each link.
    #[arg(long, default_value_t = 20)]
    pub rows: usize,

    /// Samples along each link.
    #[arg(long, default_value_t = 100)]
    pub cols: usize,

    /// Write line-of-sight clearance instead of raw raster values.
    #[arg(long)]
    pub clearance: bool,

    /// Fractional digits per value.
    #[arg(long, default_value_t = 2)]
    pub precision: usize,

    /// Output directory. Must not already exist.
    #[arg(short, long)]
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct Obstruction {
    #[command(flatten)]
    pub links: LinkArgs,

    #[command(flatten)]
    pub dispatch: DispatchArgs,

    /// Samples across each link.
    #[arg(long, default_value_t = 1)]
    pub rows: usize,

    /// Distance between samples along each link, in raster units.
    #[arg(long, default_value_t = 5.0)]
    pub dist_per_col: f64,

    /// Output CSV of `index,obstruction`.
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct Pathloss {
    #[command(flatten)]
    pub links: LinkArgs,

    #[arg(short, long, value_enum, default_value_t = Model::FreeSpace)]
    pub model: Model,

    /// Carrier frequency in MHz.
    #[arg(short, long, default_value_t = 915.0)]
    pub freq: f64,

    /// Hata base station antenna height in meters.
    #[arg(long, default_value_t = 30.0)]
    pub base_height: f64,

    /// Hata mobile antenna height in meters.
    #[arg(long, default_value_t = 1.5)]
    pub mobile_height: f64,

    #[arg(long, value_enum, default_value_t = EnvironmentArg::Urban)]
    pub environment: EnvironmentArg,

    #[arg(long, value_enum, default_value_t = CitySizeArg::Small)]
    pub city_size: CitySizeArg,

    /// Indoor floors to penetrate (0 to 3).
    #[arg(long, default_value_t = 0)]
    pub floors: u8,

    #[arg(long, value_enum, default_value_t = BuildingArg::Office)]
    pub building: BuildingArg,

    /// Output CSV of `index,distance_m,loss_db,success`.
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Model {
    FreeSpace,
    Hata,
    Indoor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EnvironmentArg {
    Urban,
    Suburban,
    Open,
}

impl From<EnvironmentArg> for propah::Environment {
    fn from(arg: EnvironmentArg) -> Self {
        match arg {
            EnvironmentArg::Urban => Self::Urban,
            EnvironmentArg::Suburban => Self::Suburban,
            EnvironmentArg::Open => Self::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CitySizeArg {
    Small,
    Medium,
    Large,
}

impl From<CitySizeArg> for propah::CitySize {
    fn from(arg: CitySizeArg) -> Self {
        match arg {
            CitySizeArg::Small => Self::Small,
            CitySizeArg::Medium => Self::Medium,
            CitySizeArg::Large => Self::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildingArg {
    Office,
    Commercial,
}

impl From<BuildingArg> for propah::Building {
    fn from(arg: BuildingArg) -> Self {
        match arg {
            BuildingArg::Office => Self::Office,
            BuildingArg::Commercial => Self::Commercial,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Model, ResamplingArg};
    use clap::{CommandFactory, Parser};
    use std::{num::NonZeroUsize, time::Duration};

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sample() {
        let cli = Cli::try_parse_from([
            "linkgrid",
            "sample",
            "--links=links.geojson",
            "--raster=dsm.tif",
            "--out-dir=out",
            "-n",
            "5",
            "--rows=2",
            "--cols=3",
            "--resampling=bilinear",
            "--task-timeout=1.5",
        ])
        .unwrap();
        let Cli::Sample(sample) = cli else {
            panic!("expected sample");
        };
        assert_eq!(sample.links.max_size.map(NonZeroUsize::get), Some(5));
        assert_eq!((sample.rows, sample.cols), (2, 3));
        assert_eq!(sample.dispatch.relative_buffer, 0.1);
        assert_eq!(sample.dispatch.resampling, ResamplingArg::Bilinear);
        assert_eq!(
            sample.dispatch.task_timeout,
            Some(Duration::from_millis(1500))
        );
        assert_eq!(sample.links.head_field, "elevation_tx");
    }

    #[test]
    fn test_parse_pathloss() {
        let cli =
            Cli::try_parse_from(["linkgrid", "pathloss", "-l", "l.geojson", "-m", "hata", "-o", "x.csv"])
                .unwrap();
        let Cli::Pathloss(pathloss) = cli else {
            panic!("expected pathloss");
        };
        assert_eq!(pathloss.model, Model::Hata);
        assert_eq!(pathloss.freq, 915.0);
    }

    #[test]
    fn test_reject_zero_max_size() {
        assert!(Cli::try_parse_from([
            "linkgrid",
            "sample",
            "-l",
            "l.geojson",
            "-r",
            "dsm.tif",
            "-o",
            "out",
            "-n",
            "0",
        ])
        .is_err());
    }

    #[test]
    fn test_parse_max_dist() {
        let cli = Cli::try_parse_from([
            "linkgrid",
            "obstruction",
            "-l",
            "l.geojson",
            "-r",
            "dsm.tif",
            "-o",
            "o.csv",
            "--max-dist=500",
        ])
        .unwrap();
        let Cli::Obstruction(obstruction) = cli else {
            panic!("expected obstruction");
        };
        assert_eq!(obstruction.dispatch.max_dist, Some(500.0));
    }

    #[test]
    fn test_reject_negative_timeout() {
        assert!(Cli::try_parse_from([
            "linkgrid",
            "obstruction",
            "-l",
            "l.geojson",
            "-r",
            "dsm.tif",
            "-o",
            "o.csv",
            "--task-timeout=-1",
        ])
        .is_err());
    }
}
