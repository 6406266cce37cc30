//! Log-linear path loss models.
//!
//! Every model here reduces to `L(d) = constant + slope * log10(d)`,
//! with `d` in meters and `L` in dB.
//!
//! # References
//!
//! 1. [Free-space path loss](https://en.wikipedia.org/wiki/Free-space_path_loss)
//! 1. [Hata model](https://en.wikipedia.org/wiki/Hata_model)
//! 1. [ITU model for indoor attenuation](https://en.wikipedia.org/wiki/ITU_model_for_indoor_attenuation)

use crate::PropahError;
use log::debug;

/// A model of signal attenuation over distance.
pub trait PathLoss {
    /// Returns this model's log-linear coefficients.
    fn log_linear(&self) -> LogLinear;

    /// Returns path loss in dB at `dist_m` meters.
    fn loss_db(&self, dist_m: f64) -> f64 {
        self.log_linear().loss_db(dist_m)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLinear {
    /// Loss at 1 m (dB).
    pub constant: f64,

    /// Loss per decade of distance (dB).
    pub slope: f64,
}

impl LogLinear {
    pub fn new(constant: f64, slope: f64) -> Self {
        Self { constant, slope }
    }

    pub fn loss_db(&self, dist_m: f64) -> f64 {
        self.constant + self.slope * dist_m.log10()
    }
}

impl PathLoss for LogLinear {
    fn log_linear(&self) -> LogLinear {
        *self
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, PropahError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(PropahError::NonPositive { name, value })
    }
}

/// Free-space path loss.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreeSpace {
    freq_mhz: f64,
    model: LogLinear,
}

impl FreeSpace {
    pub fn new(freq_mhz: f64) -> Result<Self, PropahError> {
        let freq_mhz = positive("freq", freq_mhz)?;
        let model = LogLinear::new(20.0 * freq_mhz.log10() - 27.55, 20.0);
        Ok(Self { freq_mhz, model })
    }

    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }
}

impl PathLoss for FreeSpace {
    fn log_linear(&self) -> LogLinear {
        self.model
    }
}

/// Terrain class for the [`Hata`] model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Urban,
    Suburban,
    Open,
}

/// City size for the [`Hata`] model's mobile antenna correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CitySize {
    #[default]
    Small,
    Medium,
    Large,
}

/// Okumura-Hata path loss for 150 to 1500 MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hata {
    pub freq_mhz: f64,
    pub base_height_m: f64,
    pub mobile_height_m: f64,
    pub environment: Environment,
    pub city_size: CitySize,
    model: LogLinear,
}

impl Hata {
    pub fn builder() -> HataBuilder {
        HataBuilder {
            freq_mhz: 915.0,
            base_height_m: 30.0,
            mobile_height_m: 1.5,
            environment: Environment::default(),
            city_size: CitySize::default(),
        }
    }
}

impl PathLoss for Hata {
    fn log_linear(&self) -> LogLinear {
        self.model
    }
}

pub struct HataBuilder {
    freq_mhz: f64,
    base_height_m: f64,
    mobile_height_m: f64,
    environment: Environment,
    city_size: CitySize,
}

impl HataBuilder {
    /// Carrier frequency (MHz, defaults to 915).
    #[must_use]
    pub fn freq(mut self, freq_mhz: f64) -> Self {
        self.freq_mhz = freq_mhz;
        self
    }

    /// Base station antenna height (meters, defaults to 30).
    #[must_use]
    pub fn base_height(mut self, meters: f64) -> Self {
        self.base_height_m = meters;
        self
    }

    /// Mobile antenna height (meters, defaults to 1.5).
    #[must_use]
    pub fn mobile_height(mut self, meters: f64) -> Self {
        self.mobile_height_m = meters;
        self
    }

    /// Terrain class (defaults to urban).
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// City size (defaults to small; only large cities change the
    /// mobile antenna correction).
    #[must_use]
    pub fn city_size(mut self, city_size: CitySize) -> Self {
        self.city_size = city_size;
        self
    }

    pub fn build(&self) -> Result<Hata, PropahError> {
        let freq_mhz = positive("freq", self.freq_mhz)?;
        let base_height_m = positive("base_height", self.base_height_m)?;
        let mobile_height_m = positive("mobile_height", self.mobile_height_m)?;

        let log_f = freq_mhz.log10();
        let log_hb = base_height_m.log10();

        let mobile_correction = match self.city_size {
            CitySize::Large if freq_mhz <= 200.0 => {
                8.29 * (1.54 * mobile_height_m).log10().powi(2) - 1.1
            }
            CitySize::Large => 3.2 * (11.75 * mobile_height_m).log10().powi(2) - 4.97,
            CitySize::Small | CitySize::Medium => {
                (1.1 * log_f - 0.7) * mobile_height_m - (1.56 * log_f - 0.8)
            }
        };

        let urban = 69.55 + 26.16 * log_f - 13.82 * log_hb - mobile_correction;
        let environment_correction = match self.environment {
            Environment::Urban => 0.0,
            Environment::Suburban => 2.0 * (freq_mhz / 28.0).log10().powi(2) + 5.4,
            Environment::Open => 4.78 * log_f.powi(2) - 18.33 * log_f + 40.94,
        };

        let slope = 44.9 - 6.55 * log_hb;
        // Shift from kilometers to meters.
        let constant = urban - environment_correction - 3.0 * slope;
        debug!(
            "hata {:?}/{:?} at {freq_mhz} MHz: {constant:.3} + {slope:.3} log10(d)",
            self.environment, self.city_size
        );

        Ok(Hata {
            freq_mhz,
            base_height_m,
            mobile_height_m,
            environment: self.environment,
            city_size: self.city_size,
            model: LogLinear::new(constant, slope),
        })
    }
}

/// Building class for the [`Indoor`] model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Building {
    #[default]
    Office,
    Commercial,
}

/// ITU indoor path loss, calibrated around 900 MHz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Indoor {
    pub freq_mhz: f64,
    pub floors: u8,
    pub building: Building,
    model: LogLinear,
}

impl Indoor {
    pub fn new(freq_mhz: f64, floors: u8, building: Building) -> Result<Self, PropahError> {
        let freq_mhz = positive("freq", freq_mhz)?;
        let (penetration, slope) = match (building, floors) {
            (_, 4..) => return Err(PropahError::Floors(floors)),
            (Building::Commercial, _) => (0.0, 20.0),
            (Building::Office, 0) => (0.0, 33.0),
            (Building::Office, 1) => (9.0, 33.0),
            (Building::Office, 2) => (19.0, 33.0),
            (Building::Office, _) => (24.0, 33.0),
        };
        let constant = 20.0 * freq_mhz.log10() + penetration - 28.0;
        Ok(Self {
            freq_mhz,
            floors,
            building,
            model: LogLinear::new(constant, slope),
        })
    }
}

impl PathLoss for Indoor {
    fn log_linear(&self) -> LogLinear {
        self.model
    }
}
