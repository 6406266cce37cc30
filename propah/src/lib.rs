//! # Radio Frequency Path Loss
//!
//! `propah` provides empirical log-linear path loss models.

mod error;
pub mod loglinear;

pub use crate::{
    error::PropahError,
    loglinear::{Building, CitySize, Environment, FreeSpace, Hata, Indoor, LogLinear, PathLoss},
};
