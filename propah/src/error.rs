use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropahError {
    #[error("'{name}' must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("indoor model supports 0 to 3 floors, got {0}")]
    Floors(u8),
}
