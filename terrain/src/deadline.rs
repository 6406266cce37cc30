use crate::TerrainError;
use std::time::{Duration, Instant};

/// Cooperative time limit for a single task.
///
/// Long-running work calls [`Deadline::check`] at safe points and
/// abandons the task when it returns an error.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Starts a deadline that expires `limit` from now, or never.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn check(&self) -> Result<(), TerrainError> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(TerrainError::Timeout(limit)),
            _ => Ok(()),
        }
    }
}
