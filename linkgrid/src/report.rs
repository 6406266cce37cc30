use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

/// A link that produced no output, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    /// Positional index of the link.
    pub index: usize,
    pub reason: String,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub attempted: usize,
    pub succeeded: usize,
    /// Sorted by index.
    pub failures: Vec<Failure>,
}

impl Report {
    pub fn new(attempted: usize, succeeded: usize, mut failures: Vec<Failure>) -> Self {
        failures.sort_by_key(|f| f.index);
        Self {
            attempted,
            succeeded,
            failures,
        }
    }

    /// Logs a summary and writes the JSON report, if requested.
    pub fn finish(&self, json_path: Option<&Path>) -> Result<()> {
        info!(
            "attempted {}, succeeded {}, failed {}",
            self.attempted,
            self.succeeded,
            self.failures.len()
        );
        for Failure { index, reason } in &self.failures {
            warn!("link {index}: {reason}");
        }
        if let Some(path) = json_path {
            let tmp_path = path.with_extension("tmp");
            let mut wtr = BufWriter::new(File::create(&tmp_path)?);
            serde_json::to_writer_pretty(&mut wtr, self)?;
            wtr.flush()?;
            drop(wtr);
            fs::rename(tmp_path, path)?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted: {}, succeeded: {}, failed: {}",
            self.attempted,
            self.succeeded,
            self.failures.len()
        )?;
        for Failure { index, reason } in &self.failures {
            write!(f, "\n  {index}: {reason}")?;
        }
        Ok(())
    }
}
