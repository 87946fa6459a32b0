//! Tab-separated timeseries output
//!
//! One line per tick:
//! `timestamp  percentage  grid_up  grid  solar  powerwall  home`.
//! Unknown values are written as empty fields so every line has seven columns.

use crate::error::{GridlogError, Result};
use crate::sampler::Sample;
use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Local timestamp layout of the first column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn field<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render one timeseries line, newline included
pub fn format_record(sample: &Sample) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
        sample.timestamp.format(TIMESTAMP_FORMAT),
        field(sample.percentage.map(|p| format!("{:.1}", p))),
        sample.grid_up,
        field(sample.grid_watts),
        field(sample.solar_watts),
        field(sample.powerwall_watts),
        field(sample.home_watts),
    )
}

/// Append-only destination for timeseries lines
pub struct TimeseriesSink {
    writer: Box<dyn Write + Send>,
    destination: String,
}

impl TimeseriesSink {
    /// Write to standard output
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(std::io::stdout()), "stdout")
    }

    /// Open (or create) `path` in append mode
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                GridlogError::io(format!("Failed to open {}: {}", path.display(), e))
            })?;
        Ok(Self::from_writer(
            Box::new(file),
            &path.display().to_string(),
        ))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>, destination: &str) -> Self {
        Self {
            writer,
            destination: destination.to_string(),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Write one line and flush it immediately
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        let line = format_record(sample);
        self.writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush())
            .map_err(|e| {
                GridlogError::io(format!(
                    "Failed to append to {}: {}",
                    self.destination, e
                ))
            })
    }
}
