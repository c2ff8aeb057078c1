use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LatencyError {
    #[error("Malformed latency file {}: {reason}", path.display())]
    LatencyFile { path: PathBuf, reason: String },

    #[error("No latency files found for {network}.{station} in [{start}, {end})")]
    NoLatencyFiles {
        network: String,
        station: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),

    #[error("Invalid date window: start {start} is not before end {end}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl LatencyError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::LatencyFile {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LatencyError>;
