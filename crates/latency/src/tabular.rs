//! Normalizer for instruments that export latency as CSV rows.
//!
//! Rows look like:
//!
//! ```text
//! channel,network latency,data latency,timestamp
//! AM.R1234.00.EHZ,6.6,=269/100,2021-01-01T00:00:03
//! ```
//!
//! The `data latency` column is a spreadsheet formula whose numerator is the
//! data latency in hundredths of a second. The sample latency is the network
//! latency plus that value.

use crate::{
    error::{LatencyError, Result},
    types::{LatencyObservation, LatencyTable, NormalizedLatency, Provenance, StreamId},
    window::DateWindow,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATA_LATENCY_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Deserialize)]
struct TabularRecord {
    channel: String,
    #[serde(rename = "network latency")]
    network_latency: f64,
    #[serde(rename = "data latency")]
    data_latency: String,
    timestamp: String,
}

/// One decoded CSV row.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularRow {
    pub stream: StreamId,
    pub timestamp: String,
    pub latency: f64,
}

/// Decode `"=X/Y"` into `X / 100` seconds. Anything after the numerator's
/// divisor is ignored; only the leading numerator carries the value.
pub fn parse_data_latency(expr: &str) -> Option<f64> {
    let body = expr.trim().strip_prefix('=')?;
    let (numerator, _) = body.split_once('/')?;
    let numerator: f64 = numerator.trim().parse().ok()?;
    Some(numerator / DATA_LATENCY_SCALE)
}

fn decode_record(path: &Path, line: u64, record: TabularRecord) -> Result<TabularRow> {
    let stream = StreamId::parse(&record.channel).ok_or_else(|| {
        LatencyError::malformed(
            path,
            format!("line {line}: invalid channel '{}'", record.channel),
        )
    })?;
    let data_latency = parse_data_latency(&record.data_latency).ok_or_else(|| {
        LatencyError::malformed(
            path,
            format!("line {line}: invalid data latency '{}'", record.data_latency),
        )
    })?;
    Ok(TabularRow {
        stream,
        timestamp: record.timestamp.trim().to_string(),
        latency: record.network_latency + data_latency,
    })
}

/// Read all rows of one CSV file.
pub fn read_rows(path: &Path) -> Result<Vec<TabularRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)
        .map_err(|e| LatencyError::malformed(path, e))?;

    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<TabularRecord>().enumerate() {
        // Header occupies line 1.
        let line = index as u64 + 2;
        let record = record.map_err(|e| LatencyError::malformed(path, e))?;
        rows.push(decode_record(path, line, record)?);
    }
    debug!("Read {} latency rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Bucket the requested station's rows into one partition per day of the
/// window. Days without rows get an empty partition; rows outside the window
/// are dropped.
pub fn normalize_rows(
    rows: &[TabularRow],
    window: &DateWindow,
    network: &str,
    station: &str,
) -> NormalizedLatency {
    let station_rows: Vec<&TabularRow> = rows
        .iter()
        .filter(|row| row.stream.matches(network, station))
        .collect();

    let mut normalized = NormalizedLatency::default();
    for date in window.days() {
        let day_key = date.format("%Y-%m-%d").to_string();
        let mut table = LatencyTable::new();
        for row in station_rows
            .iter()
            .filter(|row| row.timestamp.get(..10) == Some(day_key.as_str()))
        {
            let observation = LatencyObservation::new(
                &row.stream,
                &row.timestamp,
                Provenance::Direct,
                row.latency,
            );
            normalized.record(&mut table, observation);
        }
        normalized.daily.push(date, table);
    }
    normalized
}

/// Read every file and normalize the requested station.
pub fn normalize(
    files: &[PathBuf],
    window: &DateWindow,
    network: &str,
    station: &str,
) -> Result<NormalizedLatency> {
    if files.is_empty() {
        return Err(LatencyError::StreamUnavailable(format!(
            "no tabular latency files supplied for {network}.{station}"
        )));
    }

    let mut rows = Vec::new();
    for path in files {
        rows.extend(read_rows(path)?);
    }

    let normalized = normalize_rows(&rows, window, network, station);
    info!(
        "Normalized {} of {} tabular latency rows for {network}.{station}",
        normalized.combined.len(),
        rows.len()
    );
    Ok(normalized)
}
