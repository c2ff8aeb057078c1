//! State-of-health readings reduced to daily event counts.
//!
//! SOH exports are CSV rows of `channel,timestamp,value`, where `channel` is
//! a full `NET.STA.LOC.CHA` identifier. Each check picks one SOH channel and
//! counts, per day, the readings that indicate a problem.

use crate::settings::SohSettings;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use station_latency::{DateWindow, StreamId};
use station_metrics::Metric;
use std::{collections::BTreeMap, path::Path};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SohReading {
    pub channel: String,
    pub timestamp: String,
    pub value: f64,
}

pub fn read_soh_csv(path: &Path) -> Result<Vec<SohReading>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open SOH file {}", path.display()))?;
    let readings = reader
        .deserialize()
        .collect::<Result<Vec<SohReading>, _>>()
        .with_context(|| format!("Malformed SOH file {}", path.display()))?;
    info!("Read {} SOH readings from {}", readings.len(), path.display());
    Ok(readings)
}

/// Per-day count of readings on `channel` whose value is not `locked_value`.
///
/// Returns `None` when the station has no readings on that channel inside
/// the window, so the caller can skip the check.
pub fn daily_unlock_counts(
    readings: &[SohReading],
    network: &str,
    station: &str,
    channel: &str,
    locked_value: f64,
    window: &DateWindow,
) -> Option<Vec<f64>> {
    let mut counts = vec![0.0; window.num_days()];
    let mut seen = false;

    for reading in readings {
        let Some(stream) = StreamId::parse(&reading.channel) else {
            continue;
        };
        if !stream.matches(network, station) || stream.channel != channel {
            continue;
        }
        let Some(day) = reading
            .timestamp
            .get(..10)
            .and_then(|d| d.parse::<NaiveDate>().ok())
        else {
            continue;
        };
        if !window.contains(day) {
            continue;
        }

        seen = true;
        if reading.value != locked_value {
            let index = (day - window.start()).num_days() as usize;
            counts[index] += 1.0;
        }
    }

    seen.then_some(counts)
}

/// Daily series for every SOH-derived metric that has data. Missing channels
/// are logged and skipped.
pub fn soh_series(
    readings: &[SohReading],
    settings: &SohSettings,
    network: &str,
    station: &str,
    window: &DateWindow,
) -> BTreeMap<Metric, Vec<f64>> {
    let mut series = BTreeMap::new();

    match daily_unlock_counts(
        readings,
        network,
        station,
        &settings.clock_lock_channel,
        settings.locked_value,
        window,
    ) {
        Some(counts) => {
            series.insert(Metric::ClockLocked, counts);
        }
        None => warn!(
            "SOH channel {} missing for {network}.{station}, skipping {}",
            settings.clock_lock_channel,
            Metric::ClockLocked
        ),
    }

    series
}
