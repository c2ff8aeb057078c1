use crate::{
    retx::RetxDay,
    types::{DailyLatencyTable, LatencyObservation, LatencyTable},
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_LATENCY_THRESHOLD_SECS: f64 = 3.0;
pub const DEFAULT_TIMELY_PERCENT: f64 = 98.0;

/// Latency figures reported for one channel or for the whole station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub average_latency: Option<f64>,
    pub timely_availability: f64,
    pub timely_passed: bool,
    pub total_latencies: usize,
    pub failed_latencies: usize,
}

/// Per-channel, per-day split of samples against the latency threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTimeliness {
    pub channel: String,
    pub date: NaiveDate,
    pub below: usize,
    pub above: usize,
    pub negative: usize,
}

impl DailyTimeliness {
    pub fn total(&self) -> usize {
        self.below + self.above + self.negative
    }
}

/// Share of `latencies` strictly below `threshold`, as a percentage.
/// An empty input has no timely samples.
pub fn timely_percentage(latencies: &[f64], threshold: f64) -> f64 {
    if latencies.is_empty() {
        return 0.0;
    }
    let timely = latencies.iter().filter(|v| **v < threshold).count();
    timely as f64 / latencies.len() as f64 * 100.0
}

pub fn average_latency(latencies: &[f64]) -> Option<f64> {
    if latencies.is_empty() {
        return None;
    }
    Some(latencies.iter().mean())
}

/// Round toward negative infinity at two decimals. The result never exceeds
/// the input.
///
/// Floors the shortest decimal form of `value`, so `99.99` stays `99.99`
/// instead of losing a hundredth to its binary expansion.
pub fn floor_two_decimals(value: f64) -> f64 {
    value
        .to_string()
        .parse::<Decimal>()
        .ok()
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::ToNegativeInfinity))
        .and_then(|d| d.to_f64())
        .unwrap_or_else(|| (value * 100.0).floor() / 100.0)
        .min(value)
}

/// Mean `percentAvailability` over the requested station.
///
/// Averaged per stream within a file, then across streams, then across files,
/// and floored to two decimals. Days without a file or without matching
/// streams do not contribute. Returns `None` when nothing contributed.
pub fn packet_availability(days: &[RetxDay], network: &str, station: &str) -> Option<f64> {
    let mut file_means = Vec::new();

    for day in days {
        let Some(document) = &day.document else {
            continue;
        };

        let stream_means: Vec<f64> = document
            .streams_for(network, station)
            .filter_map(|(_, entry)| {
                let values: Vec<f64> = entry
                    .intervals
                    .iter()
                    .filter_map(|i| i.percent_availability)
                    .collect();
                average_latency(&values)
            })
            .collect();

        if let Some(mean) = average_latency(&stream_means) {
            debug!("Availability on {}: {mean:.4}%", day.date);
            file_means.push(mean);
        }
    }

    average_latency(&file_means).map(floor_two_decimals)
}

/// Computes latency statistics against a fixed threshold and timely gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencyAggregator {
    pub threshold_secs: f64,
    pub timely_percent: f64,
}

impl Default for LatencyAggregator {
    fn default() -> Self {
        Self {
            threshold_secs: DEFAULT_LATENCY_THRESHOLD_SECS,
            timely_percent: DEFAULT_TIMELY_PERCENT,
        }
    }
}

impl LatencyAggregator {
    pub fn new(threshold_secs: f64, timely_percent: f64) -> Self {
        Self {
            threshold_secs,
            timely_percent,
        }
    }

    pub fn summarize(&self, latencies: &[f64]) -> LatencySummary {
        let timely_availability = timely_percentage(latencies, self.threshold_secs);
        let failed_latencies = latencies
            .iter()
            .filter(|v| **v >= self.threshold_secs)
            .count();
        LatencySummary {
            average_latency: average_latency(latencies),
            timely_availability,
            timely_passed: !latencies.is_empty() && timely_availability >= self.timely_percent,
            total_latencies: latencies.len(),
            failed_latencies,
        }
    }

    pub fn station_summary(&self, table: &LatencyTable) -> LatencySummary {
        self.summarize(&table.latencies())
    }

    pub fn channel_summaries(&self, table: &LatencyTable) -> BTreeMap<String, LatencySummary> {
        table
            .by_channel()
            .into_iter()
            .map(|(channel, observations)| {
                let latencies: Vec<f64> = observations.iter().map(|o| o.data_latency).collect();
                (channel, self.summarize(&latencies))
            })
            .collect()
    }

    /// Below/above/negative counts for every channel on every day that has
    /// samples for it.
    pub fn daily_timeliness(&self, daily: &DailyLatencyTable) -> Vec<DailyTimeliness> {
        let mut rows = Vec::new();
        for partition in daily.iter() {
            for (channel, observations) in partition.table.by_channel() {
                rows.push(self.classify(channel, partition.date, &observations));
            }
        }
        rows
    }

    fn classify(
        &self,
        channel: String,
        date: NaiveDate,
        observations: &[&LatencyObservation],
    ) -> DailyTimeliness {
        let mut row = DailyTimeliness {
            channel,
            date,
            below: 0,
            above: 0,
            negative: 0,
        };
        for observation in observations {
            let value = observation.data_latency;
            if value < 0.0 {
                row.negative += 1;
            } else if value < self.threshold_secs {
                row.below += 1;
            } else {
                row.above += 1;
            }
        }
        row
    }
}
