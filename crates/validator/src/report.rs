//! Station verdict document.
//!
//! A [`Report`] gathers every metric verdict per channel, the SOH verdicts and
//! the latency figures for one station and window. The station passes when
//! every verdict passes and, if latency was assessed, the station-wide timely
//! gate passed.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use station_latency::{DateWindow, LatencySummary};
use station_metrics::{
    Metric, MetricEvaluationError, MetricTable, ThresholdConfig, Verdict, evaluate,
    evaluate_dated,
};
use std::{
    collections::BTreeMap,
    fs::{File, create_dir_all},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

pub const REPORT_FILE: &str = "report.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelReport {
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Verdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencySummary>,
}

impl ChannelReport {
    pub fn passed(&self) -> bool {
        self.metrics.values().all(|v| v.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub network: String,
    pub station: String,
    pub start: NaiveDate,
    /// Exclusive
    pub end: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub passed: bool,
    pub channels: BTreeMap<String, ChannelReport>,
    pub station_latency: Option<LatencySummary>,
    pub availability: Option<f64>,
    pub soh: BTreeMap<String, Verdict>,
}

impl Report {
    /// Human-readable failure lines, prefixed with where they came from.
    pub fn failures(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (channel, report) in &self.channels {
            for (metric, verdict) in &report.metrics {
                lines.extend(
                    verdict
                        .details
                        .iter()
                        .map(|d| format!("{channel} {metric}: {d}")),
                );
            }
        }
        for (metric, verdict) in &self.soh {
            lines.extend(verdict.details.iter().map(|d| format!("soh {metric}: {d}")));
        }
        if let Some(summary) = self.station_latency.as_ref().filter(|s| !s.timely_passed) {
            lines.push(format!(
                "station latency: {:.2}% of {} samples timely",
                summary.timely_availability, summary.total_latencies
            ));
        }
        lines
    }

    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf> {
        create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let path = output_dir.join(REPORT_FILE);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote report to {}", path.display());
        Ok(path)
    }
}

/// Accumulates verdicts and latency figures, then settles the overall result.
#[derive(Debug)]
pub struct ReportBuilder<'a> {
    thresholds: &'a ThresholdConfig,
    network: String,
    station: String,
    window: DateWindow,
    channels: BTreeMap<String, ChannelReport>,
    station_latency: Option<LatencySummary>,
    availability: Option<f64>,
    soh: BTreeMap<String, Verdict>,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(
        network: &str,
        station: &str,
        window: DateWindow,
        thresholds: &'a ThresholdConfig,
    ) -> Self {
        Self {
            thresholds,
            network: network.to_string(),
            station: station.to_string(),
            window,
            channels: BTreeMap::new(),
            station_latency: None,
            availability: None,
            soh: BTreeMap::new(),
        }
    }

    /// Evaluates every series in `table` with the configured limits. Failing
    /// days are dated from the series itself, so gaps in a series do not
    /// shift later days.
    pub fn with_metrics(mut self, table: &MetricTable) -> Result<Self, MetricEvaluationError> {
        for (channel, series) in table.channels() {
            let entry = self.channels.entry(channel.clone()).or_default();
            for (metric, series) in series {
                let verdict = evaluate_dated(
                    *metric,
                    &series.dates,
                    &series.values,
                    self.thresholds.limit(*metric),
                )?;
                debug!("{channel} {metric}: passed={}", verdict.passed);
                entry.metrics.insert(metric.name().to_string(), verdict);
            }
        }
        Ok(self)
    }

    /// Evaluates SOH-derived daily series starting at the window start.
    pub fn with_soh(
        mut self,
        series: &BTreeMap<Metric, Vec<f64>>,
    ) -> Result<Self, MetricEvaluationError> {
        for (metric, values) in series {
            let verdict = evaluate(
                *metric,
                values,
                self.window.start(),
                self.thresholds.limit(*metric),
            )?;
            self.soh.insert(metric.name().to_string(), verdict);
        }
        Ok(self)
    }

    pub fn with_latency(
        mut self,
        station: LatencySummary,
        channels: BTreeMap<String, LatencySummary>,
        availability: Option<f64>,
    ) -> Self {
        for (channel, summary) in channels {
            self.channels.entry(channel).or_default().latency = Some(summary);
        }
        self.station_latency = Some(station);
        self.availability = availability;
        self
    }

    pub fn build(self) -> Report {
        let passed = self.channels.values().all(ChannelReport::passed)
            && self.soh.values().all(|v| v.passed)
            && self.station_latency.as_ref().is_none_or(|s| s.timely_passed);

        Report {
            network: self.network,
            station: self.station,
            start: self.window.start(),
            end: self.window.end(),
            generated_at: Utc::now(),
            passed,
            channels: self.channels,
            station_latency: self.station_latency,
            availability: self.availability,
            soh: self.soh,
        }
    }
}
