use crate::{
    cli::Instrument,
    report::{Report, ReportBuilder},
    settings::Settings,
    soh::{read_soh_csv, soh_series},
    util::{print_latency_summaries, print_timeliness, print_verdicts},
};
use anyhow::{Context, Result};
use station_latency::{
    DailyTimeliness, DateWindow, LatencySummary, NormalizedLatency,
    aggregator::packet_availability,
    csv_exporter::{export_latency, write_timeliness_csv},
    locator::{LatencyFileLocator, csv_files},
    retx, tabular,
};
use station_metrics::{MetricTable, ThresholdConfig};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

/// Station and window a run is about.
#[derive(Debug, Clone)]
pub struct StationTarget {
    pub network: String,
    pub station: String,
    pub window: DateWindow,
}

impl StationTarget {
    pub fn new(network: &str, station: &str, window: DateWindow) -> Self {
        Self {
            network: network.to_string(),
            station: station.to_string(),
            window,
        }
    }
}

/// Latency tables and the figures derived from them.
#[derive(Debug, Clone)]
pub struct LatencyRun {
    pub normalized: NormalizedLatency,
    /// Packet availability, only known for retransmission telemetry.
    pub availability: Option<f64>,
    pub station: LatencySummary,
    pub channels: BTreeMap<String, LatencySummary>,
    pub timeliness: Vec<DailyTimeliness>,
}

#[derive(Debug)]
pub struct Orchestrator {
    settings: Settings,
    thresholds: ThresholdConfig,
}

impl Orchestrator {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            thresholds: settings.threshold_config()?,
            settings: settings.clone(),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Normalize the station's latency telemetry and aggregate it.
    pub fn run_latency(
        &self,
        target: &StationTarget,
        instrument: Instrument,
        latency_dir: &Path,
    ) -> Result<LatencyRun> {
        let StationTarget {
            network,
            station,
            window,
        } = target;
        info!(
            "Normalizing {instrument} latency for {network}.{station} from {}",
            latency_dir.display()
        );

        let (normalized, availability) = match instrument {
            Instrument::Retx => {
                let locator =
                    LatencyFileLocator::new(latency_dir, &self.settings.latency.file_template);
                let files = locator.daily_files(window, network, station)?;
                let days = retx::load_days(&files)?;
                let normalized = retx::normalize(&days, network, station)?;
                (normalized, packet_availability(&days, network, station))
            }
            Instrument::Tabular => {
                let files = csv_files(latency_dir).with_context(|| {
                    format!("Failed to list latency files in {}", latency_dir.display())
                })?;
                let normalized = tabular::normalize(&files, window, network, station)?;
                (normalized, None)
            }
        };

        let aggregator = self.settings.aggregator();
        let station_summary = aggregator.station_summary(&normalized.combined);
        if station_summary.total_latencies == 0 {
            warn!("No latency samples for {network}.{station} in the window");
        }

        Ok(LatencyRun {
            availability,
            station: station_summary,
            channels: aggregator.channel_summaries(&normalized.combined),
            timeliness: aggregator.daily_timeliness(&normalized.daily),
            normalized,
        })
    }

    /// Latency-only run: export the CSV tables and log the summary.
    pub fn latency(
        &self,
        target: &StationTarget,
        instrument: Instrument,
        latency_dir: &Path,
        output_dir: &Path,
    ) -> Result<LatencyRun> {
        let run = self.run_latency(target, instrument, latency_dir)?;
        let written = export_run(&run, output_dir)?;
        info!("Exported {} files to {}", written.len(), output_dir.display());

        info!(
            "Latency summary:\n{}",
            print_latency_summaries(&run.station, &run.channels)
        );
        info!("Daily timeliness:\n{}", print_timeliness(&run.timeliness));
        if let Some(availability) = run.availability {
            info!("Packet availability: {availability:.2}%");
        }

        Ok(run)
    }

    /// Evaluate a metrics table on its own.
    pub fn evaluate(&self, target: &StationTarget, metrics: &Path) -> Result<Report> {
        let table = self.load_metrics(target, metrics)?;
        let report = ReportBuilder::new(
            &target.network,
            &target.station,
            target.window,
            &self.thresholds,
        )
        .with_metrics(&table)?
        .build();

        info!("Verdicts:\n{}", print_verdicts(&report));
        log_outcome(&report);
        Ok(report)
    }

    /// Full validation: latency, metrics and SOH checks into one report
    /// written to `output_dir`.
    pub fn validate(
        &self,
        target: &StationTarget,
        instrument: Instrument,
        latency_dir: &Path,
        metrics: Option<&Path>,
        soh: Option<&Path>,
        output_dir: &Path,
    ) -> Result<Report> {
        let run = self.run_latency(target, instrument, latency_dir)?;
        export_run(&run, output_dir)?;

        let mut builder = ReportBuilder::new(
            &target.network,
            &target.station,
            target.window,
            &self.thresholds,
        );

        match metrics {
            Some(path) => {
                let table = self.load_metrics(target, path)?;
                builder = builder.with_metrics(&table)?;
            }
            None => warn!("No metrics table given, skipping metric checks"),
        }

        match soh {
            Some(path) => {
                let readings = read_soh_csv(path)?;
                let series = soh_series(
                    &readings,
                    &self.settings.soh,
                    &target.network,
                    &target.station,
                    &target.window,
                );
                builder = builder.with_soh(&series)?;
            }
            None => warn!("No SOH readings given, skipping SOH checks"),
        }

        let report = builder
            .with_latency(run.station.clone(), run.channels.clone(), run.availability)
            .build();
        report.write_json(output_dir)?;

        info!(
            "Latency summary:\n{}",
            print_latency_summaries(&run.station, &run.channels)
        );
        info!("Verdicts:\n{}", print_verdicts(&report));
        log_outcome(&report);

        Ok(report)
    }

    fn load_metrics(&self, target: &StationTarget, path: &Path) -> Result<MetricTable> {
        MetricTable::from_path(
            path,
            &target.network,
            &target.station,
            target.window.start(),
            target.window.num_days(),
        )
        .with_context(|| format!("Failed to load metrics table {}", path.display()))
    }
}

fn export_run(run: &LatencyRun, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = export_latency(output_dir, &run.normalized)?;
    written.push(write_timeliness_csv(output_dir, &run.timeliness)?);
    Ok(written)
}

fn log_outcome(report: &Report) {
    let station = format!("{}.{}", report.network, report.station);
    if report.passed {
        info!("{station} passed all checks");
    } else {
        for line in report.failures() {
            warn!("{line}");
        }
        warn!("{station} failed validation");
    }
}
