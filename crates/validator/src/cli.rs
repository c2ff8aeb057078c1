use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "station-validator",
    about = "Data-quality and latency validation for seismic stations",
    version,
    author,
    after_help = r#"Configuration:
    Configuration can be provided via:
    1. Environment variables with SV__ prefix (e.g., SV__LATENCY__THRESHOLD_SECS)
    2. .env file in the current directory
    3. Config file with -c option

Examples:
    # Full validation for one week of packet-retransmission telemetry
    station-validator validate -n UU -s ABC --start 2021-01-01 --end 2021-01-08 \
        --latency-dir ./retx --metrics metrics.csv --soh soh.csv -o out/

    # Latency only, tabular telemetry
    station-validator latency -n UU -s ABC --start 2021-01-01 --end 2021-01-08 \
        --instrument tabular --latency-dir ./latency -o out/

    # Evaluate a metrics table
    station-validator evaluate -n UU -s ABC --start 2021-01-01 --end 2021-01-08 \
        --metrics metrics.csv"#
)]
pub struct Cli {
    /// Path to the configuration file (TOML format)
    ///
    /// If not provided, will attempt to load from environment variables
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Telemetry format produced by the station's acquisition hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum Instrument {
    /// Daily JSON summaries of packet retransmission intervals
    #[value(name = "retx")]
    Retx,
    /// CSV rows with an encoded data latency column
    #[value(name = "tabular")]
    Tabular,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retx => write!(f, "retx"),
            Self::Tabular => write!(f, "tabular"),
        }
    }
}

/// Station and date window under validation
#[derive(Args, Debug, Clone)]
pub struct StationArgs {
    /// Network code
    #[arg(short, long)]
    pub network: String,

    /// Station code
    #[arg(short, long)]
    pub station: String,

    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// Day after the last day of the window (YYYY-MM-DD)
    #[arg(long)]
    pub end: NaiveDate,
}

/// Where latency telemetry lives and how to read it
#[derive(Args, Debug, Clone)]
pub struct LatencyArgs {
    #[arg(long, value_enum, default_value_t = Instrument::Retx)]
    pub instrument: Instrument,

    /// Directory holding the latency files
    #[arg(long, value_name = "DIR")]
    pub latency_dir: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every check for a station and write report.json plus latency CSVs
    Validate {
        #[command(flatten)]
        station: StationArgs,

        #[command(flatten)]
        latency: LatencyArgs,

        /// Metrics table from the waveform-analysis tool
        #[arg(long, value_name = "FILE")]
        metrics: Option<PathBuf>,

        /// State-of-health readings
        #[arg(long, value_name = "FILE")]
        soh: Option<PathBuf>,

        /// Directory to write the report and CSV files
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Normalize and aggregate latency only, exporting CSV tables
    Latency {
        #[command(flatten)]
        station: StationArgs,

        #[command(flatten)]
        latency: LatencyArgs,

        /// Directory to write the CSV files
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,
    },

    /// Evaluate a metrics table and print the verdicts
    Evaluate {
        #[command(flatten)]
        station: StationArgs,

        /// Metrics table from the waveform-analysis tool
        #[arg(long, value_name = "FILE")]
        metrics: PathBuf,
    },
}
