pub mod validation;

use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use station_latency::{
    LatencyAggregator,
    aggregator::{DEFAULT_LATENCY_THRESHOLD_SECS, DEFAULT_TIMELY_PERCENT},
    locator::DEFAULT_FILE_TEMPLATE,
};
use station_metrics::ThresholdConfig;
use std::{collections::BTreeMap, fmt, path::Path};
use validation::validate_config;

/// Main settings configuration for station validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level for application logging (e.g., "info", "debug", "warn", "error")
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Latency timeliness configuration
    #[serde(default)]
    pub latency: LatencySettings,
    /// Per-metric limits keyed by metric name; unnamed metrics use their defaults
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    /// State-of-health channel configuration
    #[serde(default)]
    pub soh: SohSettings,
}

/// Latency thresholds and input layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencySettings {
    /// Samples strictly below this many seconds are timely
    #[serde(default = "default_threshold_secs")]
    pub threshold_secs: f64,
    /// Minimum station-wide timely percentage (0-100)
    #[serde(default = "default_timely_percent")]
    pub timely_percent: f64,
    /// File name template for packet-retransmission day files.
    /// Supports {network}, {station} and {date} (YYYY-MM-DD)
    #[serde(default = "default_file_template")]
    pub file_template: String,
}

/// State-of-health channels used for clock checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SohSettings {
    /// Channel reporting clock lock status
    #[serde(default = "default_clock_lock_channel")]
    pub clock_lock_channel: String,
    /// Reading that means the clock is locked; anything else counts as an unlock
    #[serde(default = "default_locked_value")]
    pub locked_value: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            latency: LatencySettings::default(),
            thresholds: BTreeMap::new(),
            soh: SohSettings::default(),
        }
    }
}

impl Default for LatencySettings {
    fn default() -> Self {
        Self {
            threshold_secs: default_threshold_secs(),
            timely_percent: default_timely_percent(),
            file_template: default_file_template(),
        }
    }
}

impl Default for SohSettings {
    fn default() -> Self {
        Self {
            clock_lock_channel: default_clock_lock_channel(),
            locked_value: default_locked_value(),
        }
    }
}

impl Settings {
    /// Load configuration from a specific config file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        // Env vars take priority over the file
        let settings: Settings = ConfigBuilder::builder()
            .add_source(File::with_name(&path.as_ref().to_string_lossy()))
            .add_source(
                Environment::with_prefix("SV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        validate_config(&settings)?;

        Ok(settings)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        // NOTE: It's ok if this fails (file might not exist)
        let _ = dotenvy::dotenv();

        let settings: Settings = ConfigBuilder::builder()
            .add_source(
                Environment::with_prefix("SV")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        validate_config(&settings)?;

        Ok(settings)
    }

    pub fn threshold_config(&self) -> Result<ThresholdConfig> {
        ThresholdConfig::from_named(&self.thresholds).context("Invalid metric thresholds")
    }

    pub fn aggregator(&self) -> LatencyAggregator {
        LatencyAggregator::new(self.latency.threshold_secs, self.latency.timely_percent)
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Settings {{\n\
             \tLog Level: {}\n\
             \tLatency Threshold (s): {}\n\
             \tTimely Percent: {}\n\
             \tFile Template: {}\n\
             \tThreshold Overrides: {:?}\n\
             \tClock Lock Channel: {}\n\
             }}",
            self.log_level,
            self.latency.threshold_secs,
            self.latency.timely_percent,
            self.latency.file_template,
            self.thresholds,
            self.soh.clock_lock_channel,
        )
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_threshold_secs() -> f64 {
    DEFAULT_LATENCY_THRESHOLD_SECS
}

fn default_timely_percent() -> f64 {
    DEFAULT_TIMELY_PERCENT
}

fn default_file_template() -> String {
    DEFAULT_FILE_TEMPLATE.to_string()
}

fn default_clock_lock_channel() -> String {
    "GPL".to_string()
}

fn default_locked_value() -> f64 {
    1.0
}
