use crate::settings::Settings;
use anyhow::{Result, bail};
use station_metrics::Metric;

/// Validate the configuration values
pub fn validate_config(settings: &Settings) -> Result<()> {
    // Validate log level
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&settings.log_level.to_lowercase().as_str()) {
        bail!(
            "Invalid log level '{}'. Valid options are: {:?}",
            settings.log_level,
            valid_log_levels
        );
    }

    // Validate latency settings
    if !settings.latency.threshold_secs.is_finite() || settings.latency.threshold_secs <= 0.0 {
        bail!(
            "Latency threshold_secs must be positive, got {}",
            settings.latency.threshold_secs
        );
    }

    if settings.latency.timely_percent < 0.0 || settings.latency.timely_percent > 100.0 {
        bail!(
            "Latency timely_percent must be between 0 and 100, got {}",
            settings.latency.timely_percent
        );
    }

    if settings.latency.file_template.is_empty() {
        bail!("Latency file_template cannot be empty");
    }

    if !settings.latency.file_template.contains("{date}") {
        bail!(
            "Latency file_template must contain {{date}}, got '{}'",
            settings.latency.file_template
        );
    }

    // Validate metric thresholds
    for (name, limit) in &settings.thresholds {
        if !Metric::exists(name) {
            bail!("Unknown metric '{name}' in thresholds");
        }
        if !limit.is_finite() || *limit < 0.0 {
            bail!("Threshold for '{name}' must be a non-negative number, got {limit}");
        }
    }

    // Validate SOH settings
    if settings.soh.clock_lock_channel.is_empty() {
        bail!("SOH clock_lock_channel cannot be empty");
    }

    Ok(())
}
