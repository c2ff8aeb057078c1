use crate::error::MetricEvaluationError;
use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

/// How a metric's series is compared against its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// Per-day flag counts; anything above the limit (normally 0) fails.
    NonzeroFlag,
    /// Per-day counts or sizes that must not exceed the limit.
    CountLimit,
    /// Per-day clock unlock counts that must not exceed the limit.
    ClockLock,
    /// Per-day values that must stay at or above the limit.
    DailyMinimum,
    /// Mean over the window must not exceed the limit.
    AverageAtMost,
    /// Mean over the window must reach the limit.
    AverageAtLeast,
}

impl Family {
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::AverageAtMost | Self::AverageAtLeast)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    AmplifierSaturation,
    CalibrationSignal,
    SuspectTimeTag,
    DigitizerClipping,
    Spikes,
    TelemetrySyncError,
    NumGaps,
    NumOverlaps,
    MaxGap,
    MaxOverlap,
    NumSpikes,
    ClockLocked,
    TimingQuality,
    PctAboveNhnm,
    PctBelowNlnm,
    PercentAvailability,
}

impl Metric {
    pub const ALL: [Metric; 16] = [
        Metric::AmplifierSaturation,
        Metric::CalibrationSignal,
        Metric::SuspectTimeTag,
        Metric::DigitizerClipping,
        Metric::Spikes,
        Metric::TelemetrySyncError,
        Metric::NumGaps,
        Metric::NumOverlaps,
        Metric::MaxGap,
        Metric::MaxOverlap,
        Metric::NumSpikes,
        Metric::ClockLocked,
        Metric::TimingQuality,
        Metric::PctAboveNhnm,
        Metric::PctBelowNlnm,
        Metric::PercentAvailability,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::AmplifierSaturation => "amplifier_saturation",
            Self::CalibrationSignal => "calibration_signal",
            Self::SuspectTimeTag => "suspect_time_tag",
            Self::DigitizerClipping => "digitizer_clipping",
            Self::Spikes => "spikes",
            Self::TelemetrySyncError => "telemetry_sync_error",
            Self::NumGaps => "num_gaps",
            Self::NumOverlaps => "num_overlaps",
            Self::MaxGap => "max_gap",
            Self::MaxOverlap => "max_overlap",
            Self::NumSpikes => "num_spikes",
            Self::ClockLocked => "clock_locked",
            Self::TimingQuality => "timing_quality",
            Self::PctAboveNhnm => "pct_above_nhnm",
            Self::PctBelowNlnm => "pct_below_nlnm",
            Self::PercentAvailability => "percent_availability",
        }
    }

    /// Whether `name` is a metric this crate knows how to evaluate.
    pub fn exists(name: &str) -> bool {
        name.parse::<Metric>().is_ok()
    }

    pub fn family(&self) -> Family {
        match self {
            Self::AmplifierSaturation
            | Self::CalibrationSignal
            | Self::SuspectTimeTag
            | Self::DigitizerClipping
            | Self::Spikes
            | Self::TelemetrySyncError => Family::NonzeroFlag,
            Self::NumGaps | Self::NumOverlaps | Self::MaxGap | Self::MaxOverlap | Self::NumSpikes => {
                Family::CountLimit
            }
            Self::ClockLocked => Family::ClockLock,
            Self::TimingQuality => Family::DailyMinimum,
            Self::PctAboveNhnm | Self::PctBelowNlnm => Family::AverageAtMost,
            Self::PercentAvailability => Family::AverageAtLeast,
        }
    }

    /// Limit applied when the threshold configuration does not name the
    /// metric.
    pub fn default_limit(&self) -> f64 {
        match self {
            Self::TimingQuality => 70.0,
            Self::PctAboveNhnm | Self::PctBelowNlnm => 20.0,
            Self::PercentAvailability => 98.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = MetricEvaluationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .find(|m| m.name() == s.trim())
            .copied()
            .ok_or_else(|| MetricEvaluationError::UnknownMetric(s.to_string()))
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
