//! Threshold evaluation for data-quality metric series.
//!
//! Day-indexed rules produce one dated line per failing day. [`evaluate`]
//! dates value `i` as `start + i` days; [`evaluate_dated`] takes the dates
//! alongside the values, for series with missing days. Aggregate rules
//! collapse the series to its mean and produce at most one undated line.

use crate::{
    error::MetricEvaluationError,
    metric::{Family, Metric},
    verdict::Verdict,
};
use chrono::{Duration, NaiveDate};
use statrs::statistics::Statistics;

/// Evaluate `values` for `metric` against `limit`.
///
/// Aggregate metrics reject an empty series.
pub fn evaluate(
    metric: Metric,
    values: &[f64],
    start: NaiveDate,
    limit: f64,
) -> Result<Verdict, MetricEvaluationError> {
    let dates: Vec<NaiveDate> = (0..values.len())
        .map(|i| start + Duration::days(i as i64))
        .collect();
    evaluate_dated(metric, &dates, values, limit)
}

/// Evaluate values observed on the given days. `dates[i]` is the day of
/// `values[i]`; both must have the same length.
pub fn evaluate_dated(
    metric: Metric,
    dates: &[NaiveDate],
    values: &[f64],
    limit: f64,
) -> Result<Verdict, MetricEvaluationError> {
    if dates.len() != values.len() {
        return Err(MetricEvaluationError::DateCountMismatch {
            metric,
            dates: dates.len(),
            values: values.len(),
        });
    }
    let details = match metric.family() {
        Family::NonzeroFlag | Family::CountLimit | Family::ClockLock => {
            daily_failures(metric, dates, values, limit, |v| v > limit)
        }
        Family::DailyMinimum => daily_failures(metric, dates, values, limit, |v| v < limit),
        Family::AverageAtMost => {
            let average = series_average(metric, values)?;
            aggregate_failure(metric, average, limit, average > limit)
        }
        Family::AverageAtLeast => {
            let average = series_average(metric, values)?;
            aggregate_failure(metric, average, limit, average < limit)
        }
    };
    Ok(Verdict::from_details(details, values))
}

/// Evaluate by metric name. Unknown names are an error; check
/// [`Metric::exists`] first when the source may carry other metrics.
pub fn evaluate_named(
    name: &str,
    values: &[f64],
    start: NaiveDate,
    limit: f64,
) -> Result<Verdict, MetricEvaluationError> {
    evaluate(name.parse()?, values, start, limit)
}

fn daily_failures(
    metric: Metric,
    dates: &[NaiveDate],
    values: &[f64],
    limit: f64,
    fails: impl Fn(f64) -> bool,
) -> Vec<String> {
    dates
        .iter()
        .zip(values)
        .filter(|(_, value)| fails(**value))
        .map(|(day, value)| daily_detail(metric, *value, *day, limit))
        .collect()
}

fn series_average(metric: Metric, values: &[f64]) -> Result<f64, MetricEvaluationError> {
    if values.is_empty() {
        return Err(MetricEvaluationError::EmptySeries(metric));
    }
    Ok(values.iter().mean())
}

fn aggregate_failure(metric: Metric, average: f64, limit: f64, failed: bool) -> Vec<String> {
    if !failed {
        return Vec::new();
    }
    let average = format_average(average);
    let limit = format_limit(limit);
    let line = match metric {
        Metric::PctAboveNhnm => format!(
            "Average of {average}% of PSDs above the high noise model exceeds threshold. [threshold: {limit}]"
        ),
        Metric::PctBelowNlnm => format!(
            "Average of {average}% of PSDs below the low noise model exceeds threshold. [threshold: {limit}]"
        ),
        Metric::PercentAvailability => {
            format!("Average availability of {average}% is below threshold. [threshold: {limit}]")
        }
        other => format!("Average {other} of {average} is out of range. [threshold: {limit}]"),
    };
    vec![line]
}

fn daily_detail(metric: Metric, value: f64, day: NaiveDate, limit: f64) -> String {
    let v = format_value(value);
    let limit = format_limit(limit);
    let what = match metric {
        Metric::AmplifierSaturation => format!("Amplifier saturated {v} times on {day}."),
        Metric::CalibrationSignal => format!("Calibration signal present {v} times on {day}."),
        Metric::SuspectTimeTag => format!("Suspect time tag flagged {v} times on {day}."),
        Metric::DigitizerClipping => format!("Digitizer clipped {v} times on {day}."),
        Metric::Spikes => format!("Spikes flagged {v} times on {day}."),
        Metric::TelemetrySyncError => format!("Telemetry sync error flagged {v} times on {day}."),
        Metric::NumGaps => format!("{v} gaps found on {day}."),
        Metric::NumOverlaps => format!("{v} overlaps found on {day}."),
        Metric::MaxGap => format!("Maximum gap of {v} seconds on {day}."),
        Metric::MaxOverlap => format!("Maximum overlap of {v} seconds on {day}."),
        Metric::NumSpikes => format!("{v} spikes found on {day}."),
        Metric::ClockLocked => format!("Clock unlocked {v} times on {day}."),
        Metric::TimingQuality => format!("Timing quality of {v} on {day} is below threshold."),
        other => format!("{other} of {v} on {day}."),
    };
    format!("{what} [threshold: {limit}]")
}

/// Whole numbers print without a fractional part, as counts usually are.
fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Limits always show a decimal point, e.g. `2.0`.
fn format_limit(limit: f64) -> String {
    format!("{limit:?}")
}

fn format_average(average: f64) -> String {
    format!("{:?}", (average * 100.0).round() / 100.0)
}
