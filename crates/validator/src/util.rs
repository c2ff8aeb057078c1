use crate::report::Report;
use station_latency::{DailyTimeliness, LatencySummary};
use std::collections::BTreeMap;
use tabled::{builder::Builder as TableBuilder, settings::Style};

fn render(printable: Vec<Vec<String>>) -> String {
    TableBuilder::from(printable)
        .build()
        .with(Style::psql().remove_horizontals())
        .to_string()
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

pub fn print_latency_summaries(
    station: &LatencySummary,
    channels: &BTreeMap<String, LatencySummary>,
) -> String {
    let mut printable = vec![vec![
        "channel".to_string(),
        "avg latency(s)".to_string(),
        "timely(%)".to_string(),
        "samples".to_string(),
        "late".to_string(),
        "passed".to_string(),
    ]];

    let rows = channels
        .iter()
        .map(|(channel, summary)| (channel.as_str(), summary))
        .chain(std::iter::once(("station", station)));
    for (label, summary) in rows {
        printable.push(vec![
            label.to_string(),
            format_optional(summary.average_latency),
            format!("{:.2}", summary.timely_availability),
            summary.total_latencies.to_string(),
            summary.failed_latencies.to_string(),
            summary.timely_passed.to_string(),
        ]);
    }

    render(printable)
}

pub fn print_timeliness(rows: &[DailyTimeliness]) -> String {
    let mut printable = vec![vec![
        "channel".to_string(),
        "date".to_string(),
        "below".to_string(),
        "above".to_string(),
        "negative".to_string(),
    ]];

    for row in rows {
        printable.push(vec![
            row.channel.clone(),
            row.date.to_string(),
            row.below.to_string(),
            row.above.to_string(),
            row.negative.to_string(),
        ]);
    }

    render(printable)
}

/// One row per evaluated metric, SOH checks listed under channel `soh`.
pub fn print_verdicts(report: &Report) -> String {
    let mut printable = vec![vec![
        "channel".to_string(),
        "metric".to_string(),
        "passed".to_string(),
        "failures".to_string(),
    ]];

    for (channel, channel_report) in &report.channels {
        for (metric, verdict) in &channel_report.metrics {
            printable.push(vec![
                channel.clone(),
                metric.clone(),
                verdict.passed.to_string(),
                verdict.failures().to_string(),
            ]);
        }
    }
    for (metric, verdict) in &report.soh {
        printable.push(vec![
            "soh".to_string(),
            metric.clone(),
            verdict.passed.to_string(),
            verdict.failures().to_string(),
        ]);
    }

    render(printable)
}
