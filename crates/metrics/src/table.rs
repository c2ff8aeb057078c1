//! Loader for externally computed metric tables.
//!
//! The waveform-analysis tool writes one row per metric, target and day:
//!
//! ```text
//! target,metricName,value,start,end
//! UU.ABC.00.HHZ.M,num_gaps,0,2021-01-01T00:00:00.000000Z,2021-01-02T00:00:00.000000Z
//! ```
//!
//! Rows are grouped into day-ordered series for the requested station and
//! window, one per channel label (`LOC.CHA`, or `CHA` for an empty location)
//! and metric. Targets that differ only in quality code share a series; the
//! first value seen for a day wins.

use crate::{error::MetricTableError, metric::Metric};
use chrono::{Duration, NaiveDate};
use itertools::Itertools;
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::Read,
    path::Path,
};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct MetricRecord {
    target: String,
    #[serde(rename = "metricName")]
    metric_name: String,
    value: String,
    start: String,
}

/// Channel label used to key series, `LOC.CHA` or `CHA` when the location
/// code is empty.
pub fn channel_label(location: &str, channel: &str) -> String {
    if location.is_empty() {
        channel.to_string()
    } else {
        format!("{location}.{channel}")
    }
}

/// Day-ordered values of one metric on one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: Metric,
    pub channel: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
    /// False when the series does not have exactly one value per day of the
    /// window. Such series are still evaluated but should not be plotted.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricTable {
    start: NaiveDate,
    num_days: usize,
    channels: BTreeMap<String, BTreeMap<Metric, MetricSeries>>,
}

impl MetricTable {
    pub fn from_path(
        path: &Path,
        network: &str,
        station: &str,
        start: NaiveDate,
        num_days: usize,
    ) -> Result<Self, MetricTableError> {
        let file = File::open(path)?;
        let table = Self::from_reader(file, network, station, start, num_days)?;
        info!(
            "Loaded {} metric series for {network}.{station} from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        network: &str,
        station: &str,
        start: NaiveDate,
        num_days: usize,
    ) -> Result<Self, MetricTableError> {
        let end = start + Duration::days(num_days as i64);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points: BTreeMap<(String, Metric), BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        let mut unknown: BTreeSet<String> = BTreeSet::new();

        for (index, record) in reader.deserialize::<MetricRecord>().enumerate() {
            let line = index as u64 + 2;
            let record = record?;

            let Ok(metric) = record.metric_name.parse::<Metric>() else {
                unknown.insert(record.metric_name);
                continue;
            };

            let parts: Vec<&str> = record.target.split('.').collect();
            let [net, sta, loc, cha, ..] = parts.as_slice() else {
                debug!("Line {line}: skipping target '{}'", record.target);
                continue;
            };
            if *net != network || *sta != station {
                continue;
            }

            let date = record
                .start
                .get(..10)
                .and_then(|d| d.parse::<NaiveDate>().ok())
                .ok_or_else(|| MetricTableError::InvalidDate {
                    line,
                    value: record.start.clone(),
                })?;
            if date < start || date >= end {
                continue;
            }

            let value: f64 = record
                .value
                .parse()
                .map_err(|_| MetricTableError::InvalidValue {
                    line,
                    metric: record.metric_name.clone(),
                    value: record.value.clone(),
                })?;

            let label = channel_label(loc, cha);
            let days = points.entry((label, metric)).or_default();
            if days.contains_key(&date) {
                warn!(
                    "Line {line}: {} {metric} already has a value for {date}, keeping the first",
                    record.target
                );
                continue;
            }
            days.insert(date, value);
        }

        if !unknown.is_empty() {
            debug!(
                "Skipped metrics without an evaluation rule: {}",
                unknown.iter().join(", ")
            );
        }

        let mut channels: BTreeMap<String, BTreeMap<Metric, MetricSeries>> = BTreeMap::new();
        for ((channel, metric), points) in points {
            let (dates, values): (Vec<NaiveDate>, Vec<f64>) = points.into_iter().unzip();
            let complete = values.len() == num_days;
            if !complete {
                warn!(
                    "{channel} {metric}: {} values for a {num_days}-day window, series will not be plotted",
                    values.len()
                );
            }
            channels.entry(channel.clone()).or_default().insert(
                metric,
                MetricSeries {
                    metric,
                    channel,
                    dates,
                    values,
                    complete,
                },
            );
        }

        Ok(Self {
            start,
            num_days,
            channels,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn num_days(&self) -> usize {
        self.num_days
    }

    /// Number of series across all channels.
    pub fn len(&self) -> usize {
        self.channels.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn channels(&self) -> impl Iterator<Item = (&String, &BTreeMap<Metric, MetricSeries>)> {
        self.channels.iter()
    }

    pub fn series(&self, channel: &str, metric: Metric) -> Option<&MetricSeries> {
        self.channels.get(channel)?.get(&metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
target,metricName,value,start,end
UU.ABC.00.HHZ.M,num_gaps,2,2021-01-02T00:00:00.000000Z,2021-01-03T00:00:00.000000Z
UU.ABC.00.HHZ.M,num_gaps,0,2021-01-01T00:00:00.000000Z,2021-01-02T00:00:00.000000Z
UU.ABC.00.HHZ.M,sample_rms,13.2,2021-01-01T00:00:00.000000Z,2021-01-02T00:00:00.000000Z
UU.ABC.00.HHN.M,pct_above_nhnm,4.5,2021-01-01T00:00:00.000000Z,2021-01-02T00:00:00.000000Z
UU.XYZ.00.HHZ.M,num_gaps,9,2021-01-01T00:00:00.000000Z,2021-01-02T00:00:00.000000Z
UU.ABC.00.HHZ.M,num_gaps,5,2021-01-09T00:00:00.000000Z,2021-01-10T00:00:00.000000Z
";

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 1, day).unwrap()
    }

    #[test]
    fn test_groups_and_orders_by_day() {
        let table = MetricTable::from_reader(CSV.as_bytes(), "UU", "ABC", jan(1), 2).unwrap();

        assert_eq!(table.len(), 2);
        let gaps = table.series("00.HHZ", Metric::NumGaps).unwrap();
        assert_eq!(gaps.values, vec![0.0, 2.0]);
        assert_eq!(gaps.dates, vec![jan(1), jan(2)]);
        assert!(gaps.complete);

        let noise = table.series("00.HHN", Metric::PctAboveNhnm).unwrap();
        assert_eq!(noise.values, vec![4.5]);
        assert!(!noise.complete);

        assert!(table.series("00.HHZ", Metric::PctAboveNhnm).is_none());
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        let csv = "target,metricName,value,start,end\n\
                   UU.ABC.00.HHZ.M,num_gaps,lots,2021-01-01,2021-01-02\n";
        let err = MetricTable::from_reader(csv.as_bytes(), "UU", "ABC", jan(1), 1).unwrap_err();
        assert!(matches!(err, MetricTableError::InvalidValue { line: 2, .. }));
    }

    #[test]
    fn test_invalid_date_is_an_error() {
        let csv = "target,metricName,value,start,end\n\
                   UU.ABC.00.HHZ.M,num_gaps,1,yesterday,2021-01-02\n";
        let err = MetricTable::from_reader(csv.as_bytes(), "UU", "ABC", jan(1), 1).unwrap_err();
        assert!(matches!(err, MetricTableError::InvalidDate { .. }));
    }

    #[test]
    fn test_locations_and_quality_codes() {
        let csv = "\
target,metricName,value,start,end
UU.ABC.00.HHZ.M,num_gaps,0,2021-01-01T00:00:00Z,2021-01-02T00:00:00Z
UU.ABC.00.HHZ.M,num_gaps,0,2021-01-02T00:00:00Z,2021-01-03T00:00:00Z
UU.ABC.10.HHZ.M,num_gaps,5,2021-01-01T00:00:00Z,2021-01-02T00:00:00Z
UU.ABC.10.HHZ.M,num_gaps,0,2021-01-02T00:00:00Z,2021-01-03T00:00:00Z
UU.ABC.10.HHZ.D,num_gaps,8,2021-01-01T00:00:00Z,2021-01-02T00:00:00Z
UU.ABC..BHZ.M,num_gaps,1,2021-01-01T00:00:00Z,2021-01-02T00:00:00Z
";
        let table = MetricTable::from_reader(csv.as_bytes(), "UU", "ABC", jan(1), 2).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.series("00.HHZ", Metric::NumGaps).unwrap().values,
            vec![0.0, 0.0]
        );
        let second = table.series("10.HHZ", Metric::NumGaps).unwrap();
        assert_eq!(second.values, vec![5.0, 0.0]);
        assert!(second.complete);
        assert_eq!(table.series("BHZ", Metric::NumGaps).unwrap().values, vec![1.0]);
        assert!(table.series("HHZ", Metric::NumGaps).is_none());
    }
}
