//! Normalizer for packet-retransmission latency files.
//!
//! Each daily JSON file lists every stream seen that day. A stream carries a
//! sequence of intervals, and an interval only reports how many packets it
//! saw plus the maximum, minimum and average latency among them. Individual
//! packet latencies are rebuilt from that summary:
//!
//! | packets | emitted samples                                     |
//! |---------|-----------------------------------------------------|
//! | 0       | none                                                |
//! | 1       | max                                                 |
//! | 2       | max, min                                            |
//! | 3       | max, min, `3 * average - min - max`                 |
//! | n > 3   | max, min, and `n - 2` copies of the average         |
//!
//! Every value is gated on its own presence: the source marks missing values
//! with `-1`, which becomes `None` at deserialization.
//!
//! An interval claiming more than [`MAX_INTERVAL_PACKETS`] packets makes the
//! whole file malformed rather than expanding into millions of samples.

use crate::{
    error::{LatencyError, Result},
    locator::DayFile,
    types::{LatencyObservation, LatencyTable, NormalizedLatency, Provenance, StreamId},
};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::{fs, path::PathBuf};
use tracing::{debug, info, warn};

/// Value the instrument writes when a latency statistic was not observed.
pub const LATENCY_SENTINEL: f64 = -1.0;

/// Largest per-interval packet count accepted. Anything above it is treated
/// as a corrupt file rather than expanded.
pub const MAX_INTERVAL_PACKETS: u64 = 100_000;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RetxDocument {
    #[serde(default)]
    pub availability: Vec<StreamAvailability>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamAvailability {
    pub id: String,
    #[serde(default)]
    pub intervals: Vec<LatencyInterval>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyInterval {
    pub start_time: String,
    #[serde(default)]
    pub percent_availability: Option<f64>,
    #[serde(default)]
    pub retx: Retransmissions,
    #[serde(default)]
    pub latency: LatencyStats,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Retransmissions {
    #[serde(default)]
    pub all_packets: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LatencyStats {
    #[serde(default, deserialize_with = "deserialize_latency")]
    pub minimum: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_latency")]
    pub maximum: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_latency")]
    pub average: Option<f64>,
}

fn deserialize_latency<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.filter(|v| *v != LATENCY_SENTINEL))
}

/// One day of the window together with its parsed document, if the day had
/// a file.
#[derive(Debug, Clone, PartialEq)]
pub struct RetxDay {
    pub date: NaiveDate,
    pub path: Option<PathBuf>,
    pub document: Option<RetxDocument>,
}

impl RetxDocument {
    /// Parse raw file bytes. Invalid UTF-8 is reported like any other
    /// malformed content.
    pub fn from_json(path: impl Into<PathBuf>, raw: impl AsRef<[u8]>) -> Result<Self> {
        serde_json::from_slice(raw.as_ref()).map_err(|e| LatencyError::malformed(path, e))
    }

    /// Streams belonging to the requested station, with their parsed ids.
    pub fn streams_for<'a>(
        &'a self,
        network: &'a str,
        station: &'a str,
    ) -> impl Iterator<Item = (StreamId, &'a StreamAvailability)> + 'a {
        self.availability.iter().filter_map(move |entry| {
            let stream = StreamId::parse(&entry.id)?;
            stream.matches(network, station).then_some((stream, entry))
        })
    }
}

/// Parse every available day file. Any malformed file aborts the whole load.
pub fn load_days(files: &[DayFile]) -> Result<Vec<RetxDay>> {
    let mut days = Vec::with_capacity(files.len());
    for file in files {
        let document = match &file.path {
            Some(path) => {
                let raw = fs::read(path)?;
                let document = RetxDocument::from_json(path, &raw)?;
                debug!(
                    "Parsed {} ({} streams)",
                    path.display(),
                    document.availability.len()
                );
                Some(document)
            }
            None => None,
        };
        days.push(RetxDay {
            date: file.date,
            path: file.path.clone(),
            document,
        });
    }
    Ok(days)
}

/// Rebuild individual packet latencies from one interval summary.
pub fn expand_interval(stream: &StreamId, interval: &LatencyInterval) -> Vec<LatencyObservation> {
    let packets = interval.retx.all_packets;
    let stats = &interval.latency;
    let at = |provenance, value| {
        LatencyObservation::new(stream, &interval.start_time, provenance, value)
    };

    let mut samples = Vec::new();
    if packets == 0 {
        return samples;
    }

    if let Some(max) = stats.maximum {
        samples.push(at(Provenance::Max, max));
    }
    if packets == 1 {
        return samples;
    }

    if let Some(min) = stats.minimum {
        samples.push(at(Provenance::Min, min));
    }

    match packets {
        2 => {}
        3 => {
            // The three packets sum to 3 * average, so the middle one is what
            // remains after removing the extremes. Only the average gates it;
            // an unobserved extreme enters as the raw instrument value.
            if let Some(avg) = stats.average {
                let min = stats.minimum.unwrap_or(LATENCY_SENTINEL);
                let max = stats.maximum.unwrap_or(LATENCY_SENTINEL);
                samples.push(at(Provenance::Average(1), 3.0 * avg - min - max));
            }
        }
        n => {
            if let Some(avg) = stats.average {
                for ordinal in 1..=(n - 2) {
                    samples.push(at(Provenance::Average(ordinal), avg));
                }
            }
        }
    }

    samples
}

fn check_packet_count(day: &RetxDay, stream: &StreamId, interval: &LatencyInterval) -> Result<()> {
    let packets = interval.retx.all_packets;
    if packets > MAX_INTERVAL_PACKETS {
        return Err(LatencyError::malformed(
            day.path.clone().unwrap_or_default(),
            format!(
                "{stream} interval {}: implausible packet count {packets}",
                interval.start_time
            ),
        ));
    }
    Ok(())
}

/// Flatten the requested station's intervals into latency tables.
pub fn normalize(days: &[RetxDay], network: &str, station: &str) -> Result<NormalizedLatency> {
    if days.is_empty() {
        return Err(LatencyError::StreamUnavailable(format!(
            "no packet latency days supplied for {network}.{station}"
        )));
    }

    let mut normalized = NormalizedLatency::default();

    for day in days {
        let mut table = LatencyTable::new();
        match &day.document {
            Some(document) => {
                let mut matched = 0usize;
                for (stream, entry) in document.streams_for(network, station) {
                    matched += 1;
                    for interval in &entry.intervals {
                        check_packet_count(day, &stream, interval)?;
                        for observation in expand_interval(&stream, interval) {
                            normalized.record(&mut table, observation);
                        }
                    }
                }
                if matched == 0 {
                    warn!("No streams for {network}.{station} on {}", day.date);
                }
            }
            None => debug!("Skipping {}: no latency file", day.date),
        }
        normalized.daily.push(day.date, table);
    }

    info!(
        "Normalized {} latency samples ({} plottable) for {network}.{station} over {} days",
        normalized.combined.len(),
        normalized.max_only.len(),
        normalized.daily.len()
    );

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stream() -> StreamId {
        StreamId::parse("UU.ABC.HHZ").unwrap()
    }

    fn interval(packets: u64, max: f64, min: f64, avg: f64) -> LatencyInterval {
        serde_json::from_value(json!({
            "startTime": "2021-01-01T00:00:00.000Z",
            "percentAvailability": 100.0,
            "retx": { "allPackets": packets },
            "latency": { "maximum": max, "minimum": min, "average": avg }
        }))
        .unwrap()
    }

    fn provenances(samples: &[LatencyObservation]) -> Vec<String> {
        samples.iter().map(|s| s.provenance.to_string()).collect()
    }

    #[test]
    fn test_sentinel_becomes_none() {
        let parsed = interval(1, 3.5, -1.0, -1.0);
        assert_eq!(parsed.latency.maximum, Some(3.5));
        assert_eq!(parsed.latency.minimum, None);
        assert_eq!(parsed.latency.average, None);
    }

    #[test]
    fn test_zero_packets_emit_nothing() {
        assert!(expand_interval(&stream(), &interval(0, 3.0, 1.0, 2.0)).is_empty());
    }

    #[test]
    fn test_single_packet_emits_max_only() {
        let samples = expand_interval(&stream(), &interval(1, 3.5, 1.0, 2.0));
        assert_eq!(provenances(&samples), vec!["max"]);
        assert_eq!(samples[0].data_latency, 3.5);

        let missing = expand_interval(&stream(), &interval(1, -1.0, 1.0, 2.0));
        assert!(missing.is_empty());
    }

    #[test]
    fn test_two_packets_gate_independently() {
        let samples = expand_interval(&stream(), &interval(2, 3.0, 1.0, 2.0));
        assert_eq!(provenances(&samples), vec!["max", "min"]);

        let no_max = expand_interval(&stream(), &interval(2, -1.0, 1.0, 2.0));
        assert_eq!(provenances(&no_max), vec!["min"]);
    }

    #[test]
    fn test_three_packets_reconstruct_middle() {
        let samples = expand_interval(&stream(), &interval(3, 4.0, 1.0, 2.5));
        assert_eq!(provenances(&samples), vec!["max", "min", "average_1"]);
        assert_eq!(samples[2].data_latency, 3.0 * 2.5 - 1.0 - 4.0);
    }

    #[test]
    fn test_three_packets_gated_on_average_only() {
        let samples = expand_interval(&stream(), &interval(3, -1.0, 1.0, 2.0));
        assert_eq!(provenances(&samples), vec!["min", "average_1"]);
        assert_eq!(samples[1].data_latency, 3.0 * 2.0 - 1.0 + 1.0);
    }

    #[test]
    fn test_three_packets_without_average() {
        let samples = expand_interval(&stream(), &interval(3, 4.0, 1.0, -1.0));
        assert_eq!(provenances(&samples), vec!["max", "min"]);
    }

    #[test]
    fn test_many_packets_repeat_raw_average() {
        let samples = expand_interval(&stream(), &interval(6, 4.0, 1.0, 2.2));
        assert_eq!(samples.len(), 6);
        let averages: Vec<_> = samples
            .iter()
            .filter(|s| s.provenance.tag() == "average")
            .collect();
        assert_eq!(averages.len(), 4);
        assert!(averages.iter().all(|s| s.data_latency == 2.2));
        assert_eq!(
            provenances(&samples),
            vec![
                "max",
                "min",
                "average_1",
                "average_2",
                "average_3",
                "average_4"
            ]
        );
    }

    #[test]
    fn test_many_packets_missing_extremes() {
        let samples = expand_interval(&stream(), &interval(5, -1.0, -1.0, 2.0));
        assert_eq!(samples.len(), 3);
        assert!(samples.iter().all(|s| s.provenance.tag() == "average"));
    }

    #[test]
    fn test_document_filters_station() {
        let raw = json!({
            "availability": [
                { "id": "UU.ABC.HHZ", "intervals": [] },
                { "id": "UU.XYZ.HHZ", "intervals": [] },
                { "id": "bogus", "intervals": [] },
                { "id": "UU.ABC.00.HHN", "intervals": [] }
            ]
        })
        .to_string();
        let document = RetxDocument::from_json("day.json", &raw).unwrap();
        let ids: Vec<String> = document
            .streams_for("UU", "ABC")
            .map(|(s, _)| s.to_string())
            .collect();
        assert_eq!(ids, vec!["UU.ABC.HHZ", "UU.ABC.00.HHN"]);
    }

    #[test]
    fn test_malformed_document_names_file() {
        let err = RetxDocument::from_json("broken.json", "{ not json").unwrap_err();
        match err {
            LatencyError::LatencyFile { path, .. } => {
                assert_eq!(path, PathBuf::from("broken.json"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_requires_days() {
        let result = normalize(&[], "UU", "ABC");
        assert!(matches!(result, Err(LatencyError::StreamUnavailable(_))));
    }

    #[test]
    fn test_invalid_utf8_names_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("2021-01-01.json");
        fs::write(&path, [0xff, 0xfe, 0x7b, 0x7d]).unwrap();

        let files = vec![DayFile {
            date: "2021-01-01".parse().unwrap(),
            path: Some(path.clone()),
        }];
        match load_days(&files).unwrap_err() {
            LatencyError::LatencyFile { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_implausible_packet_count_is_malformed() {
        let raw = json!({
            "availability": [{
                "id": "UU.ABC.HHZ",
                "intervals": [{
                    "startTime": "2021-01-01T00:00:00.000Z",
                    "retx": { "allPackets": MAX_INTERVAL_PACKETS + 1 },
                    "latency": { "maximum": 1.0, "minimum": 0.5, "average": 0.7 }
                }]
            }]
        })
        .to_string();
        let days = vec![RetxDay {
            date: "2021-01-01".parse().unwrap(),
            path: Some(PathBuf::from("2021-01-01.json")),
            document: Some(RetxDocument::from_json("2021-01-01.json", &raw).unwrap()),
        }];

        let err = normalize(&days, "UU", "ABC").unwrap_err();
        assert!(matches!(err, LatencyError::LatencyFile { .. }));
        assert!(err.to_string().contains("2021-01-01.json"));
    }
}
