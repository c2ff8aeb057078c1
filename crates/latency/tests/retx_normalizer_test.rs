use chrono::NaiveDate;
use serde_json::{Value, json};
use station_latency::{
    DateWindow, LatencyAggregator, LatencyError, Provenance,
    aggregator::packet_availability,
    locator::{DEFAULT_FILE_TEMPLATE, LatencyFileLocator},
    retx::{self, load_days},
};
use std::fs;
use tempfile::TempDir;

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn interval(start: &str, packets: u64, max: f64, min: f64, avg: f64) -> Value {
    json!({
        "startTime": start,
        "percentAvailability": 100.0,
        "retx": { "allPackets": packets },
        "latency": { "maximum": max, "minimum": min, "average": avg }
    })
}

fn write_day(dir: &TempDir, day: &str, doc: Value) {
    fs::write(dir.path().join(format!("{day}.json")), doc.to_string()).unwrap();
}

fn load(dir: &TempDir, start: &str, end: &str) -> Vec<retx::RetxDay> {
    let window = DateWindow::new(date(start), date(end)).unwrap();
    let locator = LatencyFileLocator::new(dir.path(), DEFAULT_FILE_TEMPLATE);
    let files = locator.daily_files(&window, "UU", "ABC").unwrap();
    load_days(&files).unwrap()
}

#[test]
fn test_single_packet_intervals_collapse_to_one_max() {
    let dir = TempDir::new().unwrap();
    let start = "2021-01-01T00:00:00.000Z";
    write_day(
        &dir,
        "2021-01-01",
        json!({
            "availability": [{
                "id": "UU.ABC.HHZ",
                "intervals": [
                    interval(start, 1, 3.5, -1.0, -1.0),
                    interval(start, 1, 3.5, -1.0, -1.0),
                    interval(start, 1, 3.5, -1.0, -1.0),
                    interval(start, 1, 3.5, -1.0, -1.0)
                ]
            }]
        }),
    );

    let days = load(&dir, "2021-01-01", "2021-01-02");
    let normalized = retx::normalize(&days, "UU", "ABC").unwrap();

    assert_eq!(normalized.combined.len(), 1);
    let only = normalized.combined.iter().next().unwrap();
    assert_eq!(only.data_latency, 3.5);
    assert_eq!(only.provenance, Provenance::Max);
}

#[test]
fn test_dual_accumulation_and_daily_partitions() {
    let dir = TempDir::new().unwrap();
    write_day(
        &dir,
        "2021-01-01",
        json!({
            "availability": [
                {
                    "id": "UU.ABC.HHZ",
                    "intervals": [
                        interval("2021-01-01T00:00:00Z", 3, 4.0, 1.0, 2.0),
                        interval("2021-01-01T00:00:10Z", 5, 6.0, 2.0, 3.0)
                    ]
                },
                {
                    "id": "UU.OTHER.HHZ",
                    "intervals": [interval("2021-01-01T00:00:00Z", 2, 9.0, 9.0, 9.0)]
                }
            ]
        }),
    );
    // 2021-01-02 intentionally missing
    write_day(
        &dir,
        "2021-01-03",
        json!({
            "availability": [{
                "id": "UU.ABC.HHN",
                "intervals": [interval("2021-01-03T00:00:00Z", 2, 1.5, 0.5, 1.0)]
            }]
        }),
    );

    let days = load(&dir, "2021-01-01", "2021-01-04");
    let normalized = retx::normalize(&days, "UU", "ABC").unwrap();

    // 3 packets -> 3 samples, 5 packets -> 5 samples, 2 packets -> 2 samples
    assert_eq!(normalized.combined.len(), 10);
    // One max per interval
    assert_eq!(normalized.max_only.len(), 3);
    assert!(
        normalized
            .max_only
            .iter()
            .all(|o| o.provenance == Provenance::Max)
    );

    let sizes: Vec<usize> = normalized.daily.iter().map(|d| d.table.len()).collect();
    assert_eq!(sizes, vec![8, 0, 2]);

    let reconstructed = normalized
        .combined
        .iter()
        .find(|o| o.timestamp == "2021-01-01T00:00:00Z" && o.provenance == Provenance::Average(1))
        .unwrap();
    assert_eq!(reconstructed.data_latency, 3.0 * 2.0 - 1.0 - 4.0);

    let raw_averages = normalized
        .combined
        .iter()
        .filter(|o| o.timestamp == "2021-01-01T00:00:10Z" && o.provenance.tag() == "average")
        .count();
    assert_eq!(raw_averages, 3);

    let aggregator = LatencyAggregator::new(3.0, 98.0);
    let station = aggregator.station_summary(&normalized.combined);
    assert_eq!(station.total_latencies, 10);
    // >= 3.0: 4.0, 6.0, 3.0 x3
    assert_eq!(station.failed_latencies, 5);
    assert!(!station.timely_passed);

    assert_eq!(packet_availability(&days, "UU", "ABC"), Some(100.0));
}

#[test]
fn test_normalizing_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    write_day(
        &dir,
        "2021-01-01",
        json!({
            "availability": [{
                "id": "UU.ABC.HHZ",
                "intervals": [
                    interval("2021-01-01T00:00:00Z", 7, 4.0, 1.0, 2.0),
                    interval("2021-01-01T00:00:10Z", 3, 4.0, 1.0, 2.0)
                ]
            }]
        }),
    );

    let days = load(&dir, "2021-01-01", "2021-01-02");
    let first = retx::normalize(&days, "UU", "ABC").unwrap();
    let second = retx::normalize(&days, "UU", "ABC").unwrap();

    assert_eq!(first, second);
    assert_eq!(first.combined.to_vec(), second.combined.to_vec());
}

#[test]
fn test_malformed_file_aborts() {
    let dir = TempDir::new().unwrap();
    write_day(&dir, "2021-01-01", json!({ "availability": [] }));
    fs::write(dir.path().join("2021-01-02.json"), "{\"availability\": [").unwrap();

    let window = DateWindow::new(date("2021-01-01"), date("2021-01-03")).unwrap();
    let locator = LatencyFileLocator::new(dir.path(), DEFAULT_FILE_TEMPLATE);
    let files = locator.daily_files(&window, "UU", "ABC").unwrap();

    match load_days(&files) {
        Err(LatencyError::LatencyFile { path, .. }) => {
            assert!(path.ends_with("2021-01-02.json"));
        }
        other => panic!("expected LatencyFile error, got {other:?}"),
    }
}
