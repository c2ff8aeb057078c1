#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{Value, json};
use station_latency::DateWindow;
use station_validator::{orchestrator::StationTarget, settings::Settings};
use std::{fs, path::PathBuf};
use tempfile::TempDir;

pub const NETWORK: &str = "UU";
pub const STATION: &str = "ABC";

pub fn target(start: &str, end: &str) -> StationTarget {
    let window = DateWindow::new(
        start.parse::<NaiveDate>().unwrap(),
        end.parse::<NaiveDate>().unwrap(),
    )
    .unwrap();
    StationTarget::new(NETWORK, STATION, window)
}

pub fn settings() -> Settings {
    Settings::default()
}

pub fn interval(start: &str, packets: u64, max: f64, min: f64, avg: f64, pct: f64) -> Value {
    json!({
        "startTime": start,
        "percentAvailability": pct,
        "retx": { "allPackets": packets },
        "latency": { "maximum": max, "minimum": min, "average": avg }
    })
}

pub fn write_retx_day(dir: &TempDir, day: &str, stream: &str, intervals: Vec<Value>) {
    let doc = json!({ "availability": [{ "id": stream, "intervals": intervals }] });
    fs::write(dir.path().join(format!("{day}.json")), doc.to_string()).unwrap();
}

pub fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn metrics_csv(rows: &[(&str, &str, &str)]) -> String {
    let mut content = String::from("target,metricName,value,start,end\n");
    for (metric, value, day) in rows {
        content.push_str(&format!(
            "{NETWORK}.{STATION}.00.HHZ.M,{metric},{value},{day}T00:00:00.000000Z,\n"
        ));
    }
    content
}

pub fn read_json(path: &std::path::Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}
