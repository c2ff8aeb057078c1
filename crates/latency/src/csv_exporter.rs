use crate::{
    aggregator::DailyTimeliness,
    error::Result,
    types::{LatencyTable, NormalizedLatency},
};
use csv::Writer;
use serde::Serialize;
use std::{
    fs::create_dir_all,
    path::{Path, PathBuf},
};
use tracing::info;

pub const COMBINED_FILE: &str = "latency_all.csv";
pub const MAX_ONLY_FILE: &str = "latency_max.csv";
pub const TIMELINESS_FILE: &str = "timeliness_by_day.csv";

// Generic CSV writer for any serializable collection
pub trait CsvWritable {
    fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl<T> CsvWritable for [T]
where
    T: Serialize,
{
    fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        for record in self {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Writes `network,station,channel,startTime,data_latency` rows. An empty
/// table still gets its header so downstream readers see the schema.
pub fn write_latency_csv(path: &Path, table: &LatencyTable) -> Result<()> {
    if table.is_empty() {
        return write_header(
            path,
            &["network", "station", "channel", "startTime", "data_latency"],
        );
    }
    table.to_vec().write_csv(path)
}

/// Exports the combined table, the plottable subset and one file per day.
/// Returns the paths written.
pub fn export_latency(output_dir: &Path, latency: &NormalizedLatency) -> Result<Vec<PathBuf>> {
    create_dir_all(output_dir)?;

    let mut written = Vec::new();

    let combined = output_dir.join(COMBINED_FILE);
    write_latency_csv(&combined, &latency.combined)?;
    written.push(combined);

    let max_only = output_dir.join(MAX_ONLY_FILE);
    write_latency_csv(&max_only, &latency.max_only)?;
    written.push(max_only);

    for partition in latency.daily.iter() {
        let path = output_dir.join(format!("latency_{}.csv", partition.date.format("%Y-%m-%d")));
        write_latency_csv(&path, &partition.table)?;
        written.push(path);
    }

    info!(
        "Wrote {} latency files to {}",
        written.len(),
        output_dir.display()
    );
    Ok(written)
}

pub fn write_timeliness_csv(output_dir: &Path, rows: &[DailyTimeliness]) -> Result<PathBuf> {
    create_dir_all(output_dir)?;
    let path = output_dir.join(TIMELINESS_FILE);

    if rows.is_empty() {
        write_header(&path, &["channel", "date", "below", "above", "negative"])?;
    } else {
        rows.write_csv(&path)?;
    }
    info!("Wrote {}", path.display());
    Ok(path)
}

fn write_header(path: &Path, header: &[&str]) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    writer.write_record(header)?;
    writer.flush()?;
    Ok(())
}
