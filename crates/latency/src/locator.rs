use crate::{
    error::{LatencyError, Result},
    window::DateWindow,
};
use chrono::NaiveDate;
use itertools::Itertools;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub const DEFAULT_FILE_TEMPLATE: &str = "{date}.json";

/// A day of the validation window and the file holding its latency data, if
/// one was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayFile {
    pub date: NaiveDate,
    pub path: Option<PathBuf>,
}

/// Resolves per-day latency files inside a directory.
///
/// The file name template may reference `{network}`, `{station}` and `{date}`
/// (formatted `YYYY-MM-DD`).
#[derive(Debug, Clone)]
pub struct LatencyFileLocator {
    dir: PathBuf,
    template: String,
}

impl LatencyFileLocator {
    pub fn new(dir: impl Into<PathBuf>, template: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            template: template.into(),
        }
    }

    pub fn path_for(&self, network: &str, station: &str, date: NaiveDate) -> PathBuf {
        let name = self
            .template
            .replace("{network}", network)
            .replace("{station}", station)
            .replace("{date}", &date.format("%Y-%m-%d").to_string());
        self.dir.join(name)
    }

    /// One entry per day of the window. Missing days are logged and kept with
    /// no path; a window with no file at all is an error.
    pub fn daily_files(
        &self,
        window: &DateWindow,
        network: &str,
        station: &str,
    ) -> Result<Vec<DayFile>> {
        let files: Vec<DayFile> = window
            .days()
            .map(|date| {
                let path = self.path_for(network, station, date);
                if path.is_file() {
                    debug!("Found latency file {}", path.display());
                    DayFile {
                        date,
                        path: Some(path),
                    }
                } else {
                    warn!("No latency file for {date}: {} is missing", path.display());
                    DayFile { date, path: None }
                }
            })
            .collect();

        if files.iter().all(|f| f.path.is_none()) {
            return Err(LatencyError::NoLatencyFiles {
                network: network.to_string(),
                station: station.to_string(),
                start: window.start(),
                end: window.end(),
            });
        }

        Ok(files)
    }
}

/// All `.csv` files directly inside `dir`, sorted by name.
pub fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let files = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .sorted()
        .collect();
    Ok(files)
}
