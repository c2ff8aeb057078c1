use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Serialize;
use std::{collections::BTreeMap, fmt};

/// Where a latency sample came from within its source record.
///
/// Packet-retransmission intervals only report a max/min/average triple, so
/// one interval can expand into several samples. `Average` carries an
/// ordinal so that every synthetic sample keeps a distinct identity.
/// `Direct` marks rows that were observed as-is (tabular instruments).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Provenance {
    Max,
    Min,
    Average(u64),
    Direct,
}

impl Provenance {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Min => "min",
            Self::Average(_) => "average",
            Self::Direct => "direct",
        }
    }

    /// Samples suitable for line plots: maxima and directly observed rows.
    pub fn is_plottable(&self) -> bool {
        matches!(self, Self::Max | Self::Direct)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Average(ordinal) => write!(f, "average_{ordinal}"),
            other => write!(f, "{}", other.tag()),
        }
    }
}

/// Decomposed `NET.STA[.LOC].CHA` stream identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
}

impl StreamId {
    /// Accepts three-part (`NET.STA.CHA`) and four-part (`NET.STA.LOC.CHA`)
    /// identifiers. Anything else is rejected.
    pub fn parse(id: &str) -> Option<Self> {
        let parts: Vec<&str> = id.trim().split('.').collect();
        let (network, station, location, channel) = match parts.as_slice() {
            [net, sta, cha] => (*net, *sta, "", *cha),
            [net, sta, loc, cha] => (*net, *sta, *loc, *cha),
            _ => return None,
        };
        if network.is_empty() || station.is_empty() || channel.is_empty() {
            return None;
        }
        Some(Self {
            network: network.to_string(),
            station: station.to_string(),
            location: location.to_string(),
            channel: channel.to_string(),
        })
    }

    pub fn matches(&self, network: &str, station: &str) -> bool {
        self.network == network && self.station == station
    }

    /// `LOC.CHA`, or just `CHA` when the stream has no location code. Sensors
    /// sharing a channel code at different locations stay apart.
    pub fn channel_label(&self) -> String {
        channel_label(&self.location, &self.channel)
    }
}

pub fn channel_label(location: &str, channel: &str) -> String {
    if location.is_empty() {
        channel.to_string()
    } else {
        format!("{location}.{channel}")
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.location.is_empty() {
            write!(f, "{}.{}.{}", self.network, self.station, self.channel)
        } else {
            write!(
                f,
                "{}.{}.{}.{}",
                self.network, self.station, self.location, self.channel
            )
        }
    }
}

/// Identity of a single observation within a latency table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObservationKey {
    pub network: String,
    pub station: String,
    pub location: String,
    pub channel: String,
    pub timestamp: String,
    pub provenance: Provenance,
}

/// One packet latency sample, either observed or reconstructed.
///
/// Serializes to the flat `network,station,channel,startTime,data_latency`
/// layout consumed by plotting and CSV export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyObservation {
    pub network: String,
    pub station: String,
    #[serde(skip)]
    pub location: String,
    pub channel: String,
    #[serde(rename = "startTime")]
    pub timestamp: String,
    #[serde(skip)]
    pub provenance: Provenance,
    pub data_latency: f64,
}

impl LatencyObservation {
    pub fn new(
        stream: &StreamId,
        timestamp: &str,
        provenance: Provenance,
        data_latency: f64,
    ) -> Self {
        Self {
            network: stream.network.clone(),
            station: stream.station.clone(),
            location: stream.location.clone(),
            channel: stream.channel.clone(),
            timestamp: timestamp.to_string(),
            provenance,
            data_latency,
        }
    }

    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            network: self.network.clone(),
            station: self.station.clone(),
            location: self.location.clone(),
            channel: self.channel.clone(),
            timestamp: self.timestamp.clone(),
            provenance: self.provenance,
        }
    }

    /// Calendar day of the observation, taken from the `YYYY-MM-DD` prefix.
    pub fn day(&self) -> Option<&str> {
        self.timestamp.get(..10)
    }
}

/// Insertion-ordered set of observations keyed by their identity.
///
/// Re-inserting an observation with an existing key replaces its value, so
/// feeding the same input twice yields the same table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LatencyTable {
    rows: IndexMap<ObservationKey, LatencyObservation>,
}

impl LatencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, observation: LatencyObservation) {
        self.rows.insert(observation.key(), observation);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &ObservationKey) -> Option<&LatencyObservation> {
        self.rows.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LatencyObservation> {
        self.rows.values()
    }

    pub fn latencies(&self) -> Vec<f64> {
        self.rows.values().map(|o| o.data_latency).collect()
    }

    /// Observations grouped by channel label (`LOC.CHA`), ordered by label.
    pub fn by_channel(&self) -> BTreeMap<String, Vec<&LatencyObservation>> {
        let mut grouped: BTreeMap<String, Vec<&LatencyObservation>> = BTreeMap::new();
        for observation in self.rows.values() {
            grouped
                .entry(channel_label(&observation.location, &observation.channel))
                .or_default()
                .push(observation);
        }
        grouped
    }

    pub fn to_vec(&self) -> Vec<LatencyObservation> {
        self.rows.values().cloned().collect()
    }
}

impl FromIterator<LatencyObservation> for LatencyTable {
    fn from_iter<I: IntoIterator<Item = LatencyObservation>>(iter: I) -> Self {
        let mut table = Self::new();
        for observation in iter {
            table.insert(observation);
        }
        table
    }
}

/// Observations recorded on one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPartition {
    pub date: NaiveDate,
    pub table: LatencyTable,
}

/// Day-ordered partitions covering a validation window. Days without data
/// are present with an empty table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyLatencyTable {
    days: Vec<DailyPartition>,
}

impl DailyLatencyTable {
    pub fn push(&mut self, date: NaiveDate, table: LatencyTable) {
        self.days.push(DailyPartition { date, table });
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailyPartition> {
        self.days.iter()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&LatencyTable> {
        self.days.iter().find(|d| d.date == date).map(|d| &d.table)
    }
}

/// Output of either normalizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedLatency {
    /// Every sample across the window, used for statistics.
    pub combined: LatencyTable,
    /// Plottable subset: reconstructed min/average samples are excluded.
    pub max_only: LatencyTable,
    /// Every sample, partitioned by day.
    pub daily: DailyLatencyTable,
}

impl NormalizedLatency {
    pub(crate) fn record(&mut self, day: &mut LatencyTable, observation: LatencyObservation) {
        if observation.provenance.is_plottable() {
            self.max_only.insert(observation.clone());
        }
        day.insert(observation.clone());
        self.combined.insert(observation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream() -> StreamId {
        StreamId::parse("UU.ABC.HHZ").unwrap()
    }

    #[test]
    fn test_stream_id_parse() {
        let three = StreamId::parse("UU.ABC.HHZ").unwrap();
        assert_eq!(three.network, "UU");
        assert_eq!(three.station, "ABC");
        assert_eq!(three.location, "");
        assert_eq!(three.channel, "HHZ");

        let four = StreamId::parse("UU.ABC.00.HHZ").unwrap();
        assert_eq!(four.location, "00");
        assert_eq!(four.to_string(), "UU.ABC.00.HHZ");

        assert!(StreamId::parse("UU.ABC").is_none());
        assert!(StreamId::parse("UU..HHZ").is_none());
    }

    #[test]
    fn test_table_dedups_on_identity() {
        let mut table = LatencyTable::new();
        let ts = "2021-01-01T00:00:00";
        table.insert(LatencyObservation::new(&stream(), ts, Provenance::Max, 1.0));
        table.insert(LatencyObservation::new(&stream(), ts, Provenance::Max, 2.0));
        table.insert(LatencyObservation::new(&stream(), ts, Provenance::Min, 0.5));
        table.insert(LatencyObservation::new(
            &stream(),
            ts,
            Provenance::Average(1),
            0.7,
        ));
        table.insert(LatencyObservation::new(
            &stream(),
            ts,
            Provenance::Average(2),
            0.7,
        ));

        assert_eq!(table.len(), 4);
        assert_eq!(table.latencies(), vec![2.0, 0.5, 0.7, 0.7]);
    }

    #[test]
    fn test_provenance_display() {
        assert_eq!(Provenance::Max.to_string(), "max");
        assert_eq!(Provenance::Average(3).to_string(), "average_3");
        assert_eq!(Provenance::Average(3).tag(), "average");
        assert!(!Provenance::Min.is_plottable());
        assert!(Provenance::Direct.is_plottable());
    }

    #[test]
    fn test_by_channel_groups() {
        let ehz = StreamId::parse("UU.ABC.EHZ").unwrap();
        let table: LatencyTable = vec![
            LatencyObservation::new(&stream(), "2021-01-01T00:00:00", Provenance::Max, 1.0),
            LatencyObservation::new(&ehz, "2021-01-01T00:00:00", Provenance::Max, 2.0),
            LatencyObservation::new(&stream(), "2021-01-01T00:00:10", Provenance::Max, 3.0),
        ]
        .into_iter()
        .collect();

        let grouped = table.by_channel();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["HHZ"].len(), 2);
        assert_eq!(grouped["EHZ"].len(), 1);
    }

    #[test]
    fn test_locations_stay_apart() {
        let upper = StreamId::parse("UU.ABC.00.HHZ").unwrap();
        let lower = StreamId::parse("UU.ABC.10.HHZ").unwrap();
        let ts = "2021-01-01T00:00:00";
        let table: LatencyTable = vec![
            LatencyObservation::new(&upper, ts, Provenance::Max, 1.0),
            LatencyObservation::new(&lower, ts, Provenance::Max, 4.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.len(), 2);
        let grouped = table.by_channel();
        assert_eq!(grouped["00.HHZ"][0].data_latency, 1.0);
        assert_eq!(grouped["10.HHZ"][0].data_latency, 4.0);
        assert_eq!(stream().channel_label(), "HHZ");
    }
}
