//! Packet latency normalization and aggregation.
//!
//! Two instrument families report latency differently: packet-retransmission
//! devices write daily JSON summaries per interval ([`retx`]), others write
//! CSV rows with an encoded latency column ([`tabular`]). Both normalize into
//! the same [`NormalizedLatency`] tables, which [`aggregator`] reduces to
//! availability and timeliness figures.

pub mod aggregator;
pub mod csv_exporter;
pub mod error;
pub mod locator;
pub mod retx;
pub mod tabular;
pub mod types;
pub mod window;

pub use aggregator::{DailyTimeliness, LatencyAggregator, LatencySummary};
pub use error::{LatencyError, Result};
pub use types::{
    DailyLatencyTable, LatencyObservation, LatencyTable, NormalizedLatency, ObservationKey,
    Provenance, StreamId,
};
pub use window::DateWindow;
