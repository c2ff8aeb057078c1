//! Pass/fail evaluation of data-quality metrics.
//!
//! Every supported metric maps to one [`Family`] of comparison rules.
//! [`evaluate`] turns a day-indexed series into a [`Verdict`] with one
//! human-readable line per failure.

pub mod error;
pub mod evaluator;
pub mod metric;
pub mod table;
pub mod thresholds;
pub mod verdict;

pub use error::{MetricEvaluationError, MetricTableError};
pub use evaluator::{evaluate, evaluate_dated, evaluate_named};
pub use metric::{Family, Metric};
pub use table::{MetricSeries, MetricTable, channel_label};
pub use thresholds::ThresholdConfig;
pub use verdict::Verdict;
