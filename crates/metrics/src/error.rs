use crate::metric::Metric;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricEvaluationError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Cannot average an empty series for {0}")]
    EmptySeries(Metric),

    #[error("Invalid limit {limit} for {metric}")]
    InvalidLimit { metric: String, limit: f64 },

    #[error("{metric} has {values} values but {dates} dates")]
    DateCountMismatch {
        metric: Metric,
        dates: usize,
        values: usize,
    },
}

#[derive(Error, Debug)]
pub enum MetricTableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid date '{value}' on line {line}")]
    InvalidDate { line: u64, value: String },

    #[error("Invalid value '{value}' for {metric} on line {line}")]
    InvalidValue {
        line: u64,
        metric: String,
        value: String,
    },
}
