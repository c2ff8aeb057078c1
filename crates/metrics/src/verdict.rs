use serde::{Deserialize, Serialize};

/// Outcome of evaluating one metric series against its limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// One line per failure, ordered by day. Empty exactly when `passed`.
    pub details: Vec<String>,
    pub values: Vec<f64>,
}

impl Verdict {
    pub fn from_details(details: Vec<String>, values: &[f64]) -> Self {
        Self {
            passed: details.is_empty(),
            details,
            values: values.to_vec(),
        }
    }

    pub fn failures(&self) -> usize {
        self.details.len()
    }
}
