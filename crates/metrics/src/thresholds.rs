use crate::{error::MetricEvaluationError, metric::Metric};
use std::collections::BTreeMap;

/// Metric limits for one report. Metrics not configured fall back to
/// [`Metric::default_limit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThresholdConfig {
    limits: BTreeMap<Metric, f64>,
}

impl ThresholdConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from metric names as they appear in configuration files.
    pub fn from_named(named: &BTreeMap<String, f64>) -> Result<Self, MetricEvaluationError> {
        let mut config = Self::new();
        for (name, limit) in named {
            if !limit.is_finite() || *limit < 0.0 {
                return Err(MetricEvaluationError::InvalidLimit {
                    metric: name.clone(),
                    limit: *limit,
                });
            }
            config.limits.insert(name.parse()?, *limit);
        }
        Ok(config)
    }

    pub fn with_limit(mut self, metric: Metric, limit: f64) -> Self {
        self.limits.insert(metric, limit);
        self
    }

    pub fn limit(&self, metric: Metric) -> f64 {
        self.limits
            .get(&metric)
            .copied()
            .unwrap_or_else(|| metric.default_limit())
    }

    /// Every metric with the limit that will be applied to it.
    pub fn effective(&self) -> BTreeMap<Metric, f64> {
        Metric::ALL.iter().map(|m| (*m, self.limit(*m))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_defaults() {
        let config = ThresholdConfig::new().with_limit(Metric::NumGaps, 3.0);
        assert_eq!(config.limit(Metric::NumGaps), 3.0);
        assert_eq!(config.limit(Metric::PercentAvailability), 98.0);
        assert_eq!(config.limit(Metric::TimingQuality), 70.0);
        assert_eq!(config.effective().len(), Metric::ALL.len());
    }

    #[test]
    fn test_from_named() {
        let named = BTreeMap::from([
            ("clock_locked".to_string(), 2.0),
            ("pct_above_nhnm".to_string(), 10.0),
        ]);
        let config = ThresholdConfig::from_named(&named).unwrap();
        assert_eq!(config.limit(Metric::ClockLocked), 2.0);
        assert_eq!(config.limit(Metric::PctAboveNhnm), 10.0);
    }

    #[test]
    fn test_from_named_rejects_unknown_and_negative() {
        let unknown = BTreeMap::from([("bogus".to_string(), 1.0)]);
        assert_eq!(
            ThresholdConfig::from_named(&unknown).unwrap_err(),
            MetricEvaluationError::UnknownMetric("bogus".to_string())
        );

        let negative = BTreeMap::from([("num_gaps".to_string(), -1.0)]);
        assert!(matches!(
            ThresholdConfig::from_named(&negative),
            Err(MetricEvaluationError::InvalidLimit { .. })
        ));
    }
}
