//! Aggregation and gap thresholds.

use evalqc_core::Criterion;
use evalqc_quality::QualityConfig;
use serde::{Deserialize, Serialize};

/// Scale width the gap threshold is expressed on (a 1-5 scale).
pub const REFERENCE_RANGE: f64 = 4.0;

/// Thresholds for gap significance and suggestion selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyticsConfig {
    /// Minimum |gap| for significance, on a 1-5 reference scale
    pub gap_threshold: f64,
    /// Samples required on both sides before a gap can be significant
    pub min_sample_count: usize,
    /// Lowest unbaselined criteria suggested per model and domain
    pub max_unbaselined_per_model: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            gap_threshold: 0.5,
            min_sample_count: 5,
            max_unbaselined_per_model: 3,
        }
    }
}

impl AnalyticsConfig {
    /// Gap threshold on `criterion`'s own scale.
    pub fn threshold_for(&self, criterion: Option<&Criterion>) -> f64 {
        match criterion {
            Some(c) => self.gap_threshold * c.range() / REFERENCE_RANGE,
            None => self.gap_threshold,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Trust and consistency thresholds
    pub quality: QualityConfig,
    /// Aggregation and gap thresholds
    pub analytics: AnalyticsConfig,
}

impl EngineConfig {
    /// Parse from JSON; omitted fields keep their defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_scales_with_range() {
        let config = AnalyticsConfig::default();
        let five = Criterion::new("coherence", "coherence", 1, 5);
        let ten = Criterion::new("style", "style", 0, 10);
        assert_eq!(config.threshold_for(Some(&five)), 0.5);
        assert_eq!(config.threshold_for(Some(&ten)), 1.25);
        assert_eq!(config.threshold_for(None), 0.5);
    }

    #[test]
    fn test_engine_config_from_partial_json() {
        let config = EngineConfig::from_json(
            r#"{"analytics": {"min_sample_count": 3}, "quality": {"peer_distance_threshold": 1.5}}"#,
        )
        .unwrap();
        assert_eq!(config.analytics.min_sample_count, 3);
        assert_eq!(config.analytics.gap_threshold, 0.5);
        assert_eq!(config.quality.peer_distance_threshold, 1.5);
        assert!(EngineConfig::from_json(r#"{"analytic": {}}"#).is_err());
    }
}
