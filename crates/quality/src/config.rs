//! Quality-control thresholds.

use std::collections::BTreeMap;
use evalqc_core::{ContentItem, Domain};
use serde::{Deserialize, Serialize};

/// Minimum plausible completion time for one evaluation form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedPolicy {
    /// Absolute floor, regardless of content length
    pub min_seconds: f64,
    /// Additional time required per word of content
    pub seconds_per_word: f64,
}

impl Default for SpeedPolicy {
    fn default() -> Self {
        Self {
            min_seconds: 60.0,
            seconds_per_word: 0.25,
        }
    }
}

impl SpeedPolicy {
    /// Minimum duration for content with `words` words.
    pub fn min_duration(&self, words: usize) -> f64 {
        self.min_seconds.max(words as f64 * self.seconds_per_word)
    }
}

/// Thresholds for the attention, consistency and trust components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityConfig {
    /// Per-evaluation score standard deviation below which straightlining is suspected
    pub straightline_std_floor: f64,
    /// Straightlining is only judged on evaluations with at least this many criteria
    pub straightline_min_criteria: usize,
    /// Speed floor applied to domains without an override
    pub speed: SpeedPolicy,
    /// Per-domain speed floors
    pub speed_overrides: BTreeMap<Domain, SpeedPolicy>,
    /// Mean absolute distance to the peer mean, on a 1-5 reference scale,
    /// above which an evaluation is an outlier
    pub peer_distance_threshold: f64,
    /// Share of peer-compared items that must be outliers for an evaluator
    /// to count as a persistent outlier
    pub persistent_outlier_rate: f64,
    /// Peer-compared items required before judging persistence
    pub persistent_outlier_min_items: usize,
    /// Per-criterion score variance below which an evaluator's pattern is suspicious
    pub pattern_variance_floor: f64,
    /// Share of straightlined evaluations above which an evaluator's pattern is suspicious
    pub pattern_straightline_share: f64,
    /// Inter-rater agreement required on a content item
    pub agreement_threshold: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            straightline_std_floor: 0.25,
            straightline_min_criteria: 3,
            speed: SpeedPolicy::default(),
            speed_overrides: BTreeMap::new(),
            peer_distance_threshold: 1.0,
            persistent_outlier_rate: 0.5,
            persistent_outlier_min_items: 3,
            pattern_variance_floor: 0.2,
            pattern_straightline_share: 0.3,
            agreement_threshold: 0.7,
        }
    }
}

impl QualityConfig {
    /// Speed policy for `domain`.
    pub fn speed_for(&self, domain: &Domain) -> SpeedPolicy {
        self.speed_overrides.get(domain).copied().unwrap_or(self.speed)
    }

    /// Minimum duration in seconds for evaluating `content`.
    pub fn min_duration(&self, content: &ContentItem) -> f64 {
        self.speed_for(&content.domain).min_duration(content.word_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_duration_scales_with_length() {
        let policy = SpeedPolicy::default();
        assert_eq!(policy.min_duration(10), 60.0);
        assert_eq!(policy.min_duration(1000), 250.0);
    }

    #[test]
    fn test_override_applies_to_its_domain_only() {
        let mut config = QualityConfig::default();
        config.speed_overrides.insert(
            Domain::AcademicPapers,
            SpeedPolicy { min_seconds: 300.0, seconds_per_word: 0.5 },
        );
        let paper = ContentItem::human(Domain::AcademicPapers, "short abstract");
        let post = ContentItem::human(Domain::SocialMediaPosts, "short post");
        assert_eq!(config.min_duration(&paper), 300.0);
        assert_eq!(config.min_duration(&post), 60.0);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: QualityConfig = serde_json::from_str(
            r#"{"straightline_std_floor": 0.5, "speed_overrides": {"news_articles": {"min_seconds": 90}}}"#,
        )
        .unwrap();
        assert_eq!(config.straightline_std_floor, 0.5);
        assert_eq!(config.straightline_min_criteria, 3);
        let news = config.speed_for(&Domain::NewsArticles);
        assert_eq!(news.min_seconds, 90.0);
        assert_eq!(news.seconds_per_word, 0.25);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = serde_json::from_str::<QualityConfig>(r#"{"straightline_floor": 0.5}"#);
        assert!(err.is_err());
    }
}
