//! Human-AI gap analysis.

use std::collections::BTreeMap;
use evalqc_core::{
    AggregateScore, CriterionCatalog, CriterionGap, CriterionId, Domain, GapEntry, GapReport,
    Subject, SummaryGap,
};
use tracing::debug;

use crate::config::AnalyticsConfig;

/// Signed gap between a model mean and a human mean.
///
/// Negative when the model underperforms; `signed_gap(a, b) == -signed_gap(b, a)`.
pub fn signed_gap(ai_mean: f64, human_mean: f64) -> f64 {
    ai_mean - human_mean
}

/// Compares model aggregates with the human baseline.
#[derive(Debug, Clone, Default)]
pub struct GapAnalyzer {
    config: AnalyticsConfig,
}

impl GapAnalyzer {
    /// Analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the thresholds.
    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Thresholds in use.
    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Compare one model row with its human baseline row.
    pub fn compare(
        &self,
        human: &AggregateScore,
        ai: &AggregateScore,
        catalog: &CriterionCatalog,
    ) -> Option<GapEntry> {
        let model = ai.subject.model_name()?;
        let criterion = catalog.lookup(&ai.domain, &ai.criterion_id);
        let range = criterion.map(|c| c.range()).unwrap_or(crate::config::REFERENCE_RANGE);
        let threshold = self.config.threshold_for(criterion);

        let gap = signed_gap(ai.mean, human.mean);
        let insufficient_data = human.sample_count < self.config.min_sample_count
            || ai.sample_count < self.config.min_sample_count;

        Some(GapEntry {
            model: model.to_string(),
            domain: ai.domain.clone(),
            criterion_id: ai.criterion_id.clone(),
            human_score: human.mean,
            ai_score: ai.mean,
            human_samples: human.sample_count,
            ai_samples: ai.sample_count,
            gap,
            normalized_gap: if range > 0.0 { gap / range } else { 0.0 },
            threshold,
            significant: !insufficient_data && gap.abs() >= threshold,
            insufficient_data,
        })
    }

    /// Build the gap report from aggregate rows.
    ///
    /// Only (domain, criterion) keys with both a human row and at least one
    /// model row produce entries.
    pub fn analyze(&self, scores: &[AggregateScore], catalog: &CriterionCatalog) -> GapReport {
        let mut humans: BTreeMap<(&Domain, &CriterionId), &AggregateScore> = BTreeMap::new();
        for row in scores.iter().filter(|r| r.subject == Subject::Human) {
            humans.insert((&row.domain, &row.criterion_id), row);
        }

        let mut report = GapReport::default();
        for ai in scores.iter().filter(|r| r.subject != Subject::Human) {
            let Some(human) = humans.get(&(&ai.domain, &ai.criterion_id)) else {
                continue;
            };
            let Some(entry) = self.compare(human, ai, catalog) else {
                continue;
            };
            report
                .domains
                .entry(ai.domain.clone())
                .or_default()
                .entry(ai.criterion_id.clone())
                .or_insert_with(|| CriterionGap {
                    human_score: human.mean,
                    human_samples: human.sample_count,
                    best_model: None,
                    models: BTreeMap::new(),
                })
                .models
                .insert(entry.model.clone(), entry);
        }

        let mut gaps = Vec::new();
        for criteria in report.domains.values_mut() {
            for comparison in criteria.values_mut() {
                // Models iterate in name order, so strict `>` keeps the
                // smallest name on ties.
                let mut best: Option<&GapEntry> = None;
                for entry in comparison.models.values() {
                    gaps.push(entry.gap);
                    if best.map_or(true, |b| entry.ai_score > b.ai_score) {
                        best = Some(entry);
                    }
                }
                comparison.best_model = best.map(|b| b.model.clone());
            }
        }
        report.overall_gap = evalqc_quality::stats::mean(&gaps);
        report.domain_gaps = summarize(pool(scores, |r| r.domain.clone()));
        report.criterion_gaps = summarize(pool(scores, |r| r.criterion_id.clone()));

        debug!("Gap report: {} comparisons", gaps.len());
        report
    }
}

/// Sample-weighted mean and sample count per (key, subject).
fn pool<K: Ord>(
    scores: &[AggregateScore],
    key: impl Fn(&AggregateScore) -> K,
) -> BTreeMap<K, BTreeMap<&Subject, (f64, usize)>> {
    let mut sums: BTreeMap<K, BTreeMap<&Subject, (f64, usize)>> = BTreeMap::new();
    for row in scores {
        let entry = sums.entry(key(row)).or_default().entry(&row.subject).or_default();
        entry.0 += row.mean * row.sample_count as f64;
        entry.1 += row.sample_count;
    }
    for subjects in sums.values_mut() {
        for (sum, n) in subjects.values_mut() {
            *sum /= *n as f64;
        }
    }
    sums
}

/// Human pool against the best model pool, for keys that have both.
fn summarize<K: Ord>(
    pooled: BTreeMap<K, BTreeMap<&Subject, (f64, usize)>>,
) -> BTreeMap<K, SummaryGap> {
    pooled
        .into_iter()
        .filter_map(|(key, subjects)| {
            let &(human_score, human_samples) = subjects.get(&Subject::Human)?;
            let mut best: Option<(&str, f64, usize)> = None;
            for (subject, &(mean, n)) in &subjects {
                let Some(name) = subject.model_name() else {
                    continue;
                };
                if best.map_or(true, |(_, top, _)| mean > top) {
                    best = Some((name, mean, n));
                }
            }
            let (model, ai_score, ai_samples) = best?;
            Some((
                key,
                SummaryGap {
                    human_score,
                    ai_score,
                    human_samples,
                    ai_samples,
                    gap: signed_gap(ai_score, human_score),
                    best_model: model.to_string(),
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalqc_core::Criterion;

    fn row(subject: Subject, criterion: &str, mean: f64, n: usize) -> AggregateScore {
        AggregateScore {
            subject,
            domain: Domain::CreativeWriting,
            criterion_id: CriterionId::new(criterion),
            mean,
            median: mean,
            sample_count: n,
        }
    }

    fn model(name: &str) -> Subject {
        Subject::Model(name.into())
    }

    fn lenient() -> GapAnalyzer {
        GapAnalyzer::new().with_config(AnalyticsConfig {
            min_sample_count: 3,
            ..Default::default()
        })
    }

    #[test]
    fn test_gap_is_antisymmetric() {
        assert_eq!(signed_gap(2.5, 4.0), -signed_gap(4.0, 2.5));
        assert_eq!(signed_gap(3.0, 3.0), 0.0);
    }

    #[test]
    fn test_significant_underperformance() {
        let catalog = CriterionCatalog::standard();
        let scores = [
            row(Subject::Human, "coherence", 13.0 / 3.0, 3),
            row(model("X"), "coherence", 7.0 / 3.0, 3),
        ];
        let report = lenient().analyze(&scores, &catalog);
        let entry = report
            .entry(&Domain::CreativeWriting, &CriterionId::new("coherence"), "X")
            .unwrap();
        assert!((entry.gap + 2.0).abs() < 1e-9);
        assert!((entry.normalized_gap + 0.5).abs() < 1e-9);
        assert!(entry.significant);
        assert!(!entry.insufficient_data);
    }

    #[test]
    fn test_sparse_samples_never_significant() {
        let catalog = CriterionCatalog::standard();
        let scores = [
            row(Subject::Human, "coherence", 5.0, 1),
            row(model("X"), "coherence", 1.0, 1),
        ];
        let report = GapAnalyzer::new().analyze(&scores, &catalog);
        let entry = report.entries().next().unwrap();
        assert_eq!(entry.gap, -4.0);
        assert!(entry.insufficient_data);
        assert!(!entry.significant);
    }

    #[test]
    fn test_threshold_and_sample_boundaries() {
        let catalog = CriterionCatalog::standard();
        let at_threshold = [
            row(Subject::Human, "accuracy", 4.0, 5),
            row(model("X"), "accuracy", 3.5, 5),
        ];
        let entry = GapAnalyzer::new()
            .analyze(&at_threshold, &catalog)
            .entries()
            .next()
            .cloned()
            .unwrap();
        assert!(entry.significant);

        let below = [
            row(Subject::Human, "accuracy", 4.0, 5),
            row(model("X"), "accuracy", 3.6, 5),
        ];
        let entry = GapAnalyzer::new()
            .analyze(&below, &catalog)
            .entries()
            .next()
            .cloned()
            .unwrap();
        assert!(!entry.significant);
        assert!(!entry.insufficient_data);
    }

    #[test]
    fn test_threshold_follows_criterion_scale() {
        let catalog = CriterionCatalog::new(vec![Criterion::new("style", "style", 0, 10)]).unwrap();
        let scores = [
            row(Subject::Human, "style", 7.0, 5),
            row(model("X"), "style", 6.0, 5),
        ];
        let report = GapAnalyzer::new().analyze(&scores, &catalog);
        let entry = report.entries().next().unwrap();
        assert_eq!(entry.threshold, 1.25);
        assert!(!entry.significant);
    }

    #[test]
    fn test_best_model_and_overall_gap() {
        let catalog = CriterionCatalog::standard();
        let scores = [
            row(Subject::Human, "coherence", 4.0, 5),
            row(model("b"), "coherence", 3.0, 5),
            row(model("a"), "coherence", 3.0, 5),
            row(model("c"), "coherence", 2.0, 5),
            row(model("c"), "creativity", 2.0, 5),
        ];
        let report = GapAnalyzer::new().analyze(&scores, &catalog);
        let coherence = &report.domains[&Domain::CreativeWriting][&CriterionId::new("coherence")];
        assert_eq!(coherence.best_model.as_deref(), Some("a"));
        assert_eq!(coherence.models.len(), 3);
        // creativity has no human baseline
        assert_eq!(report.entries().count(), 3);
        assert!((report.overall_gap.unwrap() + 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        let report = GapAnalyzer::new().analyze(&[], &CriterionCatalog::standard());
        assert!(report.is_empty());
        assert_eq!(report.overall_gap, None);
    }

    #[test]
    fn test_domain_and_criterion_summaries() {
        let catalog = CriterionCatalog::standard();
        let news = |subject: Subject, criterion: &str, mean: f64, n: usize| AggregateScore {
            domain: Domain::NewsArticles,
            ..row(subject, criterion, mean, n)
        };
        let scores = [
            row(Subject::Human, "coherence", 4.0, 4),
            row(Subject::Human, "accuracy", 5.0, 4),
            row(model("a"), "coherence", 3.0, 2),
            row(model("a"), "accuracy", 3.0, 2),
            row(model("b"), "coherence", 2.0, 6),
            news(Subject::Human, "coherence", 2.0, 4),
            news(model("b"), "coherence", 4.0, 2),
        ];
        let report = GapAnalyzer::new().analyze(&scores, &catalog);

        let creative = &report.domain_gaps[&Domain::CreativeWriting];
        assert_eq!(creative.human_score, 4.5);
        assert_eq!(creative.human_samples, 8);
        assert_eq!(creative.best_model, "a");
        assert_eq!(creative.ai_score, 3.0);
        assert_eq!(creative.gap, -1.5);

        let news_gap = &report.domain_gaps[&Domain::NewsArticles];
        assert_eq!(news_gap.best_model, "b");
        assert_eq!(news_gap.gap, 2.0);

        // coherence pooled over both domains: human (16 + 8) / 8, a 3.0, b (12 + 8) / 8
        let coherence = &report.criterion_gaps[&CriterionId::new("coherence")];
        assert_eq!(coherence.human_score, 3.0);
        assert_eq!(coherence.best_model, "a");
        assert_eq!(coherence.ai_score, 3.0);
        assert_eq!(coherence.ai_samples, 2);
        assert_eq!(coherence.gap, 0.0);
        assert_eq!(report.criterion_gaps.len(), 2);
    }
}
