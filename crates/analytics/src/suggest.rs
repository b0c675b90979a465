//! Improvement suggestions.

use std::collections::BTreeMap;
use evalqc_core::{
    AggregateScore, Criterion, CriterionCatalog, CriterionId, Domain, ImprovementSuggestion,
    Priority, Subject,
};
use tracing::debug;

use crate::config::AnalyticsConfig;
use crate::gap::GapAnalyzer;

/// Priority for a gap of `magnitude` against `threshold`.
pub fn priority(magnitude: f64, threshold: f64) -> Priority {
    if magnitude >= 2.0 * threshold {
        Priority::High
    } else if magnitude >= threshold {
        Priority::Medium
    } else {
        Priority::Low
    }
}

struct Candidate<'a> {
    row: &'a AggregateScore,
    criterion: &'a Criterion,
    target: f64,
    baselined: bool,
}

/// Derives ranked suggestions from gaps and low scores.
#[derive(Debug, Clone, Default)]
pub struct SuggestionGenerator {
    config: AnalyticsConfig,
}

impl SuggestionGenerator {
    /// Generator with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the thresholds.
    pub fn with_config(mut self, config: AnalyticsConfig) -> Self {
        self.config = config;
        self
    }

    /// Suggestions for every model, or only `model` when given.
    ///
    /// Rows of `benchmark` are the baseline. A model row with a significant
    /// negative gap to its baseline targets the baseline mean. The model's
    /// remaining rows below target are candidates, the lowest
    /// `max_unbaselined_per_model` per model and domain. Their target is the
    /// baseline mean when one exists, else one unit below the scale maximum.
    pub fn generate(
        &self,
        scores: &[AggregateScore],
        catalog: &CriterionCatalog,
        model: Option<&str>,
        benchmark: &Subject,
    ) -> Vec<ImprovementSuggestion> {
        let wanted = |name: &str| model.map_or(true, |m| m == name);
        let gaps = GapAnalyzer::new().with_config(self.config.clone());

        let baselines: BTreeMap<(&Domain, &CriterionId), &AggregateScore> = scores
            .iter()
            .filter(|r| &r.subject == benchmark)
            .map(|r| ((&r.domain, &r.criterion_id), r))
            .collect();

        let mut suggestions = Vec::new();
        let mut low: BTreeMap<(&str, &Domain), Vec<Candidate>> = BTreeMap::new();
        for row in scores {
            let Some(name) = row.subject.model_name() else {
                continue;
            };
            if &row.subject == benchmark || !wanted(name) {
                continue;
            }
            let Some(criterion) = catalog.lookup(&row.domain, &row.criterion_id) else {
                continue;
            };
            let baseline = baselines.get(&(&row.domain, &row.criterion_id)).copied();
            if let Some(base) = baseline {
                let behind = gaps
                    .compare(base, row, catalog)
                    .is_some_and(|entry| entry.significant && entry.gap < 0.0);
                if behind {
                    let suggestion =
                        self.suggestion(name, &row.domain, criterion, row.mean, base.mean, true);
                    suggestions.push(suggestion);
                    continue;
                }
            }
            let target = baseline.map_or(f64::from(criterion.scale_max) - 1.0, |b| b.mean);
            if row.mean < target {
                low.entry((name, &row.domain)).or_default().push(Candidate {
                    row,
                    criterion,
                    target,
                    baselined: baseline.is_some(),
                });
            }
        }
        for ((name, domain), mut candidates) in low {
            candidates.sort_by(|a, b| {
                a.row
                    .mean
                    .total_cmp(&b.row.mean)
                    .then(a.row.criterion_id.cmp(&b.row.criterion_id))
            });
            for c in candidates.into_iter().take(self.config.max_unbaselined_per_model) {
                let suggestion =
                    self.suggestion(name, domain, c.criterion, c.row.mean, c.target, c.baselined);
                suggestions.push(suggestion);
            }
        }

        suggestions.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.magnitude.total_cmp(&a.magnitude))
                .then(a.model_name.cmp(&b.model_name))
                .then(a.domain.cmp(&b.domain))
                .then(a.criterion_id.cmp(&b.criterion_id))
        });
        debug!("Generated {} suggestions against {:?}", suggestions.len(), benchmark);
        suggestions
    }

    fn suggestion(
        &self,
        model: &str,
        domain: &Domain,
        criterion: &Criterion,
        current: f64,
        target: f64,
        baselined: bool,
    ) -> ImprovementSuggestion {
        let magnitude = (target - current).abs();
        let mut text = format!(
            "Improve {} in {}: currently {:.2}, target {:.2}.",
            criterion.name, domain, current, target
        );
        if let Some(hint) = &criterion.improvement_hint {
            text.push(' ');
            text.push_str(hint);
        }
        ImprovementSuggestion {
            model_name: model.to_string(),
            domain: domain.clone(),
            criterion_id: criterion.id.clone(),
            current_score: current,
            target_score: target,
            magnitude,
            baselined,
            priority: priority(magnitude, self.config.threshold_for(Some(criterion))),
            suggestion_text: text,
        }
    }
}
