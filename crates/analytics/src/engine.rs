//! The synchronous pipeline: trust, aggregate, compare, suggest.

use evalqc_core::{
    AggregateScore, ContentId, Domain, EvaluatorId, GapReport, ImprovementSuggestion, Subject,
};
use evalqc_quality::{
    AgreementReport, Classification, EvaluatorReport, EvaluatorScope, PatternReport,
    QualityFlagAggregator, Snapshot,
};
use tracing::info;

use crate::aggregate::{ComparisonRequest, ModelComparison, ScoreAggregator};
use crate::config::EngineConfig;
use crate::gap::GapAnalyzer;
use crate::report::QualitySummary;
use crate::suggest::SuggestionGenerator;
use crate::Result;

/// Runs every stage over a [`Snapshot`]. Holds no results between calls.
///
/// Each operation validates the whole snapshot before computing anything,
/// so one out-of-scale evaluation fails the call with
/// [`AnalyticsError::Integrity`](crate::AnalyticsError::Integrity).
#[derive(Debug, Clone, Default)]
pub struct Engine {
    quality: QualityFlagAggregator,
    aggregator: ScoreAggregator,
    gaps: GapAnalyzer,
    suggestions: SuggestionGenerator,
}

impl Engine {
    /// Engine with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with the given thresholds.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            quality: QualityFlagAggregator::new().with_config(config.quality),
            aggregator: ScoreAggregator::new(),
            gaps: GapAnalyzer::new().with_config(config.analytics.clone()),
            suggestions: SuggestionGenerator::new().with_config(config.analytics),
        }
    }

    /// Trust decision for every evaluation.
    pub fn classify(&self, snapshot: &Snapshot) -> Result<Classification> {
        snapshot.validate()?;
        Ok(self.quality.classify_all(snapshot))
    }

    /// Flags for the quality-issues view.
    pub fn quality_summary(&self, snapshot: &Snapshot) -> Result<QualitySummary> {
        let classification = self.classify(snapshot)?;
        Ok(summary(&classification))
    }

    /// Reliability of one evaluator.
    pub fn evaluator_report(
        &self,
        evaluator: &EvaluatorId,
        snapshot: &Snapshot,
        scope: &EvaluatorScope,
    ) -> Result<EvaluatorReport> {
        snapshot.validate()?;
        Ok(self.quality.analyzer().analyze_evaluator(evaluator, snapshot, scope))
    }

    /// Scoring patterns of one evaluator.
    pub fn pattern_report(
        &self,
        evaluator: &EvaluatorId,
        snapshot: &Snapshot,
        scope: &EvaluatorScope,
    ) -> Result<PatternReport> {
        snapshot.validate()?;
        Ok(self.quality.analyzer().pattern_report(evaluator, snapshot, scope))
    }

    /// Agreement between evaluators of one content item.
    pub fn agreement(
        &self,
        content: &ContentId,
        snapshot: &Snapshot,
    ) -> Result<Option<AgreementReport>> {
        snapshot.validate()?;
        Ok(self.quality.analyzer().agreement(content, snapshot))
    }

    /// Aggregates for one domain, optionally one model.
    pub fn aggregate(
        &self,
        snapshot: &Snapshot,
        domain: &Domain,
        model: Option<&str>,
    ) -> Result<Vec<AggregateScore>> {
        let classification = self.classify(snapshot)?;
        self.aggregator.aggregate(snapshot, &classification, domain, model)
    }

    /// Model comparison.
    pub fn compare(&self, snapshot: &Snapshot, request: &ComparisonRequest) -> Result<ModelComparison> {
        let classification = self.classify(snapshot)?;
        self.aggregator.compare(snapshot, &classification, request)
    }

    /// Aggregates for every domain, restricted to `domains` when non-empty.
    pub fn aggregate_all(&self, snapshot: &Snapshot, domains: &[Domain]) -> Result<Vec<AggregateScore>> {
        let classification = self.classify(snapshot)?;
        let mut scores = self.aggregator.aggregate_all(snapshot, &classification)?;
        if !domains.is_empty() {
            scores.retain(|r| domains.contains(&r.domain));
        }
        Ok(scores)
    }

    /// Gap report over `domains` (every domain when empty).
    pub fn gap_report(&self, snapshot: &Snapshot, domains: &[Domain]) -> Result<GapReport> {
        let scores = self.aggregate_all(snapshot, domains)?;
        Ok(self.gaps.analyze(&scores, snapshot.catalog()))
    }

    /// Ranked suggestions, for one model or all, measured against the
    /// human baseline or the `benchmark` model when given.
    pub fn suggestions(
        &self,
        snapshot: &Snapshot,
        model: Option<&str>,
        benchmark: Option<&str>,
    ) -> Result<Vec<ImprovementSuggestion>> {
        let scores = self.aggregate_all(snapshot, &[])?;
        let benchmark = benchmark.map_or(Subject::Human, |m| Subject::Model(m.to_string()));
        Ok(self.suggestions.generate(&scores, snapshot.catalog(), model, &benchmark))
    }

    /// Every stage from one classification.
    pub fn run(&self, snapshot: &Snapshot) -> Result<PipelineOutput> {
        let classification = self.classify(snapshot)?;
        let scores = self.aggregator.aggregate_all(snapshot, &classification)?;
        let gaps = self.gaps.analyze(&scores, snapshot.catalog());
        let suggestions = self.suggestions.generate(&scores, snapshot.catalog(), None, &Subject::Human);
        info!(
            "Pipeline: {}/{} evaluations trusted, {} aggregates, {} suggestions",
            classification.trusted_count(),
            classification.len(),
            scores.len(),
            suggestions.len()
        );
        Ok(PipelineOutput {
            quality: summary(&classification),
            scores,
            gaps,
            suggestions,
        })
    }
}

fn summary(classification: &Classification) -> QualitySummary {
    QualitySummary {
        total_evaluations: classification.len(),
        trusted_evaluations: classification.trusted_count(),
        flags: classification.flags(),
    }
}

/// Output of [`Engine::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Trust summary
    pub quality: QualitySummary,
    /// Aggregates for every domain
    pub scores: Vec<AggregateScore>,
    /// Gap analysis
    pub gaps: GapReport,
    /// Ranked suggestions
    pub suggestions: Vec<ImprovementSuggestion>,
}
