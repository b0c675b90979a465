//! Store-backed analytics service.

use std::sync::Arc;
use chrono::Utc;
use evalqc_core::{
    AggregateScore, ContentFilter, ContentId, Domain, EvaluationFilter, EvaluatorId, GapReport,
    ImprovementSuggestion, QualityFlag,
};
use evalqc_quality::{AgreementReport, EvaluatorReport, EvaluatorScope, PatternReport, Snapshot};
use evalqc_storage::EvaluationStore;
use tracing::{debug, info};

use crate::aggregate::{ComparisonRequest, ModelComparison};
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::report::{AnalyticsReport, QualitySummary, ReportKind, ReportSection};
use crate::{AnalyticsError, Result};

/// Loads a fresh snapshot from the store for every call and runs the
/// [`Engine`] over it. Nothing computed is kept.
pub struct AnalyticsService<S: EvaluationStore> {
    store: Arc<S>,
    engine: Engine,
}

impl<S: EvaluationStore> AnalyticsService<S> {
    /// Service with default thresholds.
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
            engine: Engine::new(),
        }
    }

    /// Replace the thresholds.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.engine = Engine::with_config(config);
        self
    }

    /// Load content, catalog, checks and the evaluations matching `filter`.
    pub async fn snapshot(&self, filter: &EvaluationFilter) -> Result<Snapshot> {
        let content = self.store.list_content(&ContentFilter::default()).await?;
        let catalog = self.store.catalog().await?;
        let checks = self.store.list_quality_checks(None).await?;
        let evaluations = self.store.list_evaluations(filter).await?;
        debug!(
            "Snapshot: {} content items, {} criteria, {} checks, {} evaluations",
            content.len(),
            catalog.len(),
            checks.len(),
            evaluations.len()
        );
        Ok(Snapshot::new(content, catalog, checks, evaluations))
    }

    async fn full_snapshot(&self) -> Result<Snapshot> {
        self.snapshot(&EvaluationFilter::default()).await
    }

    /// Every flag raised on any evaluation.
    pub async fn quality_flags(&self) -> Result<Vec<QualityFlag>> {
        Ok(self.quality_summary().await?.flags)
    }

    /// Trusted counts and flags.
    pub async fn quality_summary(&self) -> Result<QualitySummary> {
        let snapshot = self.full_snapshot().await?;
        self.engine.quality_summary(&snapshot)
    }

    /// Quality-issues report.
    pub async fn quality_report(&self) -> Result<AnalyticsReport> {
        let summary = self.quality_summary().await?;
        Ok(AnalyticsReport::new(ReportKind::Quality, "Evaluation quality issues", Utc::now())
            .with_section(ReportSection::Quality(summary)))
    }

    /// Reliability of one evaluator within `scope`.
    pub async fn evaluator_report(
        &self,
        evaluator: &EvaluatorId,
        scope: &EvaluatorScope,
    ) -> Result<EvaluatorReport> {
        let snapshot = self.full_snapshot().await?;
        self.engine.evaluator_report(evaluator, &snapshot, scope)
    }

    /// Scoring patterns of one evaluator within `scope`.
    pub async fn pattern_report(
        &self,
        evaluator: &EvaluatorId,
        scope: &EvaluatorScope,
    ) -> Result<PatternReport> {
        let snapshot = self.full_snapshot().await?;
        self.engine.pattern_report(evaluator, &snapshot, scope)
    }

    /// Agreement on one content item; `None` with fewer than two evaluators.
    pub async fn inter_rater_agreement(&self, content: &ContentId) -> Result<Option<AgreementReport>> {
        let filter = EvaluationFilter {
            content_ids: Some(vec![*content]),
            ..Default::default()
        };
        let snapshot = self.snapshot(&filter).await?;
        if snapshot.content(content).is_none() {
            return Err(AnalyticsError::NotFound(format!("content {content}")));
        }
        self.engine.agreement(content, &snapshot)
    }

    /// Aggregates for one domain, optionally one model.
    pub async fn aggregate(&self, domain: &Domain, model: Option<&str>) -> Result<Vec<AggregateScore>> {
        let snapshot = self.full_snapshot().await?;
        self.engine.aggregate(&snapshot, domain, model)
    }

    /// Model comparison; the window ends now unless the request fixes `now`.
    pub async fn model_comparison(&self, request: &ComparisonRequest) -> Result<ModelComparison> {
        let request = ComparisonRequest {
            now: Some(request.now.unwrap_or_else(Utc::now)),
            ..request.clone()
        };
        let snapshot = self.full_snapshot().await?;
        self.engine.compare(&snapshot, &request)
    }

    /// Model comparison report.
    pub async fn comparison_report(&self, request: &ComparisonRequest) -> Result<AnalyticsReport> {
        let comparison = self.model_comparison(request).await?;
        Ok(AnalyticsReport::new(ReportKind::Comparison, "Model comparison", Utc::now())
            .with_section(ReportSection::Comparison(comparison)))
    }

    /// Gap report over `domains` (every domain when empty).
    pub async fn gap_report(&self, domains: &[Domain]) -> Result<GapReport> {
        let snapshot = self.full_snapshot().await?;
        self.engine.gap_report(&snapshot, domains)
    }

    /// Gap analysis report over `domains` (every domain when empty).
    pub async fn gaps_report(&self, domains: &[Domain]) -> Result<AnalyticsReport> {
        let gaps = self.gap_report(domains).await?;
        Ok(AnalyticsReport::new(ReportKind::Gaps, "Human-AI gap analysis", Utc::now())
            .with_section(ReportSection::Gaps(gaps)))
    }

    /// Ranked suggestions, for one model or all, against the human baseline
    /// or the `benchmark` model.
    pub async fn suggestions(
        &self,
        model: Option<&str>,
        benchmark: Option<&str>,
    ) -> Result<Vec<ImprovementSuggestion>> {
        let snapshot = self.full_snapshot().await?;
        self.engine.suggestions(&snapshot, model, benchmark)
    }

    /// Improvement suggestions report.
    pub async fn suggestions_report(
        &self,
        model: Option<&str>,
        benchmark: Option<&str>,
    ) -> Result<AnalyticsReport> {
        let suggestions = self.suggestions(model, benchmark).await?;
        let title = match benchmark {
            Some(m) => format!("Improvement suggestions against {m}"),
            None => "Improvement suggestions".to_string(),
        };
        Ok(AnalyticsReport::new(ReportKind::Suggestions, title, Utc::now())
            .with_section(ReportSection::Suggestions { suggestions }))
    }

    /// Quality, aggregates, gaps and suggestions from a single snapshot.
    pub async fn full_report(&self) -> Result<AnalyticsReport> {
        let snapshot = self.full_snapshot().await?;
        let output = self.engine.run(&snapshot)?;
        info!("Full report: {} gap comparisons", output.gaps.entries().count());

        Ok(AnalyticsReport::new(ReportKind::Full, "Evaluation quality and analytics", Utc::now())
            .with_section(ReportSection::Quality(output.quality))
            .with_section(ReportSection::Aggregates { scores: output.scores })
            .with_section(ReportSection::Gaps(output.gaps))
            .with_section(ReportSection::Suggestions {
                suggestions: output.suggestions,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use evalqc_core::{
        AnswerPredicate, ContentItem, CriterionCatalog, CriterionId, Evaluation, FlagKind,
        Priority, QualityCheck, Subject,
    };
    use evalqc_storage::MemoryStore;

    fn scored(content: &ContentItem, evaluator: &str, coherence: i32) -> Evaluation {
        let scores = [
            (CriterionId::new("accuracy"), 3),
            (CriterionId::new("coherence"), coherence),
            (CriterionId::new("relevance"), 4),
        ];
        Evaluation::new(evaluator, content.id, scores, 4, 900)
    }

    async fn seeded() -> (MemoryStore, ContentItem, ContentItem) {
        let mut store = MemoryStore::with_criteria(CriterionCatalog::standard().iter().cloned());
        let human = ContentItem::human(Domain::CreativeWriting, "a short story");
        let ai = ContentItem::ai(Domain::CreativeWriting, "X", "another short story");
        store.save_content(&human).await.unwrap();
        store.save_content(&ai).await.unwrap();

        let t0 = Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap();
        for (i, (evaluator, h, a)) in [("e1", 4, 2), ("e2", 5, 3), ("e3", 4, 2)].into_iter().enumerate() {
            let at = t0 + Duration::minutes(i as i64);
            store.append_evaluation(&scored(&human, evaluator, h).at(at)).await.unwrap();
            store.append_evaluation(&scored(&ai, evaluator, a).at(at)).await.unwrap();
        }
        (store, human, ai)
    }

    fn lenient() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.analytics.min_sample_count = 3;
        config
    }

    #[tokio::test]
    async fn test_creative_writing_coherence_gap() {
        let (store, _, _) = seeded().await;
        let service = AnalyticsService::new(store).with_config(lenient());

        let gaps = service.gap_report(&[Domain::CreativeWriting]).await.unwrap();
        let entry = gaps
            .entry(&Domain::CreativeWriting, &CriterionId::new("coherence"), "X")
            .unwrap();
        assert!((entry.human_score - 13.0 / 3.0).abs() < 1e-9);
        assert!((entry.ai_score - 7.0 / 3.0).abs() < 1e-9);
        assert!((entry.gap + 2.0).abs() < 1e-9);
        assert!(entry.significant);

        let suggestions = service.suggestions(Some("X"), None).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].criterion_id.as_str(), "coherence");
        assert_eq!(suggestions[0].priority, Priority::High);
    }

    #[tokio::test]
    async fn test_default_min_samples_marks_insufficient() {
        let (store, _, _) = seeded().await;
        let service = AnalyticsService::new(store);

        let gaps = service.gap_report(&[]).await.unwrap();
        assert!(gaps.entries().all(|e| e.insufficient_data && !e.significant));

        // coherence still trails the human mean, just not significantly
        let suggestions = service.suggestions(None, None).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].criterion_id.as_str(), "coherence");
        assert!(suggestions[0].baselined);
        assert!((suggestions[0].target_score - 13.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_failed_attention_check_is_excluded() {
        let (mut store, _, _) = seeded().await;
        let report = ContentItem::human(Domain::NewsArticles, "a council meeting report");
        store.save_content(&report).await.unwrap();
        let check = QualityCheck::new(
            Some(Domain::NewsArticles),
            "Which city held the meeting?",
            AnswerPredicate::Exact { answer: "Leeds".into() },
        );
        store.save_quality_check(&check).await.unwrap();
        let careless = scored(&report, "e4", 1).with_answer(check.id, "York");
        let careful = scored(&report, "e5", 5).with_answer(check.id, " leeds ");
        store.append_evaluation(&careless).await.unwrap();
        store.append_evaluation(&careful).await.unwrap();

        let service = AnalyticsService::new(store);
        let flags = service.quality_flags().await.unwrap();
        assert!(flags
            .iter()
            .any(|f| f.evaluation_id == careless.id && f.kind == FlagKind::FailedAttentionCheck));
        assert!(flags
            .iter()
            .all(|f| f.kind != FlagKind::FailedAttentionCheck || f.evaluation_id == careless.id));

        let rows = service.aggregate(&Domain::NewsArticles, None).await.unwrap();
        let coherence = rows
            .iter()
            .find(|r| r.subject == Subject::Human && r.criterion_id.as_str() == "coherence")
            .unwrap();
        assert_eq!(coherence.sample_count, 1);
        assert_eq!(coherence.mean, 5.0);

        // Checks for news articles do not touch creative writing.
        let rows = service.aggregate(&Domain::CreativeWriting, None).await.unwrap();
        assert!(rows.iter().all(|r| r.sample_count == 3));
    }

    #[tokio::test]
    async fn test_recomputation_is_stable() {
        let (store, _, _) = seeded().await;
        let service = AnalyticsService::new(store);
        let first = service.aggregate(&Domain::CreativeWriting, None).await.unwrap();
        let second = service.aggregate(&Domain::CreativeWriting, None).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            service.gap_report(&[]).await.unwrap(),
            service.gap_report(&[]).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_point_in_time() {
        let (store, human, _) = seeded().await;
        let mut writer = store.clone();
        let service = AnalyticsService::new(store);

        let snapshot = service.snapshot(&EvaluationFilter::default()).await.unwrap();
        writer.append_evaluation(&scored(&human, "e9", 1)).await.unwrap();
        assert_eq!(snapshot.evaluations().len(), 6);
        let fresh = service.snapshot(&EvaluationFilter::default()).await.unwrap();
        assert_eq!(fresh.evaluations().len(), 7);
    }

    #[tokio::test]
    async fn test_agreement_and_unknown_content() {
        let (store, human, _) = seeded().await;
        let service = AnalyticsService::new(store);

        let report = service.inter_rater_agreement(&human.id).await.unwrap().unwrap();
        assert_eq!(report.evaluator_count, 3);

        let missing = service.inter_rater_agreement(&ContentId::new()).await;
        assert!(matches!(missing, Err(AnalyticsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_store_reports_nothing() {
        let store = MemoryStore::with_criteria(CriterionCatalog::standard().iter().cloned());
        let service = AnalyticsService::new(store);
        let report = service.full_report().await.unwrap();
        assert_eq!(report.kind, ReportKind::Full);
        assert_eq!(report.sections.len(), 4);
        assert!(service.suggestions(None, None).await.unwrap().is_empty());
        let comparison = service.model_comparison(&ComparisonRequest::default()).await.unwrap();
        assert!(comparison.overall_ranking.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_scale_scores_fail_every_operation() {
        let mut store = MemoryStore::with_criteria(CriterionCatalog::standard().iter().cloned());
        let story = ContentItem::human(Domain::CreativeWriting, "a short story");
        store.save_content(&story).await.unwrap();
        let rated = |evaluator: &str, values: [i32; 3], duration: u64| {
            let scores = [
                (CriterionId::new("accuracy"), values[0]),
                (CriterionId::new("coherence"), values[1]),
                (CriterionId::new("relevance"), values[2]),
            ];
            Evaluation::new(evaluator, story.id, scores, 4, duration)
        };
        store.append_evaluation(&rated("alice", [2, 4, 3], 600)).await.unwrap();
        store.append_evaluation(&rated("bob", [99, 97, 98], 1)).await.unwrap();

        let service = AnalyticsService::new(store);
        let integrity = |r: Result<()>| matches!(r, Err(AnalyticsError::Integrity(_)));
        let alice = EvaluatorId::new("alice");
        let scope = EvaluatorScope::default();

        assert!(integrity(service.aggregate(&Domain::CreativeWriting, None).await.map(drop)));
        assert!(integrity(service.evaluator_report(&alice, &scope).await.map(drop)));
        assert!(integrity(service.pattern_report(&alice, &scope).await.map(drop)));
        assert!(integrity(service.inter_rater_agreement(&story.id).await.map(drop)));
        assert!(integrity(service.quality_summary().await.map(drop)));
        assert!(integrity(service.gap_report(&[]).await.map(drop)));
        assert!(integrity(service.suggestions(None, None).await.map(drop)));
        assert!(integrity(service.full_report().await.map(drop)));
    }

    #[tokio::test]
    async fn test_typed_reports() {
        let (store, _, _) = seeded().await;
        let service = AnalyticsService::new(store).with_config(lenient());

        let quality = service.quality_report().await.unwrap();
        assert_eq!(quality.kind, ReportKind::Quality);
        assert!(matches!(
            quality.sections.as_slice(),
            [ReportSection::Quality(summary)] if summary.total_evaluations == 6
        ));

        let request = ComparisonRequest {
            timeframe: crate::aggregate::Timeframe::AllTime,
            ..Default::default()
        };
        let comparison = service.comparison_report(&request).await.unwrap();
        assert_eq!(comparison.kind, ReportKind::Comparison);
        assert!(matches!(comparison.sections.as_slice(), [ReportSection::Comparison(_)]));

        let gaps = service.gaps_report(&[Domain::CreativeWriting]).await.unwrap();
        assert_eq!(gaps.kind, ReportKind::Gaps);
        let [ReportSection::Gaps(report)] = gaps.sections.as_slice() else {
            panic!("expected one gaps section");
        };
        let summary = &report.domain_gaps[&Domain::CreativeWriting];
        assert_eq!(summary.best_model, "X");
        assert!((summary.gap + 2.0 / 3.0).abs() < 1e-9);

        let suggestions = service.suggestions_report(Some("X"), None).await.unwrap();
        assert_eq!(suggestions.kind, ReportKind::Suggestions);
        assert!(matches!(
            suggestions.sections.as_slice(),
            [ReportSection::Suggestions { suggestions }] if suggestions.len() == 1
        ));
        let against = service.suggestions_report(None, Some("X")).await.unwrap();
        assert_eq!(against.title, "Improvement suggestions against X");
    }
}
