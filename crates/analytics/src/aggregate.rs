//! Score aggregation and model rankings.

use std::collections::{BTreeMap, BTreeSet};
use evalqc_core::{
    AggregateScore, CriterionId, Domain, Evaluation, Subject, Time,
};
use evalqc_quality::{latest_per_pair, stats, Classification, Snapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::Result;

/// A model's place in a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRanking {
    /// AI model
    pub model: String,
    /// Unweighted mean of the ranked per-criterion means
    pub score: f64,
    /// Scores behind the ranking
    pub sample_count: usize,
}

/// Mean overall rating for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRating {
    /// Model or human
    pub subject: Subject,
    /// Mean of the 1-5 overall ratings
    pub mean_rating: f64,
    /// Evaluations counted
    pub sample_count: usize,
}

/// Relative window for comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Past week
    Last7Days,
    /// Past month
    #[default]
    Last30Days,
    /// Past quarter
    Last90Days,
    /// Past year
    LastYear,
    /// No lower bound
    AllTime,
}

impl Timeframe {
    /// Start of the window ending at `now`; `None` for all time.
    pub fn since(self, now: Time) -> Option<Time> {
        let days = match self {
            Timeframe::Last7Days => 7,
            Timeframe::Last30Days => 30,
            Timeframe::Last90Days => 90,
            Timeframe::LastYear => 365,
            Timeframe::AllTime => return None,
        };
        Some(now - chrono::Duration::days(days))
    }
}

impl std::str::FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "last_7_days" => Ok(Timeframe::Last7Days),
            "last_30_days" => Ok(Timeframe::Last30Days),
            "last_90_days" => Ok(Timeframe::Last90Days),
            "last_year" => Ok(Timeframe::LastYear),
            "all_time" => Ok(Timeframe::AllTime),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

/// What to compare.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonRequest {
    /// Models to include; empty means every model
    pub models: Vec<String>,
    /// Domains to include; empty means every domain
    pub domains: Vec<Domain>,
    /// Criteria to include; empty means every criterion
    pub criteria: Vec<CriterionId>,
    /// Window ending at `now`
    pub timeframe: Timeframe,
    /// Reference time for the window
    pub now: Option<Time>,
}

/// Side-by-side model comparison.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    /// Every aggregate row used
    pub scores: Vec<AggregateScore>,
    /// Models by the mean of their per-criterion means
    pub overall_ranking: Vec<ModelRanking>,
    /// Models ranked on each criterion
    pub criteria_rankings: BTreeMap<CriterionId, Vec<ModelRanking>>,
    /// Models ranked within each domain
    pub domain_rankings: BTreeMap<Domain, Vec<ModelRanking>>,
    /// Mean overall rating per subject
    pub overall_ratings: Vec<SubjectRating>,
    /// Evaluations that fed the comparison
    pub evaluations_analyzed: usize,
}

/// Turns trusted evaluations into per-criterion aggregates.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator;

impl ScoreAggregator {
    /// Create an aggregator.
    pub fn new() -> Self {
        Self
    }

    /// Trusted evaluations reduced to the latest per (evaluator, content).
    pub fn trusted_latest<'a>(
        &self,
        snapshot: &'a Snapshot,
        classification: &Classification,
    ) -> Vec<&'a Evaluation> {
        latest_per_pair(
            snapshot
                .evaluations()
                .iter()
                .filter(|e| classification.is_trusted(&e.id)),
        )
    }

    /// Aggregates for one domain, optionally for a single model.
    ///
    /// Human aggregates are always included so a model can be compared
    /// with its baseline. Fails on out-of-range or unknown-criterion scores.
    pub fn aggregate(
        &self,
        snapshot: &Snapshot,
        classification: &Classification,
        domain: &Domain,
        model: Option<&str>,
    ) -> Result<Vec<AggregateScore>> {
        let evaluations = self.trusted_latest(snapshot, classification);
        self.aggregate_evaluations(snapshot, &evaluations, |d, subject| {
            d == domain
                && match (model, subject) {
                    (Some(m), Subject::Model(name)) => name == m,
                    _ => true,
                }
        })
    }

    /// Aggregates for every domain present in the snapshot.
    pub fn aggregate_all(
        &self,
        snapshot: &Snapshot,
        classification: &Classification,
    ) -> Result<Vec<AggregateScore>> {
        let evaluations = self.trusted_latest(snapshot, classification);
        self.aggregate_evaluations(snapshot, &evaluations, |_, _| true)
    }

    /// Group `evaluations` by (subject, domain, criterion) and summarise.
    ///
    /// Rows are ordered by domain, subject (human first), then catalog order.
    pub fn aggregate_evaluations<F>(
        &self,
        snapshot: &Snapshot,
        evaluations: &[&Evaluation],
        include: F,
    ) -> Result<Vec<AggregateScore>>
    where
        F: Fn(&Domain, &Subject) -> bool,
    {
        let catalog = snapshot.catalog();
        let mut groups: BTreeMap<(Domain, Subject, usize, CriterionId), Vec<f64>> = BTreeMap::new();

        for evaluation in evaluations {
            let Some(content) = snapshot.content(&evaluation.content_id) else {
                warn!(
                    "Evaluation {} references unknown content {}; skipped",
                    evaluation.id, evaluation.content_id
                );
                continue;
            };
            let subject = Subject::of(content);
            if !include(&content.domain, &subject) {
                continue;
            }
            evaluation.validate(catalog, content)?;

            for (criterion, &score) in &evaluation.scores {
                groups
                    .entry((
                        content.domain.clone(),
                        subject.clone(),
                        catalog.position(criterion),
                        criterion.clone(),
                    ))
                    .or_default()
                    .push(f64::from(score));
            }
        }

        let rows: Vec<AggregateScore> = groups
            .into_iter()
            .filter_map(|((domain, subject, _, criterion_id), scores)| {
                Some(AggregateScore {
                    mean: stats::mean(&scores)?,
                    median: stats::median(&scores)?,
                    sample_count: scores.len(),
                    subject,
                    domain,
                    criterion_id,
                })
            })
            .collect();
        debug!("Aggregated {} evaluations into {} rows", evaluations.len(), rows.len());
        Ok(rows)
    }

    /// Rank the AI models in `scores`.
    ///
    /// Each model's score is the unweighted mean of its per-criterion means.
    /// Ties go to the larger sample count, then the smaller model name.
    pub fn rank(&self, scores: &[AggregateScore]) -> Vec<ModelRanking> {
        let mut per_model: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
        for row in scores {
            if let Subject::Model(name) = &row.subject {
                let entry = per_model.entry(name.as_str()).or_default();
                entry.0.push(row.mean);
                entry.1 += row.sample_count;
            }
        }
        let mut ranking: Vec<ModelRanking> = per_model
            .into_iter()
            .filter_map(|(model, (means, sample_count))| {
                Some(ModelRanking {
                    model: model.to_string(),
                    score: stats::mean(&means)?,
                    sample_count,
                })
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(b.sample_count.cmp(&a.sample_count))
                .then(a.model.cmp(&b.model))
        });
        ranking
    }

    /// Mean overall rating per subject over `evaluations`.
    pub fn overall_ratings(&self, snapshot: &Snapshot, evaluations: &[&Evaluation]) -> Vec<SubjectRating> {
        let mut by_subject: BTreeMap<Subject, Vec<f64>> = BTreeMap::new();
        for evaluation in evaluations {
            if let Some(content) = snapshot.content(&evaluation.content_id) {
                by_subject
                    .entry(Subject::of(content))
                    .or_default()
                    .push(f64::from(evaluation.overall_rating));
            }
        }
        by_subject
            .into_iter()
            .filter_map(|(subject, ratings)| {
                Some(SubjectRating {
                    mean_rating: stats::mean(&ratings)?,
                    sample_count: ratings.len(),
                    subject,
                })
            })
            .collect()
    }

    /// Compare models over a window, domain set and criterion set.
    pub fn compare(
        &self,
        snapshot: &Snapshot,
        classification: &Classification,
        request: &ComparisonRequest,
    ) -> Result<ModelComparison> {
        let since = request
            .now
            .and_then(|now| request.timeframe.since(now));
        let until = request.now;
        let models: BTreeSet<&str> = request.models.iter().map(String::as_str).collect();

        let evaluations: Vec<&Evaluation> = self
            .trusted_latest(snapshot, classification)
            .into_iter()
            .filter(|e| since.map_or(true, |t| e.submitted_at >= t))
            .filter(|e| until.map_or(true, |t| e.submitted_at <= t))
            .collect();

        let include = |domain: &Domain, subject: &Subject| {
            (request.domains.is_empty() || request.domains.contains(domain))
                && match subject {
                    Subject::Model(name) => models.is_empty() || models.contains(name.as_str()),
                    Subject::Human => false,
                }
        };

        let mut scores = self.aggregate_evaluations(snapshot, &evaluations, include)?;
        if !request.criteria.is_empty() {
            scores.retain(|row| request.criteria.contains(&row.criterion_id));
        }

        let compared: Vec<&Evaluation> = evaluations
            .iter()
            .copied()
            .filter(|e| {
                snapshot
                    .content(&e.content_id)
                    .is_some_and(|c| include(&c.domain, &Subject::of(c)))
            })
            .collect();

        // Each model's cross-domain mean per criterion, pooled over all its
        // scores on that criterion.
        let pooled = self.pool_across_domains(&scores);

        let mut criteria_rankings: BTreeMap<CriterionId, Vec<ModelRanking>> = BTreeMap::new();
        for row in &pooled {
            criteria_rankings.entry(row.criterion_id.clone()).or_default();
        }
        for (criterion, ranking) in criteria_rankings.iter_mut() {
            let rows: Vec<AggregateScore> = pooled
                .iter()
                .filter(|r| &r.criterion_id == criterion)
                .cloned()
                .collect();
            *ranking = self.rank(&rows);
        }

        let domains: BTreeSet<&Domain> = scores.iter().map(|r| &r.domain).collect();
        let domain_rankings = domains
            .into_iter()
            .map(|domain| {
                let rows: Vec<AggregateScore> =
                    scores.iter().filter(|r| &r.domain == domain).cloned().collect();
                (domain.clone(), self.rank(&rows))
            })
            .collect();

        Ok(ModelComparison {
            overall_ranking: self.rank(&pooled),
            criteria_rankings,
            domain_rankings,
            overall_ratings: self.overall_ratings(snapshot, &compared),
            evaluations_analyzed: compared.len(),
            scores,
        })
    }

    /// Collapse per-domain rows into one row per (subject, criterion),
    /// weighting each domain's mean by its sample count.
    fn pool_across_domains(&self, scores: &[AggregateScore]) -> Vec<AggregateScore> {
        let mut pooled: BTreeMap<(Subject, CriterionId), (f64, usize, Domain)> = BTreeMap::new();
        for row in scores {
            let entry = pooled
                .entry((row.subject.clone(), row.criterion_id.clone()))
                .or_insert((0.0, 0, row.domain.clone()));
            entry.0 += row.mean * row.sample_count as f64;
            entry.1 += row.sample_count;
        }
        pooled
            .into_iter()
            .map(|((subject, criterion_id), (sum, count, domain))| {
                let mean = sum / count as f64;
                AggregateScore {
                    subject,
                    domain,
                    criterion_id,
                    mean,
                    median: mean,
                    sample_count: count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use evalqc_core::{ContentItem, CriterionCatalog};
    use evalqc_quality::QualityFlagAggregator;

    fn scored(content: &ContentItem, evaluator: &str, coherence: i32) -> Evaluation {
        let scores = [
            (CriterionId::new("accuracy"), 2),
            (CriterionId::new("coherence"), coherence),
            (CriterionId::new("relevance"), 4),
        ];
        Evaluation::new(evaluator, content.id, scores, 3, 600)
    }

    fn classify(snapshot: &Snapshot) -> Classification {
        QualityFlagAggregator::new().classify_all(snapshot)
    }

    fn coherence<'a>(rows: &'a [AggregateScore], subject: &Subject) -> Option<&'a AggregateScore> {
        rows.iter()
            .find(|r| &r.subject == subject && r.criterion_id.as_str() == "coherence")
    }

    #[test]
    fn test_aggregate_mean_and_median() {
        let human = ContentItem::human(Domain::NewsArticles, "report");
        let ai = ContentItem::ai(Domain::NewsArticles, "model-x", "report");
        let evaluations = vec![
            scored(&human, "a", 4),
            scored(&human, "b", 5),
            scored(&human, "c", 4),
            scored(&ai, "a", 2),
            scored(&ai, "b", 3),
        ];
        let snapshot = Snapshot::new(
            vec![human, ai],
            CriterionCatalog::standard(),
            vec![],
            evaluations,
        );
        let rows = ScoreAggregator::new()
            .aggregate(&snapshot, &classify(&snapshot), &Domain::NewsArticles, None)
            .unwrap();

        let h = coherence(&rows, &Subject::Human).unwrap();
        assert!((h.mean - 13.0 / 3.0).abs() < 1e-9);
        assert_eq!(h.median, 4.0);
        assert_eq!(h.sample_count, 3);
        let m = coherence(&rows, &Subject::Model("model-x".into())).unwrap();
        assert_eq!(m.mean, 2.5);
        assert_eq!(m.median, 2.5);

        // Human rows first, then catalog order within a subject.
        assert_eq!(rows[0].subject, Subject::Human);
        assert_eq!(rows[0].criterion_id.as_str(), "accuracy");
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_aggregate_filters_model_and_domain() {
        let human = ContentItem::human(Domain::NewsArticles, "report");
        let x = ContentItem::ai(Domain::NewsArticles, "model-x", "report");
        let y = ContentItem::ai(Domain::NewsArticles, "model-y", "report");
        let other = ContentItem::ai(Domain::MarketingCopy, "model-x", "ad");
        let evaluations = vec![
            scored(&human, "a", 4),
            scored(&x, "a", 2),
            scored(&y, "a", 3),
            scored(&other, "a", 5),
        ];
        let snapshot = Snapshot::new(
            vec![human, x, y, other],
            CriterionCatalog::standard(),
            vec![],
            evaluations,
        );
        let rows = ScoreAggregator::new()
            .aggregate(&snapshot, &classify(&snapshot), &Domain::NewsArticles, Some("model-x"))
            .unwrap();

        assert!(rows.iter().all(|r| r.domain == Domain::NewsArticles));
        assert!(rows.iter().all(|r| r.subject != Subject::Model("model-y".into())));
        assert_eq!(coherence(&rows, &Subject::Model("model-x".into())).unwrap().mean, 2.0);
        assert!(coherence(&rows, &Subject::Human).is_some());
    }

    #[test]
    fn test_untrusted_and_superseded_are_excluded() {
        let human = ContentItem::human(Domain::NewsArticles, "report");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let first = scored(&human, "a", 1).at(t0);
        let resubmitted = first.supersede(
            [
                (CriterionId::new("accuracy"), 2),
                (CriterionId::new("coherence"), 5),
                (CriterionId::new("relevance"), 4),
            ],
            t0 + Duration::hours(1),
        );
        let straightlined = Evaluation::new(
            "b",
            human.id,
            [
                (CriterionId::new("accuracy"), 3),
                (CriterionId::new("coherence"), 3),
                (CriterionId::new("relevance"), 3),
            ],
            3,
            600,
        );
        let snapshot = Snapshot::new(
            vec![human],
            CriterionCatalog::standard(),
            vec![],
            vec![first, resubmitted, straightlined],
        );
        let rows = ScoreAggregator::new()
            .aggregate(&snapshot, &classify(&snapshot), &Domain::NewsArticles, None)
            .unwrap();

        let h = coherence(&rows, &Subject::Human).unwrap();
        assert_eq!(h.sample_count, 1);
        assert_eq!(h.mean, 5.0);
    }

    #[test]
    fn test_out_of_range_score_fails() {
        let human = ContentItem::human(Domain::NewsArticles, "report");
        let bad = scored(&human, "a", 9);
        let snapshot = Snapshot::new(vec![human], CriterionCatalog::standard(), vec![], vec![bad]);
        let err = ScoreAggregator::new()
            .aggregate(&snapshot, &classify(&snapshot), &Domain::NewsArticles, None)
            .unwrap_err();
        assert!(matches!(err, crate::AnalyticsError::Integrity(_)));
    }

    #[test]
    fn test_empty_snapshot_yields_no_rows() {
        let snapshot = Snapshot::default();
        let rows = ScoreAggregator::new()
            .aggregate(&snapshot, &classify(&snapshot), &Domain::NewsArticles, None)
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_rank_breaks_ties_by_samples_then_name() {
        let row = |model: &str, mean: f64, n: usize| AggregateScore {
            subject: Subject::Model(model.into()),
            domain: Domain::NewsArticles,
            criterion_id: CriterionId::new("coherence"),
            mean,
            median: mean,
            sample_count: n,
        };
        let ranking = ScoreAggregator::new().rank(&[
            row("b", 3.0, 4),
            row("a", 3.0, 4),
            row("c", 3.0, 9),
            row("d", 4.0, 1),
            AggregateScore {
                subject: Subject::Human,
                ..row("human", 5.0, 10)
            },
        ]);
        let order: Vec<&str> = ranking.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(order, ["d", "c", "a", "b"]);
    }

    #[test]
    fn test_timeframe() {
        let now = Utc.with_ymd_and_hms(2026, 6, 30, 0, 0, 0).unwrap();
        assert_eq!(Timeframe::Last7Days.since(now), Some(now - Duration::days(7)));
        assert_eq!(Timeframe::AllTime.since(now), None);
        assert_eq!("last_year".parse::<Timeframe>(), Ok(Timeframe::LastYear));
        assert!("fortnight".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_compare_respects_timeframe() {
        let now = Utc.with_ymd_and_hms(2026, 6, 30, 0, 0, 0).unwrap();
        let x = ContentItem::ai(Domain::NewsArticles, "model-x", "report");
        let y = ContentItem::ai(Domain::MarketingCopy, "model-y", "ad");
        let human = ContentItem::human(Domain::NewsArticles, "report");
        let evaluations = vec![
            scored(&x, "a", 4).at(now - Duration::days(2)),
            scored(&x, "b", 5).at(now - Duration::days(3)),
            scored(&y, "a", 2).at(now - Duration::days(60)),
            scored(&y, "b", 3).at(now - Duration::days(1)),
            scored(&human, "a", 5).at(now - Duration::days(1)),
        ];
        let snapshot = Snapshot::new(
            vec![x, y, human],
            CriterionCatalog::standard(),
            vec![],
            evaluations,
        );
        let request = ComparisonRequest {
            timeframe: Timeframe::Last30Days,
            now: Some(now),
            ..Default::default()
        };
        let comparison = ScoreAggregator::new()
            .compare(&snapshot, &classify(&snapshot), &request)
            .unwrap();

        assert_eq!(comparison.evaluations_analyzed, 3);
        assert!(comparison.scores.iter().all(|r| r.subject != Subject::Human));
        assert_eq!(comparison.overall_ranking[0].model, "model-x");
        assert_eq!(comparison.criteria_rankings[&CriterionId::new("coherence")][1].model, "model-y");
        assert_eq!(comparison.domain_rankings.len(), 2);
        assert_eq!(comparison.overall_ratings.len(), 2);
    }
}
