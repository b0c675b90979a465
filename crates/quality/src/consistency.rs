//! Evaluator consistency analysis.
//!
//! Per-evaluation signals (straightlining, speed, peer distance) and the
//! evaluator-level summaries built from them: reliability, response
//! patterns, and inter-rater agreement on a content item.

use std::collections::{BTreeMap, BTreeSet};
use evalqc_core::{
    ContentId, ContentItem, CriterionCatalog, CriterionId, Domain, Evaluation, EvaluationId,
    EvaluatorId, FlagKind, QualityFlag, Time,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::QualityConfig;
use crate::snapshot::Snapshot;
use crate::stats;

/// Width of the 1-5 scale that peer distances are expressed on.
const REFERENCE_RANGE: f64 = 4.0;

/// Restricts an evaluator's history to a domain and/or time window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluatorScope {
    /// Only evaluations of content in this domain
    pub domain: Option<Domain>,
    /// Submitted at or after
    pub since: Option<Time>,
    /// Submitted at or before
    pub until: Option<Time>,
}

impl EvaluatorScope {
    fn includes(&self, evaluation: &Evaluation, content: Option<&ContentItem>) -> bool {
        if let Some(domain) = &self.domain {
            if content.map(|c| &c.domain) != Some(domain) {
                return false;
            }
        }
        self.since.map_or(true, |t| evaluation.submitted_at >= t)
            && self.until.map_or(true, |t| evaluation.submitted_at <= t)
    }
}

/// Reliability summary for one evaluator. Advisory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorReport {
    /// Evaluator analysed
    pub evaluator_id: EvaluatorId,
    /// Evaluations in scope
    pub evaluation_count: usize,
    /// `1 - flagged / total`; 1.0 when nothing is in scope
    pub reliability: f64,
    /// Evaluations with at least one flag, in submission order
    pub flagged_evaluations: Vec<EvaluationId>,
    /// Every flag raised
    pub flags: Vec<QualityFlag>,
    /// Mean distance to the peer consensus over peer-compared evaluations
    pub mean_peer_distance: Option<f64>,
    /// Evaluations that had at least one peer to compare against
    pub peer_compared: usize,
    /// Consistently far from peers across enough items
    pub persistent_outlier: bool,
    /// Agreement with their own earlier submissions on the same content
    pub internal_consistency: Option<f64>,
}

/// Response-pattern summary for one evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Evaluator analysed
    pub evaluator_id: EvaluatorId,
    /// Evaluations considered
    pub total_evaluations: usize,
    /// Evaluations flagged as straightlined
    pub straight_line_count: usize,
    /// Straightlined share, in percent
    pub straight_line_percentage: f64,
    /// Variance of the evaluator's scores per criterion (criteria with ≥ 2 scores)
    pub criterion_variance: BTreeMap<CriterionId, f64>,
    /// Criteria whose variance is below the configured floor
    pub low_variance_criteria: Vec<CriterionId>,
    /// Variance of completion durations
    pub duration_variance: Option<f64>,
    /// Low-variance criteria exist, or straightlining exceeds the configured share
    pub suspicious: bool,
}

/// How closely evaluators agree on one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    /// Content analysed
    pub content_id: ContentId,
    /// Evaluators with a submission on it
    pub evaluator_count: usize,
    /// `max(0, 1 - σ / range)` per criterion
    pub by_criterion: BTreeMap<CriterionId, f64>,
    /// Mean over criteria
    pub overall: f64,
    /// `overall` reaches the configured threshold
    pub meets_threshold: bool,
}

/// Computes consistency signals for evaluations and evaluators.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyAnalyzer {
    config: QualityConfig,
}

impl ConsistencyAnalyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: QualityConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Flag an evaluation whose per-criterion scores barely vary.
    pub fn straightlining(&self, evaluation: &Evaluation) -> Option<QualityFlag> {
        if evaluation.scores.len() < self.config.straightline_min_criteria {
            return None;
        }
        let spread = stats::std_dev(&stats::as_f64(evaluation.scores.values()))?;
        (spread < self.config.straightline_std_floor).then(|| {
            QualityFlag::new(
                evaluation.id,
                evaluation.evaluator_id.clone(),
                FlagKind::LowVarianceStraightlining,
                format!(
                    "{} criteria scored with standard deviation {:.2}",
                    evaluation.scores.len(),
                    spread
                ),
            )
        })
    }

    /// Flag an evaluation completed faster than `content` allows.
    pub fn too_fast(&self, evaluation: &Evaluation, content: &ContentItem) -> Option<QualityFlag> {
        let min = self.config.min_duration(content);
        ((evaluation.duration_secs as f64) < min).then(|| {
            QualityFlag::new(
                evaluation.id,
                evaluation.evaluator_id.clone(),
                FlagKind::TooFast,
                format!("completed in {}s, minimum {:.0}s", evaluation.duration_secs, min),
            )
        })
    }

    /// Mean absolute difference between `evaluation` and the peer mean over
    /// shared criteria, on the 1-5 reference scale.
    ///
    /// `None` when there are no peers or no shared criteria.
    pub fn peer_distance(
        &self,
        evaluation: &Evaluation,
        peers: &[&Evaluation],
        catalog: &CriterionCatalog,
    ) -> Option<f64> {
        let diffs: Vec<f64> = evaluation
            .scores
            .iter()
            .filter_map(|(criterion_id, &score)| {
                let criterion = catalog.get(criterion_id)?;
                let peer_scores: Vec<f64> = peers
                    .iter()
                    .filter_map(|p| p.scores.get(criterion_id))
                    .map(|&s| f64::from(s))
                    .collect();
                let peer_mean = stats::mean(&peer_scores)?;
                Some((f64::from(score) - peer_mean).abs() * REFERENCE_RANGE / criterion.range())
            })
            .collect();
        stats::mean(&diffs)
    }

    /// Flag an evaluation far from its peers' consensus.
    pub fn outlier(
        &self,
        evaluation: &Evaluation,
        peers: &[&Evaluation],
        catalog: &CriterionCatalog,
    ) -> Option<QualityFlag> {
        let distance = self.peer_distance(evaluation, peers, catalog)?;
        self.outlier_flag(evaluation, distance, peers.len())
    }

    fn outlier_flag(&self, evaluation: &Evaluation, distance: f64, peers: usize) -> Option<QualityFlag> {
        (distance > self.config.peer_distance_threshold).then(|| {
            QualityFlag::new(
                evaluation.id,
                evaluation.evaluator_id.clone(),
                FlagKind::OutlierVsPeers,
                format!("distance {:.2} from the mean of {} peers", distance, peers),
            )
        })
    }

    /// Every consistency flag for one evaluation in `snapshot`.
    ///
    /// Evaluations of unknown content only get the straightlining check.
    pub fn evaluation_flags(&self, evaluation: &Evaluation, snapshot: &Snapshot) -> Vec<QualityFlag> {
        self.flags_with_distance(evaluation, snapshot).0
    }

    /// Flags plus the peer distance they were derived from.
    fn flags_with_distance(
        &self,
        evaluation: &Evaluation,
        snapshot: &Snapshot,
    ) -> (Vec<QualityFlag>, Option<f64>) {
        let mut flags = Vec::new();
        flags.extend(self.straightlining(evaluation));
        if let Some(content) = snapshot.content(&evaluation.content_id) {
            flags.extend(self.too_fast(evaluation, content));
        }
        let peers = snapshot.peers_of(evaluation);
        let distance = self.peer_distance(evaluation, &peers, snapshot.catalog());
        if let Some(d) = distance {
            flags.extend(self.outlier_flag(evaluation, d, peers.len()));
        }
        (flags, distance)
    }

    /// Reliability report for `evaluator` over the scoped part of their history.
    pub fn analyze_evaluator(
        &self,
        evaluator: &EvaluatorId,
        snapshot: &Snapshot,
        scope: &EvaluatorScope,
    ) -> EvaluatorReport {
        let history = self.scoped_history(evaluator, snapshot, scope);

        let mut flags = Vec::new();
        let mut flagged_evaluations = Vec::new();
        let mut distances = Vec::new();
        let mut outlying = 0usize;

        for evaluation in &history {
            let (raised, distance) = self.flags_with_distance(evaluation, snapshot);
            if let Some(distance) = distance {
                distances.push(distance);
                if distance > self.config.peer_distance_threshold {
                    outlying += 1;
                }
            }
            if !raised.is_empty() {
                flagged_evaluations.push(evaluation.id);
                flags.extend(raised);
            }
        }

        let evaluation_count = history.len();
        let reliability = if evaluation_count == 0 {
            1.0
        } else {
            1.0 - flagged_evaluations.len() as f64 / evaluation_count as f64
        };
        let peer_compared = distances.len();
        let persistent_outlier = peer_compared >= self.config.persistent_outlier_min_items
            && outlying as f64 / peer_compared as f64 >= self.config.persistent_outlier_rate;

        debug!(
            "Evaluator {}: {} evaluations, reliability {:.2}, {} peer-compared",
            evaluator, evaluation_count, reliability, peer_compared
        );

        EvaluatorReport {
            evaluator_id: evaluator.clone(),
            evaluation_count,
            reliability,
            flagged_evaluations,
            flags,
            mean_peer_distance: stats::mean(&distances),
            peer_compared,
            persistent_outlier,
            internal_consistency: self.internal_consistency(&history, snapshot.catalog()),
        }
    }

    /// Response-pattern report for `evaluator` over the scoped history.
    pub fn pattern_report(
        &self,
        evaluator: &EvaluatorId,
        snapshot: &Snapshot,
        scope: &EvaluatorScope,
    ) -> PatternReport {
        let history = self.scoped_history(evaluator, snapshot, scope);

        let mut by_criterion: BTreeMap<CriterionId, Vec<f64>> = BTreeMap::new();
        for evaluation in &history {
            for (criterion, &score) in &evaluation.scores {
                by_criterion.entry(criterion.clone()).or_default().push(f64::from(score));
            }
        }
        let criterion_variance: BTreeMap<CriterionId, f64> = by_criterion
            .into_iter()
            .filter(|(_, scores)| scores.len() >= 2)
            .filter_map(|(criterion, scores)| Some((criterion, stats::variance(&scores)?)))
            .collect();
        let low_variance_criteria: Vec<CriterionId> = criterion_variance
            .iter()
            .filter(|(_, v)| **v < self.config.pattern_variance_floor)
            .map(|(c, _)| c.clone())
            .collect();

        let straight_line_count = history
            .iter()
            .filter(|e| self.straightlining(e).is_some())
            .count();
        let total_evaluations = history.len();
        let share = if total_evaluations == 0 {
            0.0
        } else {
            straight_line_count as f64 / total_evaluations as f64
        };

        let durations: Vec<f64> = history.iter().map(|e| e.duration_secs as f64).collect();
        let duration_variance = if durations.len() > 1 {
            stats::variance(&durations)
        } else {
            None
        };

        PatternReport {
            evaluator_id: evaluator.clone(),
            total_evaluations,
            straight_line_count,
            straight_line_percentage: (share * 1000.0).round() / 10.0,
            suspicious: !low_variance_criteria.is_empty()
                || share > self.config.pattern_straightline_share,
            criterion_variance,
            low_variance_criteria,
            duration_variance,
        }
    }

    /// Inter-rater agreement on `content`, using each evaluator's latest
    /// submission. `None` with fewer than two evaluators.
    pub fn agreement(&self, content: &ContentId, snapshot: &Snapshot) -> Option<AgreementReport> {
        let latest = snapshot.latest_on(content);
        if latest.len() < 2 {
            return None;
        }

        let mut by_criterion: BTreeMap<&CriterionId, Vec<f64>> = BTreeMap::new();
        for evaluation in &latest {
            for (criterion, &score) in &evaluation.scores {
                by_criterion.entry(criterion).or_default().push(f64::from(score));
            }
        }

        let agreement: BTreeMap<CriterionId, f64> = by_criterion
            .into_iter()
            .filter(|(_, scores)| scores.len() >= 2)
            .filter_map(|(id, scores)| {
                let criterion = snapshot.catalog().get(id)?;
                let spread = stats::std_dev(&scores)?;
                Some((id.clone(), (1.0 - spread / criterion.range()).max(0.0)))
            })
            .collect();

        let overall = stats::mean(&agreement.values().copied().collect::<Vec<_>>()).unwrap_or(0.0);
        Some(AgreementReport {
            content_id: *content,
            evaluator_count: latest.len(),
            meets_threshold: overall >= self.config.agreement_threshold,
            by_criterion: agreement,
            overall,
        })
    }

    fn scoped_history<'a>(
        &self,
        evaluator: &'a EvaluatorId,
        snapshot: &'a Snapshot,
        scope: &EvaluatorScope,
    ) -> Vec<&'a Evaluation> {
        snapshot
            .history_of(evaluator)
            .filter(|e| scope.includes(e, snapshot.content(&e.content_id)))
            .collect()
    }

    /// `1 - mean |Δ| / range` between consecutive submissions on the same
    /// content, over shared criteria.
    fn internal_consistency(&self, history: &[&Evaluation], catalog: &CriterionCatalog) -> Option<f64> {
        let contents: BTreeSet<ContentId> = history.iter().map(|e| e.content_id).collect();
        let mut deltas = Vec::new();
        for content in contents {
            let submissions: Vec<&Evaluation> = history
                .iter()
                .copied()
                .filter(|e| e.content_id == content)
                .collect();
            for pair in submissions.windows(2) {
                for (criterion_id, &before) in &pair[0].scores {
                    let (Some(&after), Some(criterion)) =
                        (pair[1].scores.get(criterion_id), catalog.get(criterion_id))
                    else {
                        continue;
                    };
                    deltas.push((f64::from(after) - f64::from(before)).abs() / criterion.range());
                }
            }
        }
        stats::mean(&deltas).map(|d| (1.0 - d).clamp(0.0, 1.0))
    }
}
