//! Trust classification.
//!
//! Hard exclusion only for mechanical or attention failures; disagreement
//! with peers is recorded but never excludes an evaluation on its own.

use std::collections::BTreeMap;
use evalqc_core::{Evaluation, EvaluationId, FlagKind, QualityFlag};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attention::{AttentionResult, AttentionValidator};
use crate::config::QualityConfig;
use crate::consistency::ConsistencyAnalyzer;
use crate::snapshot::Snapshot;

/// Trust verdict for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustDecision {
    /// Classified evaluation
    pub evaluation_id: EvaluationId,
    /// Included in aggregates
    pub trusted: bool,
    /// Every flag raised, excluding or not
    pub flags: Vec<QualityFlag>,
}

/// Trust decisions for every evaluation in a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    decisions: BTreeMap<EvaluationId, TrustDecision>,
}

impl Classification {
    /// Whether `id` was classified as trusted. Unknown ids are untrusted.
    pub fn is_trusted(&self, id: &EvaluationId) -> bool {
        self.decisions.get(id).is_some_and(|d| d.trusted)
    }

    /// Decision for one evaluation.
    pub fn decision(&self, id: &EvaluationId) -> Option<&TrustDecision> {
        self.decisions.get(id)
    }

    /// All decisions, by evaluation id.
    pub fn decisions(&self) -> impl Iterator<Item = &TrustDecision> {
        self.decisions.values()
    }

    /// Every flag, ordered by evaluation id then kind.
    pub fn flags(&self) -> Vec<QualityFlag> {
        let mut flags: Vec<QualityFlag> = self
            .decisions
            .values()
            .flat_map(|d| d.flags.iter().cloned())
            .collect();
        flags.sort_by(|a, b| a.evaluation_id.cmp(&b.evaluation_id).then(a.kind.cmp(&b.kind)));
        flags
    }

    /// Number of trusted evaluations.
    pub fn trusted_count(&self) -> usize {
        self.decisions.values().filter(|d| d.trusted).count()
    }

    /// Number of classified evaluations.
    pub fn len(&self) -> usize {
        self.decisions.len()
    }

    /// Whether nothing was classified.
    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Combines attention-check results and consistency flags into trust
/// decisions.
#[derive(Debug, Clone, Default)]
pub struct QualityFlagAggregator {
    validator: AttentionValidator,
    analyzer: ConsistencyAnalyzer,
}

impl QualityFlagAggregator {
    /// Create an aggregator with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: QualityConfig) -> Self {
        self.analyzer = self.analyzer.with_config(config);
        self
    }

    /// The consistency analyzer in use.
    pub fn analyzer(&self) -> &ConsistencyAnalyzer {
        &self.analyzer
    }

    /// Combine one evaluation's signals.
    ///
    /// Trusted iff the attention checks passed and no excluding flag
    /// (straightlining, too fast) was raised.
    pub fn decide(
        &self,
        evaluation: &Evaluation,
        attention: &AttentionResult,
        mut flags: Vec<QualityFlag>,
    ) -> TrustDecision {
        if !attention.passed {
            flags.insert(
                0,
                QualityFlag::new(
                    evaluation.id,
                    evaluation.evaluator_id.clone(),
                    FlagKind::FailedAttentionCheck,
                    format!("{} attention check(s) failed", attention.failed_checks.len()),
                ),
            );
        }
        let trusted = attention.passed && !flags.iter().any(|f| f.kind.excludes());
        TrustDecision {
            evaluation_id: evaluation.id,
            trusted,
            flags,
        }
    }

    /// Validate and analyse one evaluation in the context of `snapshot`.
    ///
    /// Evaluations of content missing from the snapshot are checked against
    /// general attention checks only.
    pub fn classify(&self, evaluation: &Evaluation, snapshot: &Snapshot) -> TrustDecision {
        let attention = match snapshot.content(&evaluation.content_id) {
            Some(content) => self
                .validator
                .validate(evaluation, snapshot.checks_for(&content.domain)),
            None => self.validator.validate(evaluation, snapshot.general_checks()),
        };
        let flags = self.analyzer.evaluation_flags(evaluation, snapshot);
        let decision = self.decide(evaluation, &attention, flags);
        debug!(
            "Evaluation {} trusted={} flags={}",
            evaluation.id,
            decision.trusted,
            decision.flags.len()
        );
        decision
    }

    /// Classify every evaluation in `snapshot`.
    ///
    /// Scores are compared with peers as given; run [`Snapshot::validate`]
    /// first.
    pub fn classify_all(&self, snapshot: &Snapshot) -> Classification {
        let decisions: BTreeMap<EvaluationId, TrustDecision> = snapshot
            .evaluations()
            .iter()
            .map(|e| (e.id, self.classify(e, snapshot)))
            .collect();
        let classification = Classification { decisions };
        info!(
            "Classified {} evaluations, {} trusted",
            classification.len(),
            classification.trusted_count()
        );
        classification
    }
}
