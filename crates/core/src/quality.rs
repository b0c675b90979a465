//! Attention checks and quality flags.

use serde::{Deserialize, Serialize};
use crate::id::{EvaluationId, EvaluatorId, QualityCheckId};
use crate::Domain;

/// An attention-check question used to validate evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    /// Unique identifier
    pub id: QualityCheckId,

    /// Domain the check belongs to; `None` means every domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,

    /// Question shown to the evaluator
    pub question: String,

    /// How the answer is judged
    pub predicate: AnswerPredicate,

    /// Inactive checks are ignored
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl QualityCheck {
    /// Create an active check.
    pub fn new(domain: Option<Domain>, question: impl Into<String>, predicate: AnswerPredicate) -> Self {
        Self {
            id: QualityCheckId::new(),
            domain,
            question: question.into(),
            predicate,
            active: true,
        }
    }

    /// Whether the check is asked for evaluations in `domain`.
    pub fn applies_to(&self, domain: &Domain) -> bool {
        self.active && self.domain.as_ref().map_or(true, |d| d == domain)
    }
}

/// Expected-answer predicate of a quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerPredicate {
    /// Answer equals the text (case-insensitive, trimmed)
    Exact {
        /// Expected answer
        answer: String,
    },
    /// Answer contains the text (case-insensitive)
    Contains {
        /// Required fragment
        text: String,
    },
    /// Answer parses as a number within `[min, max]`
    NumericRange {
        /// Lowest accepted value
        min: f64,
        /// Highest accepted value
        max: f64,
    },
    /// Answer matches a regular expression
    Pattern {
        /// Pattern searched for in the answer
        regex: String,
    },
}

/// Kinds of quality flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    /// At least one attention check failed
    FailedAttentionCheck,
    /// Identical scores across distinct criteria
    LowVarianceStraightlining,
    /// Completed faster than the domain minimum
    TooFast,
    /// Far from the peer consensus on the same content
    OutlierVsPeers,
}

impl FlagKind {
    /// Whether this kind excludes an evaluation from aggregation on its own.
    pub fn excludes(self) -> bool {
        !matches!(self, FlagKind::OutlierVsPeers)
    }

    /// Default severity for this kind.
    pub fn severity(self) -> Severity {
        match self {
            FlagKind::FailedAttentionCheck => Severity::Error,
            FlagKind::LowVarianceStraightlining | FlagKind::TooFast => Severity::Warning,
            FlagKind::OutlierVsPeers => Severity::Info,
        }
    }
}

impl std::fmt::Display for FlagKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FlagKind::FailedAttentionCheck => "failed_attention_check",
            FlagKind::LowVarianceStraightlining => "low_variance_straightlining",
            FlagKind::TooFast => "too_fast",
            FlagKind::OutlierVsPeers => "outlier_vs_peers",
        })
    }
}

/// Flag severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Recorded only
    Info,
    /// Excludes the evaluation
    Warning,
    /// Excludes the evaluation; the evaluator missed an attention check
    Error,
}

/// A derived quality flag raised on one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityFlag {
    /// Flagged evaluation
    pub evaluation_id: EvaluationId,

    /// Who submitted it
    pub evaluator_id: EvaluatorId,

    /// What was detected
    pub kind: FlagKind,

    /// How serious
    pub severity: Severity,

    /// Human-readable detail for the admin view
    pub detail: String,
}

impl QualityFlag {
    /// Create a flag with the kind's default severity.
    pub fn new(
        evaluation_id: EvaluationId,
        evaluator_id: EvaluatorId,
        kind: FlagKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            evaluation_id,
            evaluator_id,
            kind,
            severity: kind.severity(),
            detail: detail.into(),
        }
    }
}
