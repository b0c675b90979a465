//! Evaluations submitted by human experts.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::id::{ContentId, CriterionId, EvaluationId, EvaluatorId, QualityCheckId};
use crate::{ContentItem, CriterionCatalog, IntegrityError, Time};

/// Lowest allowed overall rating.
pub const OVERALL_RATING_MIN: u8 = 1;
/// Highest allowed overall rating.
pub const OVERALL_RATING_MAX: u8 = 5;

/// One evaluator's judgement of one content item.
///
/// Append-only: a correction is a new evaluation with a later
/// `submitted_at`, never an edit of an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Unique identifier
    pub id: EvaluationId,

    /// Who submitted it
    pub evaluator_id: EvaluatorId,

    /// What was evaluated
    pub content_id: ContentId,

    /// Submission time
    pub submitted_at: Time,

    /// Per-criterion scores
    pub scores: BTreeMap<CriterionId, i32>,

    /// Overall rating, 1-5
    pub overall_rating: u8,

    /// Free-text comment
    #[serde(default)]
    pub comment: String,

    /// Answers to attention-check questions
    #[serde(default)]
    pub check_answers: BTreeMap<QualityCheckId, String>,

    /// Time spent on the form, in seconds
    pub duration_secs: u64,
}

impl Evaluation {
    /// Create an evaluation submitted now.
    pub fn new(
        evaluator_id: impl Into<EvaluatorId>,
        content_id: ContentId,
        scores: impl IntoIterator<Item = (CriterionId, i32)>,
        overall_rating: u8,
        duration_secs: u64,
    ) -> Self {
        Self {
            id: EvaluationId::new(),
            evaluator_id: evaluator_id.into(),
            content_id,
            submitted_at: chrono::Utc::now(),
            scores: scores.into_iter().collect(),
            overall_rating,
            comment: String::new(),
            check_answers: BTreeMap::new(),
            duration_secs,
        }
    }

    /// Set submission time.
    pub fn at(mut self, submitted_at: Time) -> Self {
        self.submitted_at = submitted_at;
        self
    }

    /// Record an attention-check answer.
    pub fn with_answer(mut self, check: QualityCheckId, answer: impl Into<String>) -> Self {
        self.check_answers.insert(check, answer.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// A correction of this evaluation: same evaluator and content, new id,
    /// new scores, submitted at `submitted_at`.
    pub fn supersede(
        &self,
        scores: impl IntoIterator<Item = (CriterionId, i32)>,
        submitted_at: Time,
    ) -> Self {
        Self {
            id: EvaluationId::new(),
            submitted_at,
            scores: scores.into_iter().collect(),
            ..self.clone()
        }
    }

    /// Check scores and rating against the catalog for `content`'s domain.
    pub fn validate(&self, catalog: &CriterionCatalog, content: &ContentItem) -> Result<(), IntegrityError> {
        if self.content_id != content.id {
            return Err(IntegrityError::ContentMismatch {
                evaluation: self.id,
                expected: self.content_id,
                actual: content.id,
            });
        }
        if !(OVERALL_RATING_MIN..=OVERALL_RATING_MAX).contains(&self.overall_rating) {
            return Err(IntegrityError::RatingOutOfRange {
                evaluation: self.id,
                rating: self.overall_rating,
            });
        }
        for (criterion_id, &score) in &self.scores {
            let criterion = catalog.lookup(&content.domain, criterion_id).ok_or_else(|| {
                IntegrityError::UnknownCriterion {
                    evaluation: self.id,
                    criterion: criterion_id.clone(),
                    domain: content.domain.to_string(),
                }
            })?;
            if !criterion.contains(score) {
                return Err(IntegrityError::ScoreOutOfRange {
                    evaluation: self.id,
                    criterion: criterion_id.clone(),
                    score,
                    min: criterion.scale_min,
                    max: criterion.scale_max,
                });
            }
        }
        Ok(())
    }
}

/// Filter for listing evaluations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationFilter {
    /// Only this evaluator's submissions
    pub evaluator: Option<EvaluatorId>,

    /// Only evaluations of these content items
    pub content_ids: Option<Vec<ContentId>>,

    /// Submitted at or after
    pub since: Option<Time>,

    /// Submitted at or before
    pub until: Option<Time>,
}

impl EvaluationFilter {
    /// Whether `evaluation` passes the filter.
    pub fn matches(&self, evaluation: &Evaluation) -> bool {
        if let Some(evaluator) = &self.evaluator {
            if &evaluation.evaluator_id != evaluator {
                return false;
            }
        }
        if let Some(ids) = &self.content_ids {
            if !ids.contains(&evaluation.content_id) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if evaluation.submitted_at < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if evaluation.submitted_at > until {
                return false;
            }
        }
        true
    }
}
