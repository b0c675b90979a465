//! Attention-check validation.

use evalqc_core::{AnswerPredicate, Evaluation, EvaluationId, QualityCheck, QualityCheckId};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Outcome of validating one evaluation's attention-check answers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttentionResult {
    /// Validated evaluation
    pub evaluation_id: EvaluationId,
    /// True iff every applicable check passed
    pub passed: bool,
    /// Checks that failed, in check order
    pub failed_checks: Vec<QualityCheckId>,
}

/// Applies quality-check predicates to an evaluation's answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttentionValidator;

impl AttentionValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Validate `evaluation` against its domain's check set.
    ///
    /// An empty set passes vacuously. Inactive checks are skipped. A
    /// missing answer fails its check.
    pub fn validate<'a>(
        &self,
        evaluation: &Evaluation,
        checks: impl IntoIterator<Item = &'a QualityCheck>,
    ) -> AttentionResult {
        let failed_checks: Vec<QualityCheckId> = checks
            .into_iter()
            .filter(|c| c.active)
            .filter(|c| {
                let answer = evaluation.check_answers.get(&c.id);
                !answer.is_some_and(|a| self.accepts(&c.predicate, a))
            })
            .map(|c| c.id)
            .collect();

        AttentionResult {
            evaluation_id: evaluation.id,
            passed: failed_checks.is_empty(),
            failed_checks,
        }
    }

    /// Whether `answer` satisfies `predicate`.
    pub fn accepts(&self, predicate: &AnswerPredicate, answer: &str) -> bool {
        let answer = answer.trim();
        match predicate {
            AnswerPredicate::Exact { answer: expected } => {
                answer.to_lowercase() == expected.trim().to_lowercase()
            }
            AnswerPredicate::Contains { text } => {
                answer.to_lowercase().contains(&text.to_lowercase())
            }
            AnswerPredicate::NumericRange { min, max } => answer
                .parse::<f64>()
                .is_ok_and(|v| (*min..=*max).contains(&v)),
            AnswerPredicate::Pattern { regex } => match Regex::new(regex) {
                Ok(re) => re.is_match(answer),
                Err(e) => {
                    warn!("Invalid attention-check pattern '{}': {}", regex, e);
                    false
                }
            },
        }
    }
}
