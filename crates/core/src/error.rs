//! Data-integrity errors.

use crate::{ContentId, CriterionId, EvaluationId};

/// Raised when stored records violate the data model's invariants.
///
/// The ingestion layer is expected to reject such records; the engine fails
/// fast instead of clamping when it still meets one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    /// Score references a criterion not valid for the content's domain
    #[error("evaluation {evaluation}: criterion '{criterion}' is not defined for domain {domain}")]
    UnknownCriterion {
        /// Offending evaluation
        evaluation: EvaluationId,
        /// Referenced criterion
        criterion: CriterionId,
        /// Domain of the evaluated content
        domain: String,
    },

    /// Score outside the criterion's declared scale
    #[error("evaluation {evaluation}: score {score} for '{criterion}' outside [{min}, {max}]")]
    ScoreOutOfRange {
        /// Offending evaluation
        evaluation: EvaluationId,
        /// Criterion scored
        criterion: CriterionId,
        /// The score given
        score: i32,
        /// Scale minimum
        min: i32,
        /// Scale maximum
        max: i32,
    },

    /// Overall rating outside [1, 5]
    #[error("evaluation {evaluation}: overall rating {rating} outside [1, 5]")]
    RatingOutOfRange {
        /// Offending evaluation
        evaluation: EvaluationId,
        /// The rating given
        rating: u8,
    },

    /// Evaluation points at different content than the one supplied
    #[error("evaluation {evaluation} refers to content {expected}, got {actual}")]
    ContentMismatch {
        /// Offending evaluation
        evaluation: EvaluationId,
        /// Content the evaluation refers to
        expected: ContentId,
        /// Content supplied for validation
        actual: ContentId,
    },

    /// Criterion declared with scale_min >= scale_max
    #[error("criterion '{criterion}' has an empty scale [{min}, {max}]")]
    InvalidScale {
        /// Criterion id
        criterion: CriterionId,
        /// Declared minimum
        min: i32,
        /// Declared maximum
        max: i32,
    },

    /// Two criteria share an id
    #[error("criterion '{0}' is declared twice")]
    DuplicateCriterion(CriterionId),

    /// AI content without a model name, or human content with one
    #[error("content {0}: model name must be present iff the source is AI")]
    ModelNameMismatch(ContentId),
}
