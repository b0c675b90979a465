//! Evaluation quality-control data models.
//!
//! Content, criteria, evaluations and attention checks as read from the
//! evaluation store, plus the derived records the engine emits.

#![warn(missing_docs)]

// Core identities
mod id;
mod error;

// Inputs
mod domain;
mod content;
mod criterion;
mod evaluation;
mod quality;

// Derived outputs
mod aggregate;

// Re-exports
pub use id::*;
pub use error::IntegrityError;

pub use domain::Domain;
pub use content::{ContentItem, ContentFilter, SourceType};
pub use criterion::{Criterion, CriterionCatalog};
pub use evaluation::{Evaluation, EvaluationFilter, OVERALL_RATING_MAX, OVERALL_RATING_MIN};
pub use quality::{AnswerPredicate, FlagKind, QualityCheck, QualityFlag, Severity};

pub use aggregate::{
    AggregateScore, CriterionGap, GapEntry, GapReport, ImprovementSuggestion, Priority, Subject,
    SummaryGap,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
