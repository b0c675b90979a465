//! Score aggregation, human-AI gap analysis and improvement suggestions.
//!
//! Everything here is derived: results are recomputed from the trusted
//! evaluations of a [`Snapshot`](evalqc_quality::Snapshot) on every call.

#![warn(missing_docs)]

pub mod error;
pub mod config;
pub mod aggregate;
pub mod gap;
pub mod suggest;
pub mod report;
pub mod engine;
pub mod service;

pub use error::{AnalyticsError, Result};
pub use config::{AnalyticsConfig, EngineConfig};
pub use aggregate::{
    ComparisonRequest, ModelComparison, ModelRanking, ScoreAggregator, SubjectRating, Timeframe,
};
pub use gap::{signed_gap, GapAnalyzer};
pub use suggest::{priority, SuggestionGenerator};
pub use report::{AnalyticsReport, QualitySummary, ReportKind, ReportSection};
pub use engine::{Engine, PipelineOutput};
pub use service::AnalyticsService;
