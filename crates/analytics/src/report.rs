//! Serializable reports for the presentation layer.

use evalqc_core::{AggregateScore, GapReport, ImprovementSuggestion, QualityFlag, Time};
use serde::{Deserialize, Serialize};

use crate::aggregate::ModelComparison;

/// Which report was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Every section
    Full,
    /// Quality issues only
    Quality,
    /// Model comparison
    Comparison,
    /// Gap analysis
    Gaps,
    /// Suggestions
    Suggestions,
}

/// Trust summary for the admin quality-issues view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    /// Evaluations classified
    pub total_evaluations: usize,
    /// Evaluations admitted to aggregation
    pub trusted_evaluations: usize,
    /// Every raised flag
    pub flags: Vec<QualityFlag>,
}

/// One report section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "section", rename_all = "snake_case")]
pub enum ReportSection {
    /// Trust summary
    Quality(QualitySummary),
    /// Aggregate rows
    Aggregates {
        /// Rows
        scores: Vec<AggregateScore>,
    },
    /// Model comparison
    Comparison(ModelComparison),
    /// Gap analysis
    Gaps(GapReport),
    /// Suggestions
    Suggestions {
        /// Ranked suggestions
        suggestions: Vec<ImprovementSuggestion>,
    },
}

/// A generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    /// Report kind
    pub kind: ReportKind,
    /// Human-readable title
    pub title: String,
    /// When it was computed
    pub generated_at: Time,
    /// Sections in display order
    pub sections: Vec<ReportSection>,
}

impl AnalyticsReport {
    /// Empty report of `kind`.
    pub fn new(kind: ReportKind, title: impl Into<String>, generated_at: Time) -> Self {
        Self {
            kind,
            title: title.into(),
            generated_at,
            sections: Vec::new(),
        }
    }

    /// Append a section.
    pub fn with_section(mut self, section: ReportSection) -> Self {
        self.sections.push(section);
        self
    }
}
