//! Derived aggregates: scores, gaps, suggestions.
//!
//! None of these are stored; they are recomputed from evaluations on demand.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::id::CriterionId;
use crate::{ContentItem, Domain, SourceType};

/// Side of a comparison: human authors or one AI model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Human-authored content
    Human,
    /// Output of the named model
    Model(String),
}

impl Subject {
    /// The subject that produced `item`.
    pub fn of(item: &ContentItem) -> Self {
        match (item.source, &item.model_name) {
            (SourceType::Ai, Some(name)) => Subject::Model(name.clone()),
            (SourceType::Ai, None) => Subject::Model(String::new()),
            (SourceType::Human, _) => Subject::Human,
        }
    }

    /// Model name, if this is an AI subject.
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Subject::Model(name) => Some(name),
            Subject::Human => None,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Human => f.write_str("human"),
            Subject::Model(name) => f.write_str(name),
        }
    }
}

/// Mean/median of trusted scores for one (subject, domain, criterion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateScore {
    /// Model or human baseline
    pub subject: Subject,

    /// Content domain
    pub domain: Domain,

    /// Criterion scored
    pub criterion_id: CriterionId,

    /// Arithmetic mean
    pub mean: f64,

    /// Median
    pub median: f64,

    /// Number of scores; never zero
    pub sample_count: usize,
}

/// One AI model compared with the human baseline on one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapEntry {
    /// AI model
    pub model: String,

    /// Content domain
    pub domain: Domain,

    /// Criterion compared
    pub criterion_id: CriterionId,

    /// Human mean
    pub human_score: f64,

    /// AI mean
    pub ai_score: f64,

    /// Human sample count
    pub human_samples: usize,

    /// AI sample count
    pub ai_samples: usize,

    /// `ai_score - human_score`; negative means the model underperforms
    pub gap: f64,

    /// Gap divided by the criterion's scale width
    pub normalized_gap: f64,

    /// Significance threshold on this criterion's scale
    pub threshold: f64,

    /// Large enough and backed by enough samples
    pub significant: bool,

    /// Too few samples on either side to call it
    pub insufficient_data: bool,
}

/// All models against the human baseline on one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionGap {
    /// Human mean
    pub human_score: f64,

    /// Human sample count
    pub human_samples: usize,

    /// Highest-scoring model on this criterion
    pub best_model: Option<String>,

    /// Per-model comparison
    pub models: BTreeMap<String, GapEntry>,
}

/// Human baseline against the best model, pooled over a whole domain or
/// over one criterion across domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryGap {
    /// Pooled human mean
    pub human_score: f64,

    /// Pooled mean of the best model
    pub ai_score: f64,

    /// Human scores pooled
    pub human_samples: usize,

    /// Best-model scores pooled
    pub ai_samples: usize,

    /// `ai_score - human_score`
    pub gap: f64,

    /// Highest-scoring model; ties go to the smaller name
    pub best_model: String,
}

/// Gap report keyed by domain, then criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapReport {
    /// domain -> criterion -> comparison
    pub domains: BTreeMap<Domain, BTreeMap<CriterionId, CriterionGap>>,

    /// Per domain, pooled over its criteria
    #[serde(default)]
    pub domain_gaps: BTreeMap<Domain, SummaryGap>,

    /// Per criterion, pooled over domains
    #[serde(default)]
    pub criterion_gaps: BTreeMap<CriterionId, SummaryGap>,

    /// Mean of every entry's gap
    pub overall_gap: Option<f64>,
}

impl GapReport {
    /// Every entry, in key order.
    pub fn entries(&self) -> impl Iterator<Item = &GapEntry> {
        self.domains
            .values()
            .flat_map(|criteria| criteria.values())
            .flat_map(|c| c.models.values())
    }

    /// Entry for one (domain, criterion, model).
    pub fn entry(&self, domain: &Domain, criterion: &CriterionId, model: &str) -> Option<&GapEntry> {
        self.domains.get(domain)?.get(criterion)?.models.get(model)
    }

    /// Whether the report holds no comparisons.
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Suggestion priority. Ordered low < medium < high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Below the significance threshold
    Low,
    /// At least the threshold
    Medium,
    /// At least twice the threshold
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

/// An actionable improvement for one model on one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementSuggestion {
    /// AI model
    pub model_name: String,

    /// Content domain
    pub domain: Domain,

    /// Criterion to improve
    pub criterion_id: CriterionId,

    /// Model's current mean
    pub current_score: f64,

    /// Score to aim for
    pub target_score: f64,

    /// `|target - current|`
    pub magnitude: f64,

    /// Whether the target came from a human baseline
    pub baselined: bool,

    /// How urgent
    pub priority: Priority,

    /// Generated text
    pub suggestion_text: String,
}
