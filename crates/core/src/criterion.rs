//! Evaluation criteria and the per-domain catalog.

use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::id::CriterionId;
use crate::{Domain, IntegrityError};

/// One scored quality dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Slug identifier
    pub id: CriterionId,

    /// Display name
    pub name: String,

    /// What evaluators are asked to judge
    #[serde(default)]
    pub description: String,

    /// Domains this criterion applies to; `None` means every domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<Domain>>,

    /// Lowest score on the scale
    pub scale_min: i32,

    /// Highest score on the scale
    pub scale_max: i32,

    /// Sentence appended to improvement suggestions for this criterion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement_hint: Option<String>,
}

impl Criterion {
    /// Create a criterion that applies to every domain.
    pub fn new(id: impl Into<String>, name: impl Into<String>, scale_min: i32, scale_max: i32) -> Self {
        Self {
            id: CriterionId::new(id),
            name: name.into(),
            description: String::new(),
            domains: None,
            scale_min,
            scale_max,
            improvement_hint: None,
        }
    }

    /// Set description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Restrict to the given domains.
    pub fn with_domains(mut self, domains: Vec<Domain>) -> Self {
        self.domains = Some(domains);
        self
    }

    /// Set the improvement hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.improvement_hint = Some(hint.into());
        self
    }

    /// Width of the scale (`scale_max - scale_min`), always positive for a
    /// valid criterion.
    pub fn range(&self) -> f64 {
        f64::from(self.scale_max) - f64::from(self.scale_min)
    }

    /// Whether `score` lies on the scale.
    pub fn contains(&self, score: i32) -> bool {
        (self.scale_min..=self.scale_max).contains(&score)
    }

    /// Whether this criterion is part of `domain`'s catalog.
    pub fn applies_to(&self, domain: &Domain) -> bool {
        match &self.domains {
            None => true,
            Some(domains) => domains.contains(domain),
        }
    }
}

/// Ordered set of criteria, resolved per domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Criterion>", into = "Vec<Criterion>")]
pub struct CriterionCatalog {
    criteria: Vec<Criterion>,
}

impl CriterionCatalog {
    /// Build a catalog, rejecting empty scales and duplicate ids.
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, IntegrityError> {
        let mut seen = HashSet::new();
        for c in &criteria {
            if c.scale_min >= c.scale_max {
                return Err(IntegrityError::InvalidScale {
                    criterion: c.id.clone(),
                    min: c.scale_min,
                    max: c.scale_max,
                });
            }
            if !seen.insert(c.id.clone()) {
                return Err(IntegrityError::DuplicateCriterion(c.id.clone()));
            }
        }
        Ok(Self { criteria })
    }

    /// The six general-purpose criteria on a 1-5 scale.
    pub fn standard() -> Self {
        let criteria = vec![
            Criterion::new("accuracy", "accuracy", 1, 5)
                .with_description("Factual correctness and absence of errors")
                .with_hint("Enhance factual correctness by improving source validation and fact-checking processes."),
            Criterion::new("coherence", "coherence", 1, 5)
                .with_description("Logical flow and consistency of ideas")
                .with_hint("Improve logical flow and narrative consistency by strengthening contextual awareness across longer texts."),
            Criterion::new("relevance", "relevance", 1, 5)
                .with_description("Appropriateness to the given topic or context")
                .with_hint("Improve focus on provided topics by enhancing prompt understanding and topic adherence mechanisms."),
            Criterion::new("creativity", "creativity", 1, 5)
                .with_description("Originality and innovative thinking")
                .with_hint("Increase originality by expanding diverse expression patterns and reducing repetitive structures."),
            Criterion::new("completeness", "completeness", 1, 5)
                .with_description("Comprehensive coverage of the subject matter")
                .with_hint("Ensure comprehensive coverage of subjects by addressing all aspects of a topic."),
            Criterion::new("language_quality", "language quality", 1, 5)
                .with_description("Grammar, vocabulary, and overall writing quality")
                .with_hint("Enhance grammar, vocabulary and writing style by refining linguistic patterns and reducing awkward phrasing."),
        ];
        Self { criteria }
    }

    /// Look up a criterion regardless of domain.
    pub fn get(&self, id: &CriterionId) -> Option<&Criterion> {
        self.criteria.iter().find(|c| &c.id == id)
    }

    /// Look up a criterion that must be valid for `domain`.
    pub fn lookup(&self, domain: &Domain, id: &CriterionId) -> Option<&Criterion> {
        self.get(id).filter(|c| c.applies_to(domain))
    }

    /// Criteria valid for `domain`, in catalog order.
    pub fn for_domain<'a>(&'a self, domain: &'a Domain) -> impl Iterator<Item = &'a Criterion> + 'a {
        self.criteria.iter().filter(move |c| c.applies_to(domain))
    }

    /// Position of a criterion in catalog order, used for stable sorting.
    pub fn position(&self, id: &CriterionId) -> usize {
        self.criteria
            .iter()
            .position(|c| &c.id == id)
            .unwrap_or(self.criteria.len())
    }

    /// All criteria.
    pub fn iter(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.iter()
    }

    /// Number of criteria.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl TryFrom<Vec<Criterion>> for CriterionCatalog {
    type Error = IntegrityError;

    fn try_from(criteria: Vec<Criterion>) -> Result<Self, Self::Error> {
        Self::new(criteria)
    }
}

impl From<CriterionCatalog> for Vec<Criterion> {
    fn from(catalog: CriterionCatalog) -> Self {
        catalog.criteria
    }
}
