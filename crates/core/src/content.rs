//! Content items under evaluation.

use serde::{Deserialize, Serialize};
use crate::id::ContentId;
use crate::{Domain, IntegrityError, Time};

/// Who produced a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Generated by an AI model
    Ai,
    /// Written by a person
    Human,
}

/// A piece of content shown to evaluators. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique identifier
    pub id: ContentId,

    /// Short title
    #[serde(default)]
    pub title: String,

    /// Content category
    pub domain: Domain,

    /// AI or human
    pub source: SourceType,

    /// Generating model; present iff `source` is AI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    /// Text body
    pub text: String,

    /// When created
    pub created_at: Time,
}

impl ContentItem {
    /// Create AI-generated content.
    pub fn ai(domain: Domain, model_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: ContentId::new(),
            title: String::new(),
            domain,
            source: SourceType::Ai,
            model_name: Some(model_name.into()),
            text: text.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Create human-authored content.
    pub fn human(domain: Domain, text: impl Into<String>) -> Self {
        Self {
            id: ContentId::new(),
            title: String::new(),
            domain,
            source: SourceType::Human,
            model_name: None,
            text: text.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Whitespace-delimited word count of the body.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Check the source/model-name pairing.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        match (self.source, &self.model_name) {
            (SourceType::Ai, Some(name)) if !name.trim().is_empty() => Ok(()),
            (SourceType::Human, None) => Ok(()),
            _ => Err(IntegrityError::ModelNameMismatch(self.id)),
        }
    }
}

/// Filter for listing content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    /// Only this domain
    pub domain: Option<Domain>,

    /// Only this source type
    pub source: Option<SourceType>,

    /// Only this model's output
    pub model_name: Option<String>,
}

impl ContentFilter {
    /// Whether `item` passes the filter.
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.domain.as_ref().map_or(true, |d| &item.domain == d)
            && self.source.map_or(true, |s| item.source == s)
            && self
                .model_name
                .as_ref()
                .map_or(true, |m| item.model_name.as_ref() == Some(m))
    }
}
