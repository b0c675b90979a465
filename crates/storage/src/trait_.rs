//! Storage trait abstraction.

use async_trait::async_trait;
use evalqc_core::{
    ContentFilter, ContentItem, Criterion, CriterionCatalog, Domain, Evaluation, EvaluationFilter,
    EvaluationId, IntegrityError, QualityCheck,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored records violate the data model
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Attempt to overwrite an evaluation
    #[error("evaluation {0} already exists; evaluations are append-only")]
    Immutable(EvaluationId),

    /// A stored record could not be parsed
    #[error("corrupt record {path}: {source}")]
    Corrupt {
        /// File holding the record
        path: std::path::PathBuf,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// A key cannot be used as a record name
    #[error("invalid record key '{0}'")]
    InvalidKey(String),
}

/// Data-access collaborator for the quality engine.
///
/// Evaluations are append-only. Content, criteria and checks are owned by
/// other layers; the save methods exist for seeding and import.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    // === Reads ===

    /// List evaluations matching the filter.
    async fn list_evaluations(&self, filter: &EvaluationFilter) -> Result<Vec<Evaluation>>;

    /// List content matching the filter.
    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>>;

    /// List criteria valid for `domain`, or all criteria when `None`.
    async fn list_criteria(&self, domain: Option<&Domain>) -> Result<Vec<Criterion>>;

    /// List active quality checks for `domain` (including general checks),
    /// or every check when `None`.
    async fn list_quality_checks(&self, domain: Option<&Domain>) -> Result<Vec<QualityCheck>>;

    // === Writes ===

    /// Append an evaluation. Fails with [`StorageError::Immutable`] if the
    /// id is already stored.
    async fn append_evaluation(&mut self, evaluation: &Evaluation) -> Result<()>;

    /// Save a content item.
    async fn save_content(&mut self, item: &ContentItem) -> Result<()>;

    /// Save a criterion.
    async fn save_criterion(&mut self, criterion: &Criterion) -> Result<()>;

    /// Save a quality check.
    async fn save_quality_check(&mut self, check: &QualityCheck) -> Result<()>;

    // === Derived ===

    /// Full criterion catalog, validated.
    async fn catalog(&self) -> Result<CriterionCatalog> {
        let criteria = self.list_criteria(None).await?;
        Ok(CriterionCatalog::new(criteria)?)
    }
}
