//! Analytics errors.

use evalqc_core::IntegrityError;
use evalqc_storage::StorageError;

/// Result alias for analytics operations.
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Errors raised while producing analytics.
///
/// Empty inputs are never an error; they yield empty results.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Evaluation data violates the data model
    #[error("data integrity: {0}")]
    Integrity(#[from] IntegrityError),

    /// The store could not be read
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    /// Configuration could not be parsed
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// A referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}
