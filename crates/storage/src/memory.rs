//! In-memory store.

use std::sync::Arc;
use evalqc_core::{
    ContentFilter, ContentItem, Criterion, Domain, Evaluation, EvaluationFilter, QualityCheck,
};
use tokio::sync::RwLock;
use super::{EvaluationStore, StorageError, Result};

#[derive(Debug, Default)]
struct Tables {
    content: Vec<ContentItem>,
    criteria: Vec<Criterion>,
    evaluations: Vec<Evaluation>,
    quality_checks: Vec<QualityCheck>,
}

/// Store holding everything in memory. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `criteria`.
    pub fn with_criteria(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        let tables = Tables {
            criteria: criteria.into_iter().collect(),
            ..Default::default()
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }
}

#[async_trait::async_trait]
impl EvaluationStore for MemoryStore {
    async fn list_evaluations(&self, filter: &EvaluationFilter) -> Result<Vec<Evaluation>> {
        let tables = self.tables.read().await;
        Ok(tables.evaluations.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>> {
        let tables = self.tables.read().await;
        Ok(tables.content.iter().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn list_criteria(&self, domain: Option<&Domain>) -> Result<Vec<Criterion>> {
        let tables = self.tables.read().await;
        Ok(tables
            .criteria
            .iter()
            .filter(|c| domain.map_or(true, |d| c.applies_to(d)))
            .cloned()
            .collect())
    }

    async fn list_quality_checks(&self, domain: Option<&Domain>) -> Result<Vec<QualityCheck>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quality_checks
            .iter()
            .filter(|c| domain.map_or(true, |d| c.applies_to(d)))
            .cloned()
            .collect())
    }

    async fn append_evaluation(&mut self, evaluation: &Evaluation) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.evaluations.iter().any(|e| e.id == evaluation.id) {
            return Err(StorageError::Immutable(evaluation.id));
        }
        tables.evaluations.push(evaluation.clone());
        Ok(())
    }

    async fn save_content(&mut self, item: &ContentItem) -> Result<()> {
        item.validate()?;
        let mut tables = self.tables.write().await;
        tables.content.retain(|c| c.id != item.id);
        tables.content.push(item.clone());
        Ok(())
    }

    async fn save_criterion(&mut self, criterion: &Criterion) -> Result<()> {
        let mut tables = self.tables.write().await;
        match tables.criteria.iter_mut().find(|c| c.id == criterion.id) {
            Some(existing) => *existing = criterion.clone(),
            None => tables.criteria.push(criterion.clone()),
        }
        Ok(())
    }

    async fn save_quality_check(&mut self, check: &QualityCheck) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.quality_checks.retain(|c| c.id != check.id);
        tables.quality_checks.push(check.clone());
        Ok(())
    }
}
