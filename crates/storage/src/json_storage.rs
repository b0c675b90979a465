//! JSON file storage implementation.
//!
//! Stores one pretty-printed JSON file per record under a root directory:
//! `content/`, `criteria/`, `evaluations/` and `quality_checks/`. Files
//! without a `.json` extension are ignored; a `.json` file that does not
//! parse fails the listing.

use std::path::{Path, PathBuf};
use evalqc_core::{
    ContentFilter, ContentItem, Criterion, Domain, Evaluation, EvaluationFilter, QualityCheck,
};
use super::{EvaluationStore, StorageError, Result};
use tokio::fs;
use tracing::debug;

/// File-based JSON storage backend.
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("content")).await?;
        fs::create_dir_all(root.join("criteria")).await?;
        fs::create_dir_all(root.join("evaluations")).await?;
        fs::create_dir_all(root.join("quality_checks")).await?;

        Ok(Self { root })
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn content_path(&self, item: &ContentItem) -> PathBuf {
        self.root.join("content").join(format!("{}.json", item.id))
    }
    fn criterion_path(&self, criterion: &Criterion) -> Result<PathBuf> {
        let key = criterion.id.as_str();
        if !is_safe_key(key) {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join("criteria").join(format!("{key}.json")))
    }
    fn evaluation_path(&self, evaluation: &Evaluation) -> PathBuf {
        self.root.join("evaluations").join(format!("{}.json", evaluation.id))
    }
    fn quality_check_path(&self, check: &QualityCheck) -> PathBuf {
        self.root.join("quality_checks").join(format!("{}.json", check.id))
    }
}

#[async_trait::async_trait]
impl EvaluationStore for JsonStore {
    async fn list_evaluations(&self, filter: &EvaluationFilter) -> Result<Vec<Evaluation>> {
        let all: Vec<Evaluation> = list_dir(&self.root.join("evaluations")).await?;
        Ok(all.into_iter().filter(|e| filter.matches(e)).collect())
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>> {
        let all: Vec<ContentItem> = list_dir(&self.root.join("content")).await?;
        Ok(all.into_iter().filter(|c| filter.matches(c)).collect())
    }

    async fn list_criteria(&self, domain: Option<&Domain>) -> Result<Vec<Criterion>> {
        let all: Vec<Criterion> = list_dir(&self.root.join("criteria")).await?;
        Ok(all
            .into_iter()
            .filter(|c| domain.map_or(true, |d| c.applies_to(d)))
            .collect())
    }

    async fn list_quality_checks(&self, domain: Option<&Domain>) -> Result<Vec<QualityCheck>> {
        let all: Vec<QualityCheck> = list_dir(&self.root.join("quality_checks")).await?;
        Ok(all
            .into_iter()
            .filter(|c| domain.map_or(true, |d| c.applies_to(d)))
            .collect())
    }

    async fn append_evaluation(&mut self, evaluation: &Evaluation) -> Result<()> {
        let path = self.evaluation_path(evaluation);
        if fs::try_exists(&path).await? {
            return Err(StorageError::Immutable(evaluation.id));
        }
        let json = serde_json::to_string_pretty(evaluation)?;
        fs::write(&path, json.as_bytes()).await?;
        debug!("Appended evaluation {}", evaluation.id);
        Ok(())
    }

    async fn save_content(&mut self, item: &ContentItem) -> Result<()> {
        item.validate()?;
        let json = serde_json::to_string_pretty(item)?;
        fs::write(self.content_path(item), json.as_bytes()).await?;
        Ok(())
    }

    async fn save_criterion(&mut self, criterion: &Criterion) -> Result<()> {
        let path = self.criterion_path(criterion)?;
        let json = serde_json::to_string_pretty(criterion)?;
        fs::write(path, json.as_bytes()).await?;
        Ok(())
    }

    async fn save_quality_check(&mut self, check: &QualityCheck) -> Result<()> {
        let json = serde_json::to_string_pretty(check)?;
        fs::write(self.quality_check_path(check), json.as_bytes()).await?;
        Ok(())
    }
}

/// Criterion ids become file names: plain slugs only.
fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| StorageError::Corrupt {
                path: path.to_path_buf(),
                source,
            }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read every `.json` file in `dir`, sorted by file name so listings are
/// deterministic.
async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut paths = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        // Removed between listing and reading
        if let Some(item) = read_json(&path).await? {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalqc_core::{AnswerPredicate, CriterionId, SourceType};

    fn scores(pairs: &[(&str, i32)]) -> Vec<(CriterionId, i32)> {
        pairs.iter().map(|(c, s)| (CriterionId::new(*c), *s)).collect()
    }

    #[tokio::test]
    async fn test_roundtrip_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let ai = ContentItem::ai(Domain::NewsArticles, "gpt-x", "Breaking news text");
        let human = ContentItem::human(Domain::CreativeWriting, "Once upon a time");
        store.save_content(&ai).await.unwrap();
        store.save_content(&human).await.unwrap();

        let only_ai = store
            .list_content(&ContentFilter {
                source: Some(SourceType::Ai),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(only_ai.len(), 1);
        assert_eq!(only_ai[0].id, ai.id);

        let eval = Evaluation::new("alice", ai.id, scores(&[("accuracy", 4)]), 4, 120);
        store.append_evaluation(&eval).await.unwrap();

        let listed = store
            .list_evaluations(&EvaluationFilter {
                content_ids: Some(vec![ai.id]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed, vec![eval]);
    }

    #[tokio::test]
    async fn test_evaluations_are_append_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        let content = ContentItem::human(Domain::NewsArticles, "text");
        let eval = Evaluation::new("alice", content.id, scores(&[("accuracy", 2)]), 2, 80);
        store.append_evaluation(&eval).await.unwrap();

        let err = store.append_evaluation(&eval).await.unwrap_err();
        assert!(matches!(err, StorageError::Immutable(id) if id == eval.id));

        let correction = eval.supersede(scores(&[("accuracy", 3)]), eval.submitted_at + chrono::Duration::minutes(1));
        store.append_evaluation(&correction).await.unwrap();
        let all = store.list_evaluations(&EvaluationFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_catalog_and_checks_by_domain() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();

        store.save_criterion(&Criterion::new("accuracy", "accuracy", 1, 5)).await.unwrap();
        store
            .save_criterion(&Criterion::new("rhythm", "rhythm", 1, 5).with_domains(vec![Domain::CreativeWriting]))
            .await
            .unwrap();
        store
            .save_quality_check(&QualityCheck::new(
                Some(Domain::CreativeWriting),
                "What colour is the sky in the story?",
                AnswerPredicate::Contains { text: "blue".into() },
            ))
            .await
            .unwrap();

        assert_eq!(store.list_criteria(Some(&Domain::NewsArticles)).await.unwrap().len(), 1);
        assert_eq!(store.list_criteria(None).await.unwrap().len(), 2);
        assert_eq!(store.catalog().await.unwrap().len(), 2);
        assert!(store.list_quality_checks(Some(&Domain::NewsArticles)).await.unwrap().is_empty());
        assert_eq!(store.list_quality_checks(Some(&Domain::CreativeWriting)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path()).await.unwrap();
        tokio::fs::write(dir.path().join("content").join("README.txt"), b"notes").await.unwrap();
        assert!(store.list_content(&ContentFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_evaluation_fails_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path()).await.unwrap();
        let content = ContentItem::human(Domain::NewsArticles, "text");
        let eval = Evaluation::new("alice", content.id, scores(&[("accuracy", 2)]), 2, 80);
        store.append_evaluation(&eval).await.unwrap();
        tokio::fs::write(dir.path().join("evaluations").join("broken.json"), b"{\"id\":")
            .await
            .unwrap();

        let err = store.list_evaluations(&EvaluationFilter::default()).await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref path, .. } if path.ends_with("broken.json")));
    }

    #[tokio::test]
    async fn test_criterion_ids_cannot_escape_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonStore::new(dir.path().join("store")).await.unwrap();

        for id in ["../../x", "a/b", "..", "", r"a\b"] {
            let err = store
                .save_criterion(&Criterion::new(id, "bad", 1, 5))
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "accepted {id:?}");
        }
        assert!(!dir.path().join("x.json").exists());

        store.save_criterion(&Criterion::new("language_quality", "language quality", 1, 5)).await.unwrap();
        assert_eq!(store.list_criteria(None).await.unwrap().len(), 1);
    }
}
