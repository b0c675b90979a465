//! Point-in-time view of the evaluation store.

use std::collections::{BTreeMap, HashMap};
use evalqc_core::{
    ContentId, ContentItem, CriterionCatalog, Domain, Evaluation, EvaluatorId, IntegrityError,
    QualityCheck,
};

/// Everything one report run reads, loaded once.
///
/// Evaluations are kept in submission order (`submitted_at`, then id), so
/// every computation over a snapshot is deterministic.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    content: HashMap<ContentId, ContentItem>,
    catalog: CriterionCatalog,
    checks: Vec<QualityCheck>,
    evaluations: Vec<Evaluation>,
    /// content -> positions of each evaluator's latest evaluation, by evaluator
    latest: HashMap<ContentId, Vec<usize>>,
}

impl Snapshot {
    /// Build a snapshot.
    pub fn new(
        content: impl IntoIterator<Item = ContentItem>,
        catalog: CriterionCatalog,
        checks: Vec<QualityCheck>,
        mut evaluations: Vec<Evaluation>,
    ) -> Self {
        evaluations.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));

        // Later positions are later submissions, so the last write wins.
        let mut by_pair: HashMap<ContentId, BTreeMap<&EvaluatorId, usize>> = HashMap::new();
        for (i, e) in evaluations.iter().enumerate() {
            by_pair.entry(e.content_id).or_default().insert(&e.evaluator_id, i);
        }
        let latest = by_pair
            .into_iter()
            .map(|(content, positions)| (content, positions.into_values().collect()))
            .collect();

        Self {
            content: content.into_iter().map(|c| (c.id, c)).collect(),
            catalog,
            checks,
            evaluations,
            latest,
        }
    }

    /// Check every evaluation of known content against the catalog.
    ///
    /// Evaluations of content missing from the snapshot cannot be checked
    /// and are left to the caller.
    pub fn validate(&self) -> Result<(), IntegrityError> {
        for evaluation in &self.evaluations {
            if let Some(content) = self.content.get(&evaluation.content_id) {
                evaluation.validate(&self.catalog, content)?;
            }
        }
        Ok(())
    }

    /// Criterion catalog.
    pub fn catalog(&self) -> &CriterionCatalog {
        &self.catalog
    }

    /// Content item by id.
    pub fn content(&self, id: &ContentId) -> Option<&ContentItem> {
        self.content.get(id)
    }

    /// All content items, sorted by id.
    pub fn content_items(&self) -> Vec<&ContentItem> {
        let mut items: Vec<_> = self.content.values().collect();
        items.sort_by_key(|c| c.id);
        items
    }

    /// All evaluations in submission order.
    pub fn evaluations(&self) -> &[Evaluation] {
        &self.evaluations
    }

    /// Active quality checks asked in `domain`.
    pub fn checks_for(&self, domain: &Domain) -> Vec<&QualityCheck> {
        self.checks.iter().filter(|c| c.applies_to(domain)).collect()
    }

    /// Active checks not tied to any domain.
    pub fn general_checks(&self) -> Vec<&QualityCheck> {
        self.checks.iter().filter(|c| c.active && c.domain.is_none()).collect()
    }

    /// One evaluator's evaluations in submission order.
    pub fn history_of<'a>(&'a self, evaluator: &'a EvaluatorId) -> impl Iterator<Item = &'a Evaluation> + 'a {
        self.evaluations.iter().filter(move |e| &e.evaluator_id == evaluator)
    }

    /// Distinct evaluators, sorted.
    pub fn evaluators(&self) -> Vec<&EvaluatorId> {
        let mut ids: Vec<_> = self.evaluations.iter().map(|e| &e.evaluator_id).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Latest evaluation of each evaluator on `content`, sorted by evaluator.
    pub fn latest_on(&self, content: &ContentId) -> Vec<&Evaluation> {
        self.latest
            .get(content)
            .map(|positions| positions.iter().map(|&i| &self.evaluations[i]).collect())
            .unwrap_or_default()
    }

    /// Latest evaluation of every other evaluator on the same content.
    pub fn peers_of(&self, evaluation: &Evaluation) -> Vec<&Evaluation> {
        self.latest_on(&evaluation.content_id)
            .into_iter()
            .filter(|e| e.evaluator_id != evaluation.evaluator_id)
            .collect()
    }
}

/// Reduce evaluations to the latest per (evaluator, content) pair.
///
/// Latest means greatest `submitted_at`, ties broken by greater id. The
/// result is ordered by (evaluator, content).
pub fn latest_per_pair<'a>(evaluations: impl IntoIterator<Item = &'a Evaluation>) -> Vec<&'a Evaluation> {
    let mut latest: BTreeMap<(&EvaluatorId, ContentId), &Evaluation> = BTreeMap::new();
    for e in evaluations {
        latest
            .entry((&e.evaluator_id, e.content_id))
            .and_modify(|current| {
                if (e.submitted_at, e.id) > (current.submitted_at, current.id) {
                    *current = e;
                }
            })
            .or_insert(e);
    }
    latest.into_values().collect()
}
