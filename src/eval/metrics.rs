//! Per-query retrieval metrics.
//!
//! Raw scores are 0/1 per query instance; aggregation into percentages
//! happens in the evaluator. Retrieved document lists are de-duplicated
//! and cleaned of sentinel IDs before truncation to k, so a retriever
//! cannot lose credit to its own duplicates.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ground::DocRef;

/// Sentinel document ID some retrievers emit for empty slots.
pub const NONE_DOCUMENT_ID: &str = "None";

/// Key of the accuracy metric in [`RawMetrics`].
pub const ACCURACY: &str = "accuracy";

/// Document IDs in order, without duplicates or sentinel entries.
#[must_use]
pub fn extract_document_ids(docs: &[DocRef]) -> Vec<String> {
    let mut seen = HashSet::new();
    docs.iter()
        .map(|doc| doc.document_id.as_str())
        .filter(|id| *id != NONE_DOCUMENT_ID)
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_owned)
        .collect()
}

/// 1 if any gold document appears among the first `k` cleaned retrieved
/// documents, else 0.
#[must_use]
pub fn accuracy_at_k(gold: &[DocRef], retrieved: &[DocRef], k: usize) -> u32 {
    let gold_ids: HashSet<String> = extract_document_ids(gold).into_iter().collect();
    let retrieved_ids = extract_document_ids(retrieved);
    let hit = retrieved_ids
        .iter()
        .take(k)
        .any(|id| gold_ids.contains(id));
    u32::from(hit)
}

/// Per-instance scores, keyed by metric name then instance ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMetrics(BTreeMap<String, BTreeMap<String, u32>>);

impl RawMetrics {
    /// Create an empty score table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one instance's score under a metric.
    pub fn insert(&mut self, metric: &str, instance_id: &str, score: u32) {
        self.0
            .entry(metric.to_owned())
            .or_default()
            .insert(instance_id.to_owned(), score);
    }

    /// One instance's score under a metric, if it was scored.
    #[must_use]
    pub fn get(&self, metric: &str, instance_id: &str) -> Option<u32> {
        self.0.get(metric).and_then(|m| m.get(instance_id)).copied()
    }

    /// Iterate over metric names and their score maps.
    pub fn metrics(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, u32>)> {
        self.0.iter()
    }

    /// All scores recorded under a metric.
    #[must_use]
    pub fn scores(&self, metric: &str) -> Option<&BTreeMap<String, u32>> {
        self.0.get(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(ids: &[&str]) -> Vec<DocRef> {
        ids.iter().map(|id| DocRef::new(*id, "")).collect()
    }

    #[test]
    fn test_extract_document_ids_dedup_and_sentinel() {
        let ids = extract_document_ids(&docs(&["1", "None", "2", "1", "3"]));
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn test_accuracy_hit_and_miss() {
        let gold = docs(&["7"]);
        assert_eq!(accuracy_at_k(&gold, &docs(&["7", "8"]), 1), 1);
        assert_eq!(accuracy_at_k(&gold, &docs(&["8", "7"]), 1), 0);
        assert_eq!(accuracy_at_k(&gold, &docs(&["8", "7"]), 2), 1);
        assert_eq!(accuracy_at_k(&gold, &docs(&[]), 5), 0);
    }

    #[test]
    fn test_sentinels_removed_before_truncation() {
        // The sentinel must not occupy a top-k slot.
        let gold = docs(&["7"]);
        assert_eq!(accuracy_at_k(&gold, &docs(&["None", "7"]), 1), 1);
    }

    #[test]
    fn test_duplicates_removed_before_truncation() {
        let gold = docs(&["7"]);
        assert_eq!(accuracy_at_k(&gold, &docs(&["8", "8", "7"]), 2), 1);
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let retrieved = docs(&["1", "None", "2", "1"]);
        let once = extract_document_ids(&retrieved);
        let again = extract_document_ids(
            &once.iter().map(|id| DocRef::new(id.clone(), "")).collect::<Vec<_>>(),
        );
        assert_eq!(once, again);

        let gold = docs(&["2"]);
        let cleaned: Vec<DocRef> = once.iter().map(|id| DocRef::new(id.clone(), "")).collect();
        assert_eq!(
            accuracy_at_k(&gold, &retrieved, 2),
            accuracy_at_k(&gold, &cleaned, 2)
        );
    }
}
