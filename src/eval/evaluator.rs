//! Scoring predictions against gold benchmark sets.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::generate::BenchmarkSet;
use crate::ground::DocRef;

use super::metrics::{accuracy_at_k, RawMetrics, ACCURACY};

/// One line of a predictions JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Query instance ID, matching the gold ID space.
    pub id: String,
    /// The retrieval output.
    pub output: PredictionOutput,
}

/// Retrieval output: ranked retrieved documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionOutput {
    /// Retrieved documents, best first.
    pub provenance: Vec<DocRef>,
}

/// Ranked predictions keyed by instance ID.
#[derive(Debug, Clone, Default)]
pub struct Predictions(BTreeMap<String, Vec<DocRef>>);

impl Predictions {
    /// Create an empty prediction table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one instance's ranked documents.
    pub fn insert(&mut self, instance_id: impl Into<String>, retrieved: Vec<DocRef>) {
        self.0.insert(instance_id.into(), retrieved);
    }

    /// Load predictions from a JSONL file of [`PredictionRecord`] lines.
    pub fn from_jsonl_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut predictions = Self::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: PredictionRecord = serde_json::from_str(&line)?;
            predictions.insert(record.id, record.output.provenance);
        }
        Ok(predictions)
    }

    /// Ranked documents for an instance.
    #[must_use]
    pub fn get(&self, instance_id: &str) -> Option<&[DocRef]> {
        self.0.get(instance_id).map(Vec::as_slice)
    }

    /// Number of predictions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Aggregated evaluation scores, all on a 0–100 scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsReport {
    /// Mean accuracy@k over scored instances.
    pub accuracy: f64,
    /// Share of groups whose scored instances were all correct.
    pub consistency: f64,
    /// Per-metric means over head-entity instances.
    pub head: BTreeMap<String, f64>,
    /// Per-metric means over tail-entity instances.
    pub tail: BTreeMap<String, f64>,
    /// Gold instance IDs that had no prediction. Excluded from every
    /// aggregate above.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

/// Score predictions against gold sets.
///
/// Instances without a prediction are reported in
/// [`MetricsReport::missing`] and excluded from every aggregate; they
/// never abort the run. Fails only when nothing at all could be scored.
pub fn evaluate(
    sets: &[BenchmarkSet],
    predictions: &Predictions,
    k: usize,
) -> Result<(MetricsReport, RawMetrics)> {
    let mut raw = RawMetrics::new();
    let mut missing = Vec::new();

    for set in sets {
        for entity in set.entities.values() {
            for query in &entity.queries {
                let Some(retrieved) = predictions.get(&query.id) else {
                    log::warn!("missing prediction for {}", query.id);
                    missing.push(query.id.clone());
                    continue;
                };
                let score = accuracy_at_k(&query.output.provenance, retrieved, k);
                raw.insert(ACCURACY, &query.id, score);
            }
        }
    }

    let scored = raw.scores(ACCURACY).map_or(0, BTreeMap::len);
    if scored == 0 {
        return Err(Error::evaluation(format!(
            "no instances could be scored ({} gold instances missing predictions)",
            missing.len()
        )));
    }

    let accuracy = mean_percent(raw.scores(ACCURACY).into_iter().flat_map(BTreeMap::values));
    let consistency = consistency_percent(sets, &raw);
    let head = subset_scores(sets, &raw, true);
    let tail = subset_scores(sets, &raw, false);

    Ok((
        MetricsReport {
            accuracy,
            consistency,
            head,
            tail,
            missing,
        },
        raw,
    ))
}

/// Write `metrics@{k}.json` and `raw_metrics@{k}.json` into a directory.
pub fn write_metrics_files(
    dir: impl AsRef<Path>,
    k: usize,
    report: &MetricsReport,
    raw: &RawMetrics,
) -> Result<()> {
    let dir = dir.as_ref();
    let mut metrics = File::create(dir.join(format!("metrics@{k}.json")))?;
    metrics.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

    let mut raw_file = File::create(dir.join(format!("raw_metrics@{k}.json")))?;
    raw_file.write_all(serde_json::to_string_pretty(raw)?.as_bytes())?;
    Ok(())
}

fn mean_percent<'a>(scores: impl Iterator<Item = &'a u32>) -> f64 {
    let (sum, count) = scores.fold((0u64, 0u64), |(sum, count), s| {
        (sum + u64::from(*s), count + 1)
    });
    if count == 0 {
        0.0
    } else {
        100.0 * sum as f64 / count as f64
    }
}

/// A group is consistent when every scored instance in it was correct.
/// Groups with no scored instances are excluded from the mean.
fn consistency_percent(sets: &[BenchmarkSet], raw: &RawMetrics) -> f64 {
    let mut consistent = 0u64;
    let mut counted = 0u64;

    for set in sets {
        let scores: Vec<u32> = set
            .entities
            .values()
            .flat_map(|entity| entity.queries.iter())
            .filter_map(|query| raw.get(ACCURACY, &query.id))
            .collect();
        if scores.is_empty() {
            continue;
        }
        counted += 1;
        if scores.iter().all(|s| *s == 1) {
            consistent += 1;
        }
    }

    if counted == 0 {
        0.0
    } else {
        100.0 * consistent as f64 / counted as f64
    }
}

/// Per-metric means restricted to head (or tail) entities, reusing the
/// raw per-instance scores.
fn subset_scores(sets: &[BenchmarkSet], raw: &RawMetrics, head: bool) -> BTreeMap<String, f64> {
    let mut collected: BTreeMap<&str, Vec<u32>> = BTreeMap::new();

    for set in sets {
        for entity in set.entities.values() {
            if entity.is_head != head {
                continue;
            }
            for query in &entity.queries {
                for (metric, scores) in raw.metrics() {
                    if let Some(score) = scores.get(&query.id) {
                        collected.entry(metric.as_str()).or_default().push(*score);
                    }
                }
            }
        }
    }

    collected
        .into_iter()
        .map(|(metric, scores)| (metric.to_owned(), mean_percent(scores.iter())))
        .collect()
}
