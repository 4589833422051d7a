//! End-to-end pipeline: catalog in, benchmark sets out.
//!
//! Stages run strictly forward, each producing a fresh structure and a
//! JSONL snapshot, so every filter's effect stays inspectable:
//!
//! ```text
//! group       tmp/polysemous_names.jsonl
//! select      tmp/filtered_relations.jsonl
//! ground      (parallel across groups)
//! validate    benchmark_tuples.jsonl
//! generate    qa|fc|sf/benchmark_sets.jsonl
//! ```

use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::catalog::{EntityCatalog, PopularValues};
use crate::error::Result;
use crate::generate::{generate_fc, generate_qa, generate_sf, BenchmarkSet};
use crate::ground::{ground_group, Corpus, GrounderConfig};
use crate::group::{group_by_name, DEFAULT_MIN_POPULARITY_GAP};
use crate::select::{select_relations, DistinguishingProperties};
use crate::template::{FcTemplates, QaTemplates};
use crate::validate::{validate_groups, ValidatedGroup};

/// Pipeline tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Minimum relative popularity gap between a group's top two
    /// entities.
    pub min_popularity_gap: f64,
    /// Grounding configuration.
    pub grounder: GrounderConfig,
    /// Popular values retained per property for REFUTES selection.
    pub popular_top: usize,
    /// Whether to draw progress bars.
    pub progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            min_popularity_gap: DEFAULT_MIN_POPULARITY_GAP,
            grounder: GrounderConfig::default(),
            popular_top: PopularValues::DEFAULT_TOP,
            progress: true,
        }
    }
}

/// Counts reported after a pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineSummary {
    /// Polysemous-name groups found.
    pub grouped: usize,
    /// Groups surviving validation.
    pub validated: usize,
    /// Generated QA instances.
    pub qa_instances: usize,
    /// Generated fact-checking instances.
    pub fc_instances: usize,
    /// Generated slot-filling instances.
    pub sf_instances: usize,
}

/// Run the full pipeline and persist every stage under `out_dir`.
pub fn run(
    catalog: &EntityCatalog,
    corpus: &dyn Corpus,
    allow: &DistinguishingProperties,
    qa_templates: &QaTemplates,
    fc_templates: &FcTemplates,
    out_dir: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<PipelineSummary> {
    let out_dir = out_dir.as_ref();
    for sub in ["tmp", "qa", "fc", "sf"] {
        fs::create_dir_all(out_dir.join(sub))?;
    }

    let allowed_types = allow.entity_types();
    let groups = group_by_name(catalog, &allowed_types, config.min_popularity_gap);
    log::info!("grouped {} polysemous names", groups.len());
    write_jsonl(out_dir.join("tmp/polysemous_names.jsonl"), &groups)?;

    let filtered: Vec<_> = groups.iter().map(|g| select_relations(g, allow)).collect();
    write_jsonl(out_dir.join("tmp/filtered_relations.jsonl"), &filtered)?;

    let bar = progress_bar(config.progress, filtered.len(), "grounding");
    let grounded: Vec<_> = filtered
        .par_iter()
        .map(|group| {
            let grounded = ground_group(group, corpus, &config.grounder);
            bar.inc(1);
            grounded
        })
        .collect();
    bar.finish_and_clear();

    let validated = validate_groups(grounded);
    log::info!(
        "{} of {} groups survived grounding and validation",
        validated.len(),
        groups.len()
    );
    write_jsonl(out_dir.join("benchmark_tuples.jsonl"), &validated)?;

    let popular = PopularValues::build(catalog, &allow.property_set(), config.popular_top);

    let qa = generate_qa(&validated, qa_templates)?;
    write_jsonl(out_dir.join("qa/benchmark_sets.jsonl"), &qa)?;

    let fc = generate_fc(
        &validated,
        fc_templates,
        &popular,
        corpus,
        config.grounder.window,
    )?;
    write_jsonl(out_dir.join("fc/benchmark_sets.jsonl"), &fc)?;

    let sf = generate_sf(&validated);
    write_jsonl(out_dir.join("sf/benchmark_sets.jsonl"), &sf)?;

    let summary = PipelineSummary {
        grouped: groups.len(),
        validated: validated.len(),
        qa_instances: count_instances(&qa),
        fc_instances: count_instances(&fc),
        sf_instances: count_instances(&sf),
    };
    log::info!(
        "generated {} QA, {} FC, {} SF instances",
        summary.qa_instances,
        summary.fc_instances,
        summary.sf_instances
    );
    Ok(summary)
}

/// Total query instances across benchmark sets.
#[must_use]
pub fn count_instances(sets: &[BenchmarkSet]) -> usize {
    sets.iter()
        .flat_map(|s| s.entities.values())
        .map(|e| e.queries.len())
        .sum()
}

/// Read a JSONL file into a vector of records.
pub fn read_jsonl<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Vec<T>> {
    let reader = BufReader::new(fs::File::open(path)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line)?);
    }
    Ok(records)
}

/// Write records to a JSONL file, one record per line.
pub fn write_jsonl<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(fs::File::create(path)?);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn progress_bar(enabled: bool, len: usize, message: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    bar.set_message(message);
    bar
}

/// Statistics over validated benchmark tuples, mirroring what the
/// original reporting tool printed.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SetStatistics {
    /// Number of benchmark sets.
    pub sets: usize,
    /// Entities across all sets.
    pub entities: usize,
    /// Entities that carry at least one fact.
    pub entities_with_facts: usize,
    /// Total facts.
    pub facts: usize,
    /// Share of facts per property, as a percentage, keyed by entity
    /// type then property ID.
    pub property_share: std::collections::BTreeMap<String, std::collections::BTreeMap<String, f64>>,
}

impl SetStatistics {
    /// Compute statistics over validated groups.
    #[must_use]
    pub fn compute(groups: &[ValidatedGroup], allow: &DistinguishingProperties) -> Self {
        let known_types = allow.entity_types();
        let mut stats = SetStatistics {
            sets: groups.len(),
            ..Default::default()
        };

        let mut counts: std::collections::BTreeMap<String, std::collections::BTreeMap<String, usize>> =
            Default::default();
        for group in groups {
            for member in group.members.values() {
                stats.entities += 1;
                if !member.facts.is_empty() {
                    stats.entities_with_facts += 1;
                    stats.facts += member.facts.len();
                }
                for pid in member.facts.keys() {
                    for entity_type in &member.entity_types {
                        if known_types.contains(entity_type) {
                            *counts
                                .entry(entity_type.clone())
                                .or_default()
                                .entry(pid.clone())
                                .or_default() += 1;
                        }
                    }
                }
            }
        }

        if stats.facts > 0 {
            for (entity_type, per_pid) in counts {
                let shares = per_pid
                    .into_iter()
                    .map(|(pid, count)| (pid, 100.0 * count as f64 / stats.facts as f64))
                    .collect();
                stats.property_share.insert(entity_type, shares);
            }
        }
        stats
    }
}

impl std::fmt::Display for SetStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "# of benchmark sets: {}", self.sets)?;
        let sets = self.sets.max(1) as f64;
        writeln!(f, "Avg. # entities per set: {:.2}", self.entities as f64 / sets)?;
        writeln!(
            f,
            "Avg. # entities with facts per set: {:.2}",
            self.entities_with_facts as f64 / sets
        )?;
        writeln!(f, "Avg. # facts per set: {:.2}", self.facts as f64 / sets)?;
        for (entity_type, shares) in &self.property_share {
            writeln!(f, "{entity_type}:")?;
            for (pid, share) in shares {
                writeln!(f, "  {pid}: {share:.2}%")?;
            }
        }
        Ok(())
    }
}
