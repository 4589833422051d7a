//! Entity catalog: the read-only knowledge-base snapshot the pipeline
//! consumes.
//!
//! The catalog is produced by an external dump-extraction step as a single
//! JSON mapping from identifier to record. Entity identifiers and property
//! identifiers share the map; property records (IDs starting with `P`)
//! contribute only their label. Construction enriches every relation value
//! in place:
//!
//! - entity-reference values get the referenced entity's aliases, the
//!   aliases of its participants (e.g. "guitar" → "guitarist") as looser
//!   additional aliases, and its entity types;
//! - quantity values get the signed amount with the sign stripped as their
//!   alias and the amount spelled out in words as an additional alias.
//!
//! Values left without any alias are removed. After construction the
//! catalog is immutable.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::text;

/// Properties whose values "participate in" an entity, mined for looser
/// answer aliases: practiced-by and used-by.
const PARTICIPANT_PROPERTIES: [&str; 2] = ["P3095", "P1535"];

/// A raw relation value as emitted by the dump extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RawValue {
    /// Reference to another catalog entity.
    Entity {
        /// Identifier of the referenced entity.
        id: String,
    },
    /// A signed numeric quantity.
    Quantity {
        /// Amount string, prefixed with `+` or `-` by the extraction
        /// contract.
        amount: String,
        /// Unit identifier (may be the unitless sentinel `1`).
        unit: String,
    },
}

/// One record of the raw catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// Canonical label.
    pub label: String,
    /// Alias strings, including the label where the extraction emits it.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Entity-type tags.
    #[serde(default)]
    pub entity_types: Vec<String>,
    /// Popularity score (monotonic transform of real-world usage).
    #[serde(default)]
    pub popularity: f64,
    /// Relation table: property ID to raw values.
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<RawValue>>,
}

/// An enriched relation value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    /// The underlying raw value.
    #[serde(flatten)]
    pub kind: RawValue,
    /// Literal answer forms the grounding check may match.
    pub aliases: Vec<String>,
    /// Looser derived forms (participant names, numbers in words).
    pub additional_aliases: Vec<String>,
    /// Entity types of the referenced entity (empty for quantities).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<String>,
}

/// A relation: a labeled property with its enriched values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    /// Natural-language label of the property.
    pub property: String,
    /// Enriched values; every value has at least one alias.
    pub values: Vec<Value>,
}

/// An immutable catalog entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical label.
    pub label: String,
    /// Alias strings this entity is known by.
    pub aliases: Vec<String>,
    /// Popularity score.
    pub popularity: f64,
    /// Entity-type tags.
    pub entity_types: Vec<String>,
    /// Relation table keyed by property ID.
    pub relations: BTreeMap<String, Relation>,
}

/// Read-only index of entities and property labels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityCatalog {
    entities: BTreeMap<String, Entity>,
    property_labels: BTreeMap<String, String>,
}

impl EntityCatalog {
    /// Build a catalog from raw records, enriching all relation values.
    ///
    /// Fails on a quantity amount without a leading sign or on a relation
    /// whose property has no label record, both of which indicate a broken
    /// extraction rather than bad data.
    pub fn from_records(records: BTreeMap<String, RawRecord>) -> Result<Self> {
        let mut property_labels = BTreeMap::new();
        for (id, record) in &records {
            if id.starts_with('P') {
                property_labels.insert(id.clone(), record.label.clone());
            }
        }

        let mut entities = BTreeMap::new();
        for (id, record) in &records {
            if id.starts_with('P') {
                continue;
            }

            let mut relations = BTreeMap::new();
            for (pid, raw_values) in &record.relations {
                let property = property_labels
                    .get(pid)
                    .ok_or_else(|| {
                        Error::catalog(format!("no label for property {pid} (entity {id})"))
                    })?
                    .clone();

                let mut values = Vec::new();
                for raw in raw_values {
                    let value = enrich_value(&records, id, pid, raw)?;
                    if !value.aliases.is_empty() {
                        values.push(value);
                    }
                }

                relations.insert(pid.clone(), Relation { property, values });
            }

            entities.insert(
                id.clone(),
                Entity {
                    label: record.label.clone(),
                    aliases: record.aliases.clone(),
                    popularity: record.popularity,
                    entity_types: record.entity_types.clone(),
                    relations,
                },
            );
        }

        Ok(EntityCatalog {
            entities,
            property_labels,
        })
    }

    /// Load a catalog from a JSON file of raw records.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let records: BTreeMap<String, RawRecord> = serde_json::from_reader(reader)?;
        Self::from_records(records)
    }

    /// Look up an entity by ID.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Iterate over all entities in ID order.
    pub fn entities(&self) -> impl Iterator<Item = (&String, &Entity)> {
        self.entities.iter()
    }

    /// Number of entities in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the catalog holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Natural-language label of a property.
    #[must_use]
    pub fn property_label(&self, pid: &str) -> Option<&str> {
        self.property_labels.get(pid).map(String::as_str)
    }
}

fn enrich_value(
    records: &BTreeMap<String, RawRecord>,
    entity_id: &str,
    pid: &str,
    raw: &RawValue,
) -> Result<Value> {
    match raw {
        RawValue::Entity { id } => {
            // A referent missing from the catalog yields no aliases; the
            // value is pruned and the fact drops downstream.
            let referent = records.get(id);
            let aliases = referent.map(|r| r.aliases.clone()).unwrap_or_default();
            let entity_types = referent.map(|r| r.entity_types.clone()).unwrap_or_default();

            let mut additional = BTreeSet::new();
            if let Some(referent) = referent {
                for participant_pid in PARTICIPANT_PROPERTIES {
                    for value in referent.relations.get(participant_pid).into_iter().flatten() {
                        if let RawValue::Entity { id: participant } = value {
                            if let Some(participant) = records.get(participant) {
                                additional.extend(participant.aliases.iter().cloned());
                            }
                        }
                    }
                }
            }

            Ok(Value {
                kind: raw.clone(),
                aliases,
                additional_aliases: additional.into_iter().collect(),
                entity_types,
            })
        }
        RawValue::Quantity { amount, .. } => {
            let unsigned = amount
                .strip_prefix(['+', '-'])
                .ok_or_else(|| {
                    Error::catalog(format!(
                        "quantity amount {amount:?} for {entity_id}/{pid} has no sign prefix"
                    ))
                })?
                .to_owned();

            let additional_aliases = text::spell_integer(&unsigned).into_iter().collect();
            Ok(Value {
                kind: raw.clone(),
                aliases: vec![unsigned],
                additional_aliases,
                entity_types: Vec::new(),
            })
        }
    }
}

/// Popularity-ranked observed values per property, used to pick
/// plausible-but-wrong answers for fact-checking instances.
///
/// Built once over the whole catalog and passed read-only into query
/// generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopularValues {
    by_property: BTreeMap<String, Vec<String>>,
}

impl PopularValues {
    /// How many top values are retained per property.
    pub const DEFAULT_TOP: usize = 20;

    /// Build from an already-ranked mapping.
    #[must_use]
    pub fn from_map(by_property: BTreeMap<String, Vec<String>>) -> Self {
        PopularValues { by_property }
    }

    /// Count each value's last canonical alias across all entities,
    /// keeping the `top` most frequent per property.
    ///
    /// Only the given properties are tabulated. Ties are broken by alias
    /// so the table is identical across runs.
    #[must_use]
    pub fn build(catalog: &EntityCatalog, properties: &BTreeSet<String>, top: usize) -> Self {
        let mut counts: BTreeMap<&str, BTreeMap<&str, usize>> = BTreeMap::new();

        for (_, entity) in catalog.entities() {
            for (pid, relation) in &entity.relations {
                if !properties.contains(pid) {
                    continue;
                }
                for value in &relation.values {
                    if let Some(alias) = value.aliases.last() {
                        *counts.entry(pid).or_default().entry(alias).or_default() += 1;
                    }
                }
            }
        }

        let mut by_property = BTreeMap::new();
        for (pid, alias_counts) in counts {
            let mut ranked: Vec<(&str, usize)> = alias_counts.into_iter().collect();
            ranked.sort_by(|(a_alias, a_count), (b_alias, b_count)| {
                b_count.cmp(a_count).then_with(|| a_alias.cmp(b_alias))
            });
            by_property.insert(
                pid.to_owned(),
                ranked
                    .into_iter()
                    .take(top)
                    .map(|(alias, _)| alias.to_owned())
                    .collect(),
            );
        }

        PopularValues { by_property }
    }

    /// The ranked values for a property, most popular first.
    #[must_use]
    pub fn ranked(&self, pid: &str) -> &[String] {
        self.by_property.get(pid).map(Vec::as_slice).unwrap_or(&[])
    }
}
