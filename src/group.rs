//! Grouping entities that share a surface name.
//!
//! Every alias of every catalog entity nominates that entity into the
//! alias's group. A group survives when, after restricting members to the
//! entity types the run is configured for, at least two entities remain
//! and the most popular entity is meaningfully more popular than the
//! runner-up. Head entities are marked before the type restriction, so a
//! group whose head is filtered out carries no head flag and is discarded
//! later by validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{EntityCatalog, Relation};

/// Relative popularity gap required between the top two entities of a
/// group: `(p0 - p1) / (0.5 * p0 + 0.5 * p1)`.
pub const DEFAULT_MIN_POPULARITY_GAP: f64 = 0.10;

/// One entity's membership in a name group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Popularity score copied from the catalog.
    pub popularity: f64,
    /// True for the entity (or entities tied) with maximum popularity
    /// among everything sharing the name.
    pub is_head: bool,
    /// Entity-type tags.
    pub entity_types: Vec<String>,
    /// Relation table, progressively narrowed by later stages.
    pub relations: BTreeMap<String, Relation>,
}

/// Entities sharing one surface name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameGroup {
    /// The shared name.
    pub name: String,
    /// Members keyed by entity ID.
    pub members: BTreeMap<String, Member>,
}

/// Group catalog entities by shared alias.
///
/// `allowed_types` is the set of entity types the run distinguishes
/// (the keys of the distinguishing-property config); entities without a
/// matching type are dropped from groups after head marking. Groups are
/// returned sorted by name. Pure function over the catalog.
#[must_use]
pub fn group_by_name(
    catalog: &EntityCatalog,
    allowed_types: &BTreeSet<String>,
    min_popularity_gap: f64,
) -> Vec<NameGroup> {
    // Every alias nominates its entity.
    let mut names: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (id, entity) in catalog.entities() {
        for alias in &entity.aliases {
            names.entry(alias).or_default().insert(id);
        }
    }

    let mut groups = Vec::new();
    for (name, ids) in names {
        let max_popularity = ids
            .iter()
            .filter_map(|id| catalog.get(id))
            .map(|e| e.popularity)
            .fold(f64::NEG_INFINITY, f64::max);

        // Head flags are fixed against the full name-sharing set; the type
        // restriction below must not promote a tail entity to head.
        let mut members = BTreeMap::new();
        for id in ids {
            let Some(entity) = catalog.get(id) else {
                continue;
            };
            if !entity.entity_types.iter().any(|t| allowed_types.contains(t)) {
                continue;
            }
            members.insert(
                id.to_owned(),
                Member {
                    popularity: entity.popularity,
                    is_head: entity.popularity == max_popularity,
                    entity_types: entity.entity_types.clone(),
                    relations: entity.relations.clone(),
                },
            );
        }

        if members.len() < 2 {
            continue;
        }

        let mut popularity: Vec<f64> = members.values().map(|m| m.popularity).collect();
        popularity.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let gap = (popularity[0] - popularity[1]) / (0.5 * popularity[0] + 0.5 * popularity[1]);
        if gap >= min_popularity_gap {
            groups.push(NameGroup {
                name: name.to_owned(),
                members,
            });
        }
    }

    groups
}
