//! Selecting relations that distinguish entities within a group.
//!
//! A property is kept for a member only when it is allow-listed for one of
//! the member's entity types and no other member of the same group carries
//! it. Distinguishing-ness is group-scoped: the same property can
//! distinguish an entity under one name and be useless under another.
//!
//! Property occurrence is counted across the group before any value-level
//! pruning happens, so a property present on two members is removed from
//! both even if a later stage would have emptied one of them anyway. This
//! stage must therefore run before evidence grounding.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::group::{Member, NameGroup};

/// Config mapping entity type to the property IDs that distinguish
/// entities of that type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistinguishingProperties(BTreeMap<String, Vec<String>>);

impl DistinguishingProperties {
    /// Load the config from a JSON object file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build from an in-memory mapping.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, Vec<String>>) -> Self {
        DistinguishingProperties(map)
    }

    /// Entity types the config knows about.
    #[must_use]
    pub fn entity_types(&self) -> BTreeSet<String> {
        self.0.keys().cloned().collect()
    }

    /// Union of allow-listed properties across the given entity types.
    #[must_use]
    pub fn for_types(&self, types: &[String]) -> BTreeSet<&str> {
        types
            .iter()
            .filter_map(|t| self.0.get(t))
            .flatten()
            .map(String::as_str)
            .collect()
    }

    /// All properties mentioned anywhere in the config.
    #[must_use]
    pub fn property_set(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }
}

/// A name group after relation selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredGroup {
    /// The shared name.
    pub name: String,
    /// Members keyed by entity ID; relation tables now hold only
    /// distinguishing properties.
    pub members: BTreeMap<String, Member>,
}

/// Restrict every member's relation table to allow-listed properties that
/// are unique to that member within the group.
#[must_use]
pub fn select_relations(group: &NameGroup, allow: &DistinguishingProperties) -> FilteredGroup {
    // Occurrence counts over the unpruned group.
    let mut property_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for member in group.members.values() {
        for pid in member.relations.keys() {
            *property_counts.entry(pid).or_default() += 1;
        }
    }

    let mut members = BTreeMap::new();
    for (id, member) in &group.members {
        let allowed = allow.for_types(&member.entity_types);
        let relations: BTreeMap<_, _> = member
            .relations
            .iter()
            .filter(|(pid, relation)| {
                allowed.contains(pid.as_str())
                    && property_counts[pid.as_str()] == 1
                    && !relation.values.is_empty()
            })
            .map(|(pid, relation)| (pid.clone(), relation.clone()))
            .collect();

        members.insert(
            id.clone(),
            Member {
                popularity: member.popularity,
                is_head: member.is_head,
                entity_types: member.entity_types.clone(),
                relations,
            },
        );
    }

    FilteredGroup {
        name: group.name.clone(),
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawValue, Relation, Value};

    fn value(alias: &str) -> Value {
        Value {
            kind: RawValue::Entity {
                id: "Q0".to_owned(),
            },
            aliases: vec![alias.to_owned()],
            additional_aliases: Vec::new(),
            entity_types: Vec::new(),
        }
    }

    fn relation(property: &str, aliases: &[&str]) -> Relation {
        Relation {
            property: property.to_owned(),
            values: aliases.iter().map(|a| value(a)).collect(),
        }
    }

    fn member(is_head: bool, relations: &[(&str, Relation)]) -> Member {
        Member {
            popularity: if is_head { 100.0 } else { 10.0 },
            is_head,
            entity_types: vec!["Q5".to_owned()],
            relations: relations
                .iter()
                .map(|(pid, r)| (pid.to_string(), r.clone()))
                .collect(),
        }
    }

    fn allow_occupation_and_country() -> DistinguishingProperties {
        DistinguishingProperties::from_map(
            [(
                "Q5".to_owned(),
                vec!["P106".to_owned(), "P27".to_owned()],
            )]
            .into(),
        )
    }

    #[test]
    fn test_shared_property_removed_from_all_members() {
        let group = NameGroup {
            name: "Jordan".to_owned(),
            members: [
                (
                    "Q1".to_owned(),
                    member(
                        true,
                        &[
                            ("P27", relation("country", &["USA"])),
                            ("P106", relation("occupation", &["athlete"])),
                        ],
                    ),
                ),
                (
                    "Q2".to_owned(),
                    member(false, &[("P27", relation("country", &["USA"]))]),
                ),
            ]
            .into(),
        };

        let filtered = select_relations(&group, &allow_occupation_and_country());
        assert_eq!(
            filtered.members["Q1"].relations.keys().collect::<Vec<_>>(),
            ["P106"]
        );
        assert!(filtered.members["Q2"].relations.is_empty());
    }

    #[test]
    fn test_non_allowlisted_property_removed() {
        let group = NameGroup {
            name: "Jordan".to_owned(),
            members: [
                (
                    "Q1".to_owned(),
                    member(true, &[("P569", relation("date of birth", &["1963"]))]),
                ),
                (
                    "Q2".to_owned(),
                    member(false, &[("P106", relation("occupation", &["scientist"]))]),
                ),
            ]
            .into(),
        };

        let filtered = select_relations(&group, &allow_occupation_and_country());
        assert!(filtered.members["Q1"].relations.is_empty());
        assert_eq!(filtered.members["Q2"].relations.len(), 1);
    }

    #[test]
    fn test_empty_valued_property_removed_but_still_counts() {
        // P106 appears on both members. Q2's copy has no values left, but
        // it still makes the property non-distinguishing for Q1.
        let group = NameGroup {
            name: "Jordan".to_owned(),
            members: [
                (
                    "Q1".to_owned(),
                    member(true, &[("P106", relation("occupation", &["athlete"]))]),
                ),
                (
                    "Q2".to_owned(),
                    member(false, &[("P106", relation("occupation", &[]))]),
                ),
            ]
            .into(),
        };

        let filtered = select_relations(&group, &allow_occupation_and_country());
        assert!(filtered.members["Q1"].relations.is_empty());
        assert!(filtered.members["Q2"].relations.is_empty());
    }

    #[test]
    fn test_input_group_is_untouched() {
        let group = NameGroup {
            name: "Jordan".to_owned(),
            members: [
                (
                    "Q1".to_owned(),
                    member(true, &[("P569", relation("date of birth", &["1963"]))]),
                ),
                (
                    "Q2".to_owned(),
                    member(false, &[("P106", relation("occupation", &["scientist"]))]),
                ),
            ]
            .into(),
        };

        let _ = select_relations(&group, &allow_occupation_and_country());
        assert_eq!(group.members["Q1"].relations.len(), 1);
    }
}
