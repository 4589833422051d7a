//! Final content gate over grounded groups.
//!
//! A group only yields benchmark queries when the ambiguity is real on
//! both sides: at least two entities must still carry grounded facts, and
//! one of them must be the head entity. Everything else is discarded
//! whole.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ground::{GroundedGroup, GroundedMember};

/// A group that passed validation and is frozen for query generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedGroup {
    /// The shared name.
    pub name: String,
    /// Members keyed by entity ID.
    pub members: BTreeMap<String, GroundedMember>,
}

impl ValidatedGroup {
    /// Entity IDs of members that still carry facts.
    pub fn entities_with_facts(&self) -> impl Iterator<Item = &String> {
        self.members
            .iter()
            .filter(|(_, m)| !m.facts.is_empty())
            .map(|(id, _)| id)
    }
}

/// Validate one grounded group.
///
/// Returns `None` when fewer than two members carry facts or when the
/// head entity carries none.
#[must_use]
pub fn validate_group(group: GroundedGroup) -> Option<ValidatedGroup> {
    let mut members_with_facts = 0;
    let mut head_has_facts = false;

    for member in group.members.values() {
        if !member.facts.is_empty() {
            members_with_facts += 1;
            if member.is_head {
                head_has_facts = true;
            }
        }
    }

    if members_with_facts >= 2 && head_has_facts {
        Some(ValidatedGroup {
            name: group.name,
            members: group.members,
        })
    } else {
        None
    }
}

/// Validate a batch of groups, preserving order.
#[must_use]
pub fn validate_groups(groups: Vec<GroundedGroup>) -> Vec<ValidatedGroup> {
    groups.into_iter().filter_map(validate_group).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{RawValue, Value};
    use crate::ground::{DocRef, Fact};

    fn fact() -> Fact {
        Fact {
            id: "abc".to_owned(),
            property: "occupation".to_owned(),
            values: vec![Value {
                kind: RawValue::Entity {
                    id: "Q0".to_owned(),
                },
                aliases: vec!["athlete".to_owned()],
                additional_aliases: Vec::new(),
                entity_types: Vec::new(),
            }],
            provenance: vec![DocRef::new("100", "Jordan")],
        }
    }

    fn member(is_head: bool, with_fact: bool) -> GroundedMember {
        GroundedMember {
            popularity: if is_head { 100.0 } else { 10.0 },
            is_head,
            entity_types: vec!["Q5".to_owned()],
            articles: vec![DocRef::new("100", "Jordan")],
            facts: if with_fact {
                [("P106".to_owned(), fact())].into()
            } else {
                BTreeMap::new()
            },
        }
    }

    fn group(members: &[(&str, bool, bool)]) -> GroundedGroup {
        GroundedGroup {
            name: "Jordan".to_owned(),
            members: members
                .iter()
                .map(|(id, is_head, with_fact)| (id.to_string(), member(*is_head, *with_fact)))
                .collect(),
        }
    }

    #[test]
    fn test_valid_group_survives() {
        let validated = validate_group(group(&[
            ("Q1", true, true),
            ("Q2", false, true),
            ("Q3", false, false),
        ]));
        assert!(validated.is_some());
        let validated = validated.unwrap();
        assert_eq!(validated.entities_with_facts().count(), 2);
    }

    #[test]
    fn test_headless_facts_drop_group() {
        // Only tail entities carry facts: no query can target the head.
        assert!(validate_group(group(&[
            ("Q1", true, false),
            ("Q2", false, true),
            ("Q3", false, true),
        ]))
        .is_none());
    }

    #[test]
    fn test_single_facted_member_drops_group() {
        assert!(validate_group(group(&[
            ("Q1", true, true),
            ("Q2", false, false),
        ]))
        .is_none());
    }

    #[test]
    fn test_batch_preserves_order() {
        let validated = validate_groups(vec![
            group(&[("Q1", true, true), ("Q2", false, true)]),
            group(&[("Q3", true, false), ("Q4", false, true)]),
            group(&[("Q5", true, true), ("Q6", false, true)]),
        ]);
        assert_eq!(validated.len(), 2);
    }
}
