//! Generating benchmark query instances from validated groups.
//!
//! Every surviving fact yields up to three task formats: a QA question, a
//! fact-checking pair (one SUPPORTS claim built from a grounded alias and
//! one REFUTES claim built from a popular wrong answer), and a
//! slot-filling input. Instance IDs are `factID + "=" + md5(input)`, so
//! identical input text under two different facts still produces distinct
//! IDs, and re-runs reproduce IDs byte for byte.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::PopularValues;
use crate::error::{Error, Result};
use crate::ground::{md5_hex, Corpus, DocRef, Fact};
use crate::template::{choose, FcTemplates, QaTemplates};
use crate::text;
use crate::validate::ValidatedGroup;

/// Separator between the entity name and property label in slot-filling
/// inputs.
pub const SLOT_SEPARATOR: &str = " [SEP] ";

/// Verdict label of a fact-checking instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FactLabel {
    /// The claim is supported by the entity's documents.
    #[serde(rename = "SUPPORTS")]
    Supports,
    /// The claim contradicts the entity's documents.
    #[serde(rename = "REFUTES")]
    Refutes,
}

/// Expected output of a query instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    /// Acceptable answer strings (QA and slot filling).
    Aliases(Vec<String>),
    /// Fact-checking verdict.
    Label(FactLabel),
}

/// Alias breakdown carried alongside the expected output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputMeta {
    /// Canonical answer aliases.
    pub values: Vec<String>,
    /// Looser derived aliases.
    pub additional_values: Vec<String>,
}

/// Expected output: answer, gold documents, and alias breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    /// Expected answer or verdict.
    pub answer: Answer,
    /// Gold documents supporting the fact.
    pub provenance: Vec<DocRef>,
    /// Alias breakdown.
    pub meta: OutputMeta,
}

/// Instance metadata linking back to the originating property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMeta {
    /// Property ID of the originating fact.
    pub pid: String,
}

/// One generated benchmark example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryInstance {
    /// Unique, deterministic instance ID.
    pub id: String,
    /// Natural-language input.
    pub input: String,
    /// Expected output.
    pub output: QueryOutput,
    /// Instance metadata.
    pub meta: QueryMeta,
}

/// All instances generated for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityQueries {
    /// Head flag, fixed at grouping time.
    pub is_head: bool,
    /// Popularity score.
    pub popularity: f64,
    /// Documents linked to the entity.
    pub articles: Vec<DocRef>,
    /// Generated instances.
    pub queries: Vec<QueryInstance>,
}

/// A benchmark set: one name group's instances for one task format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSet {
    /// The shared name.
    pub name: String,
    /// Per-entity instances keyed by entity ID.
    pub entities: BTreeMap<String, EntityQueries>,
}

/// Substitute placeholders into a template.
///
/// Fails when a substituted literal does not appear in the result, which
/// means the template is malformed (a missing or mangled placeholder)
/// and the instance could never be verified.
pub fn fill_template(template: &str, substitutions: &[(&str, &str)]) -> Result<String> {
    let mut filled = template.to_owned();
    for (placeholder, value) in substitutions {
        filled = filled.replace(placeholder, value);
    }
    for (placeholder, value) in substitutions {
        if !filled.contains(value) {
            return Err(Error::template(format!(
                "template {template:?} lost substitution {placeholder} = {value:?}"
            )));
        }
    }
    Ok(filled)
}

fn instance_id(fact_id: &str, input: &str) -> String {
    format!("{}={}", fact_id, md5_hex(input.as_bytes()))
}

fn alias_union(fact: &Fact) -> (Vec<String>, Vec<String>) {
    let mut values = Vec::new();
    let mut additional = Vec::new();
    for value in &fact.values {
        values.extend(value.aliases.iter().cloned());
        additional.extend(value.additional_aliases.iter().cloned());
    }
    (values, additional)
}

fn entity_queries(member: &crate::ground::GroundedMember, queries: Vec<QueryInstance>) -> EntityQueries {
    EntityQueries {
        is_head: member.is_head,
        popularity: member.popularity,
        articles: member.articles.clone(),
        queries,
    }
}

/// Generate question-answering instances for all groups.
pub fn generate_qa(groups: &[ValidatedGroup], templates: &QaTemplates) -> Result<Vec<BenchmarkSet>> {
    let mut sets = Vec::with_capacity(groups.len());

    for group in groups {
        let mut entities = BTreeMap::new();
        for (entity_id, member) in &group.members {
            let mut queries = Vec::new();
            for (pid, fact) in &member.facts {
                let value_types: Vec<String> = fact
                    .values
                    .iter()
                    .flat_map(|v| v.entity_types.iter().cloned())
                    .collect();

                let candidates = templates.candidates(pid, &value_types)?;
                let template = choose(&candidates, entity_id, pid)
                    .ok_or_else(|| Error::template(format!("no template choice for {pid}")))?;

                let input = fill_template(template, &[("$entity", group.name.as_str())])?;
                let (values, additional) = alias_union(fact);
                let answer: Vec<String> =
                    values.iter().chain(additional.iter()).cloned().collect();

                queries.push(QueryInstance {
                    id: instance_id(&fact.id, &input),
                    input,
                    output: QueryOutput {
                        answer: Answer::Aliases(answer),
                        provenance: fact.provenance.clone(),
                        meta: OutputMeta {
                            values,
                            additional_values: additional,
                        },
                    },
                    meta: QueryMeta { pid: pid.clone() },
                });
            }
            entities.insert(entity_id.clone(), entity_queries(member, queries));
        }
        sets.push(BenchmarkSet {
            name: group.name.clone(),
            entities,
        });
    }

    Ok(sets)
}

/// Generate fact-checking instance pairs for all groups.
///
/// Each fact yields a SUPPORTS claim from a grounded alias and, when a
/// non-colliding popular wrong answer exists, a REFUTES claim from it.
/// The REFUTES half is silently omitted when every popular value collides
/// with the fact's own aliases.
pub fn generate_fc(
    groups: &[ValidatedGroup],
    templates: &FcTemplates,
    popular: &PopularValues,
    corpus: &dyn Corpus,
    window: usize,
) -> Result<Vec<BenchmarkSet>> {
    let mut sets = Vec::with_capacity(groups.len());

    for group in groups {
        let mut entities = BTreeMap::new();
        for (entity_id, member) in &group.members {
            let mut queries = Vec::new();
            for (pid, fact) in &member.facts {
                let candidates = templates.candidates(pid)?;
                let template = choose(&candidates, entity_id, pid)
                    .ok_or_else(|| Error::template(format!("no template choice for {pid}")))?;

                let Some(supported) = grounded_object(fact, corpus, window) else {
                    log::warn!(
                        "no grounded alias for fact {} ({}/{}); skipping FC pair",
                        fact.id,
                        entity_id,
                        pid
                    );
                    continue;
                };

                let (values, additional) = alias_union(fact);

                let input = fill_template(
                    template,
                    &[("$entity", group.name.as_str()), ("$object", supported)],
                )?;
                queries.push(QueryInstance {
                    id: instance_id(&fact.id, &input),
                    input,
                    output: QueryOutput {
                        answer: Answer::Label(FactLabel::Supports),
                        provenance: fact.provenance.clone(),
                        meta: OutputMeta {
                            values: values.clone(),
                            additional_values: additional.clone(),
                        },
                    },
                    meta: QueryMeta { pid: pid.clone() },
                });

                if let Some(wrong) = wrong_answer(fact, popular.ranked(pid)) {
                    let input = fill_template(
                        template,
                        &[("$entity", group.name.as_str()), ("$object", wrong)],
                    )?;
                    queries.push(QueryInstance {
                        id: instance_id(&fact.id, &input),
                        input,
                        output: QueryOutput {
                            answer: Answer::Label(FactLabel::Refutes),
                            provenance: fact.provenance.clone(),
                            meta: OutputMeta {
                                values,
                                additional_values: additional,
                            },
                        },
                        meta: QueryMeta { pid: pid.clone() },
                    });
                }
            }
            entities.insert(entity_id.clone(), entity_queries(member, queries));
        }
        sets.push(BenchmarkSet {
            name: group.name.clone(),
            entities,
        });
    }

    Ok(sets)
}

/// Generate slot-filling instances for all groups.
#[must_use]
pub fn generate_sf(groups: &[ValidatedGroup]) -> Vec<BenchmarkSet> {
    let mut sets = Vec::with_capacity(groups.len());

    for group in groups {
        let mut entities = BTreeMap::new();
        for (entity_id, member) in &group.members {
            let mut queries = Vec::new();
            for (pid, fact) in &member.facts {
                let input = format!("{}{}{}", group.name, SLOT_SEPARATOR, fact.property);
                let (values, additional) = alias_union(fact);
                let answer: Vec<String> =
                    values.iter().chain(additional.iter()).cloned().collect();

                queries.push(QueryInstance {
                    id: instance_id(&fact.id, &input),
                    input,
                    output: QueryOutput {
                        answer: Answer::Aliases(answer),
                        provenance: fact.provenance.clone(),
                        meta: OutputMeta {
                            values,
                            additional_values: additional,
                        },
                    },
                    meta: QueryMeta { pid: pid.clone() },
                });
            }
            entities.insert(entity_id.clone(), entity_queries(member, queries));
        }
        sets.push(BenchmarkSet {
            name: group.name.clone(),
            entities,
        });
    }

    sets
}

/// The claim object for a SUPPORTS instance: the last canonical alias of
/// the first value re-verified against a provenance document.
fn grounded_object<'a>(fact: &'a Fact, corpus: &dyn Corpus, window: usize) -> Option<&'a str> {
    let docs: Vec<String> = fact
        .provenance
        .iter()
        .filter_map(|doc| corpus.document_text(&doc.document_id))
        .map(|doc| text::leading_window(&doc, window))
        .collect();

    for value in &fact.values {
        let grounded = value
            .aliases
            .iter()
            .chain(value.additional_aliases.iter())
            .any(|alias| docs.iter().any(|doc| text::groundable(alias, doc)));
        if grounded {
            return value.aliases.last().map(String::as_str);
        }
    }
    None
}

/// The most popular observed value that does not collide with any of the
/// fact's own canonical aliases.
fn wrong_answer<'a>(fact: &Fact, ranked: &'a [String]) -> Option<&'a str> {
    let own: BTreeSet<&str> = fact
        .values
        .iter()
        .flat_map(|v| v.aliases.iter())
        .map(String::as_str)
        .collect();

    ranked
        .iter()
        .map(String::as_str)
        .find(|candidate| !own.contains(candidate))
}
