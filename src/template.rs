//! Natural-language query templates and deterministic template choice.
//!
//! QA templates are keyed by property and then by answer-value entity
//! type, with an `"all"` bucket as fallback; fact-checking templates are a
//! flat list per property. Template choice is a pure hash of the entity
//! and property IDs, so re-runs (and parallel runs) pick identical
//! templates without any persisted seed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name of the fallback bucket in QA template sets.
pub const ALL_BUCKET: &str = "all";

/// QA templates: property ID → value entity type (or `"all"`) → templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QaTemplates(BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl QaTemplates {
    /// Load from a JSON object file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build from an in-memory mapping.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, BTreeMap<String, Vec<String>>>) -> Self {
        QaTemplates(map)
    }

    /// Candidate templates for a fact: the buckets matching the fact's
    /// value entity types, or the `"all"` bucket when none match.
    pub fn candidates(&self, property_id: &str, value_types: &[String]) -> Result<Vec<&str>> {
        let buckets = self.0.get(property_id).ok_or_else(|| {
            Error::template(format!("no QA templates configured for {property_id}"))
        })?;

        let mut candidates: Vec<&str> = value_types
            .iter()
            .filter_map(|t| buckets.get(t))
            .flatten()
            .map(String::as_str)
            .collect();

        if candidates.is_empty() {
            candidates = buckets
                .get(ALL_BUCKET)
                .ok_or_else(|| {
                    Error::template(format!(
                        "no {ALL_BUCKET:?} bucket in QA templates for {property_id}"
                    ))
                })?
                .iter()
                .map(String::as_str)
                .collect();
        }

        if candidates.is_empty() {
            return Err(Error::template(format!(
                "empty QA template list for {property_id}"
            )));
        }
        Ok(candidates)
    }
}

/// Fact-checking templates: property ID → declarative templates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FcTemplates(BTreeMap<String, Vec<String>>);

impl FcTemplates {
    /// Load from a JSON object file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Build from an in-memory mapping.
    #[must_use]
    pub fn from_map(map: BTreeMap<String, Vec<String>>) -> Self {
        FcTemplates(map)
    }

    /// Templates for a property.
    pub fn candidates(&self, property_id: &str) -> Result<Vec<&str>> {
        let templates = self.0.get(property_id).ok_or_else(|| {
            Error::template(format!("no FC templates configured for {property_id}"))
        })?;
        if templates.is_empty() {
            return Err(Error::template(format!(
                "empty FC template list for {property_id}"
            )));
        }
        Ok(templates.iter().map(String::as_str).collect())
    }
}

/// Deterministically choose a template for an (entity, property) pair.
///
/// The index is derived from the md5 digest of the two IDs, so the choice
/// is stable across runs, processing orders, and machines.
#[must_use]
pub fn choose<'a>(templates: &[&'a str], entity_id: &str, property_id: &str) -> Option<&'a str> {
    if templates.is_empty() {
        return None;
    }
    let canonical = serde_json::to_string(&[entity_id, property_id]).ok()?;
    let digest = Md5::digest(canonical.as_bytes());
    let seed = u64::from_be_bytes(digest[..8].try_into().ok()?);
    Some(templates[(seed % templates.len() as u64) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qa() -> QaTemplates {
        QaTemplates::from_map(
            [(
                "P106".to_owned(),
                [
                    (
                        ALL_BUCKET.to_owned(),
                        vec!["What does $entity do?".to_owned()],
                    ),
                    (
                        "Q28640".to_owned(),
                        vec!["What is the profession of $entity?".to_owned()],
                    ),
                ]
                .into(),
            )]
            .into(),
        )
    }

    #[test]
    fn test_typed_bucket_preferred() {
        let templates = qa();
        let candidates = templates
            .candidates("P106", &["Q28640".to_owned()])
            .unwrap();
        assert_eq!(candidates, ["What is the profession of $entity?"]);
    }

    #[test]
    fn test_all_bucket_fallback() {
        let templates = qa();
        let candidates = templates.candidates("P106", &["Q999".to_owned()]).unwrap();
        assert_eq!(candidates, ["What does $entity do?"]);
    }

    #[test]
    fn test_unconfigured_property_is_error() {
        assert!(qa().candidates("P569", &[]).is_err());
    }

    #[test]
    fn test_choice_is_deterministic() {
        let templates = ["t0", "t1", "t2", "t3", "t4"];
        let first = choose(&templates, "Q42", "P106").unwrap();
        for _ in 0..10 {
            assert_eq!(choose(&templates, "Q42", "P106").unwrap(), first);
        }
    }

    #[test]
    fn test_choice_depends_on_both_ids() {
        let templates: Vec<&str> = (0..64).map(|_| "t").collect();
        // With 64 identical slots the indices themselves must differ for
        // at least one of these pairs.
        let index = |e: &str, p: &str| {
            let canonical = serde_json::to_string(&[e, p]).unwrap();
            let digest = Md5::digest(canonical.as_bytes());
            u64::from_be_bytes(digest[..8].try_into().unwrap()) % templates.len() as u64
        };
        let base = index("Q1", "P106");
        assert!(
            index("Q2", "P106") != base
                || index("Q1", "P27") != base
                || index("Q3", "P106") != base
        );
    }

    #[test]
    fn test_choose_empty_is_none() {
        assert!(choose(&[], "Q1", "P106").is_none());
    }
}
