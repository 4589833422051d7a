//! Grounding candidate facts in a reference corpus.
//!
//! A fact survives only if one of its answer aliases occurs, after
//! normalization, in the leading window of a document linked to the
//! entity. The matching document(s) become the fact's provenance: either
//! the first match or every distinct matching document, depending on
//! [`ProvenanceMode`]. Entities with no linked documents at all are
//! removed from the group here.
//!
//! The corpus is a read-only collaborator behind the [`Corpus`] trait;
//! [`InMemoryCorpus`] is the bundled implementation, loadable from JSONL.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use md5::{Digest, Md5};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::catalog::Value;
use crate::error::{Error, Result};
use crate::select::FilteredGroup;
use crate::text;

/// Leading-token window read from every document. The same window is used
/// at generation time so evidence stays visible downstream.
pub const DEFAULT_WINDOW: usize = 350;

/// A reference to a corpus document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocRef {
    /// Corpus-wide document identifier.
    pub document_id: String,
    /// Human-readable title.
    pub title: String,
}

impl DocRef {
    /// Create a document reference.
    pub fn new(document_id: impl Into<String>, title: impl Into<String>) -> Self {
        DocRef {
            document_id: document_id.into(),
            title: title.into(),
        }
    }
}

/// Read-only document lookup: which documents an entity links to, and
/// what a document says.
pub trait Corpus: Sync {
    /// Documents linked to an entity, in corpus order.
    fn articles(&self, entity_id: &str) -> Vec<DocRef>;

    /// Full text of a document, if known.
    fn document_text(&self, document_id: &str) -> Option<String>;
}

/// One line of a corpus JSONL file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    /// Entity the document is linked to.
    pub entity_id: String,
    /// Document identifier.
    pub document_id: String,
    /// Document title.
    pub title: String,
    /// Document text.
    pub text: String,
}

/// In-memory corpus backed by maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    links: BTreeMap<String, Vec<DocRef>>,
    texts: BTreeMap<String, String>,
}

impl InMemoryCorpus {
    /// Create an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link a document to an entity and store its text.
    pub fn insert(
        &mut self,
        entity_id: impl Into<String>,
        document_id: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) {
        let document_id = document_id.into();
        self.links
            .entry(entity_id.into())
            .or_default()
            .push(DocRef::new(document_id.clone(), title));
        self.texts.insert(document_id, text.into());
    }

    /// Load a corpus from a JSONL file of [`CorpusRecord`] lines.
    pub fn from_jsonl_file(path: impl AsRef<Path>) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut corpus = Self::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = serde_json::from_str(&line)?;
            corpus.insert(record.entity_id, record.document_id, record.title, record.text);
        }
        Ok(corpus)
    }
}

impl Corpus for InMemoryCorpus {
    fn articles(&self, entity_id: &str) -> Vec<DocRef> {
        self.links.get(entity_id).cloned().unwrap_or_default()
    }

    fn document_text(&self, document_id: &str) -> Option<String> {
        self.texts.get(document_id).cloned()
    }
}

/// How matching documents accumulate into a fact's provenance.
///
/// The construction history has both behaviors; the mode keeps the choice
/// explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceMode {
    /// Stop at the first document containing any alias.
    FirstMatch,
    /// Record every distinct document containing any alias.
    #[default]
    AllMatches,
}

impl FromStr for ProvenanceMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "first" | "first_match" => Ok(ProvenanceMode::FirstMatch),
            "all" | "all_matches" => Ok(ProvenanceMode::AllMatches),
            other => Err(Error::config(format!(
                "unknown provenance mode {other:?} (expected \"first\" or \"all\")"
            ))),
        }
    }
}

/// Grounding configuration.
#[derive(Debug, Clone, Copy)]
pub struct GrounderConfig {
    /// Provenance accumulation mode.
    pub mode: ProvenanceMode,
    /// Leading-token window applied to document text.
    pub window: usize,
}

impl Default for GrounderConfig {
    fn default() -> Self {
        GrounderConfig {
            mode: ProvenanceMode::default(),
            window: DEFAULT_WINDOW,
        }
    }
}

/// A distinguishing fact with corpus evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    /// Stable content hash of (name, entity, property); namespaces the
    /// query-instance IDs generated from this fact.
    pub id: String,
    /// Natural-language property label.
    pub property: String,
    /// The fact's values.
    pub values: Vec<Value>,
    /// Documents containing a matching alias. Never empty.
    pub provenance: Vec<DocRef>,
}

/// A group member with grounded facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedMember {
    /// Popularity score.
    pub popularity: f64,
    /// Head flag, fixed at grouping time.
    pub is_head: bool,
    /// Entity-type tags.
    pub entity_types: Vec<String>,
    /// Documents linked to this entity.
    pub articles: Vec<DocRef>,
    /// Surviving facts keyed by property ID.
    pub facts: BTreeMap<String, Fact>,
}

/// A name group after evidence grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedGroup {
    /// The shared name.
    pub name: String,
    /// Members keyed by entity ID.
    pub members: BTreeMap<String, GroundedMember>,
}

/// Stable content hash for a (name, entity, property) triple.
#[must_use]
pub fn fact_id(name: &str, entity_id: &str, property_id: &str) -> String {
    let canonical = serde_json::to_string(&[name, entity_id, property_id])
        .unwrap_or_else(|_| format!("[{name},{entity_id},{property_id}]"));
    md5_hex(canonical.as_bytes())
}

/// Hex-encoded md5 digest.
#[must_use]
pub fn md5_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let digest = Md5::digest(bytes);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Ground one group against the corpus.
#[must_use]
pub fn ground_group(
    group: &FilteredGroup,
    corpus: &dyn Corpus,
    config: &GrounderConfig,
) -> GroundedGroup {
    let mut members = BTreeMap::new();

    for (entity_id, member) in &group.members {
        let articles = corpus.articles(entity_id);
        if articles.is_empty() {
            continue;
        }

        // Tokenize each document window once; probe with every alias.
        let article_tokens: Vec<Option<Vec<String>>> = articles
            .iter()
            .map(|article| {
                corpus
                    .document_text(&article.document_id)
                    .map(|doc| text::tokens(&text::leading_window(&doc, config.window)))
            })
            .collect();

        let mut facts = BTreeMap::new();
        for (pid, relation) in &member.relations {
            let provenance =
                ground_relation(&relation.values, &articles, &article_tokens, config.mode);
            if !provenance.is_empty() {
                facts.insert(
                    pid.clone(),
                    Fact {
                        id: fact_id(&group.name, entity_id, pid),
                        property: relation.property.clone(),
                        values: relation.values.clone(),
                        provenance,
                    },
                );
            }
        }

        members.insert(
            entity_id.clone(),
            GroundedMember {
                popularity: member.popularity,
                is_head: member.is_head,
                entity_types: member.entity_types.clone(),
                articles,
                facts,
            },
        );
    }

    GroundedGroup {
        name: group.name.clone(),
        members,
    }
}

/// Ground all groups, fanning out across groups.
///
/// Groups are independent after name grouping, so this is safe to run in
/// parallel; rayon's ordered collect keeps the output order equal to the
/// input order.
#[must_use]
pub fn ground_groups(
    groups: &[FilteredGroup],
    corpus: &dyn Corpus,
    config: &GrounderConfig,
) -> Vec<GroundedGroup> {
    groups
        .par_iter()
        .map(|group| ground_group(group, corpus, config))
        .collect()
}

fn ground_relation(
    values: &[Value],
    articles: &[DocRef],
    article_tokens: &[Option<Vec<String>>],
    mode: ProvenanceMode,
) -> Vec<DocRef> {
    let canonical: Vec<Vec<String>> = values
        .iter()
        .flat_map(|v| v.aliases.iter())
        .map(|a| text::tokens(a))
        .collect();
    let additional: Vec<Vec<String>> = values
        .iter()
        .flat_map(|v| v.additional_aliases.iter())
        .map(|a| text::tokens(a))
        .collect();

    let mut provenance = Vec::new();
    for (article, doc_tokens) in articles.iter().zip(article_tokens) {
        let Some(doc_tokens) = doc_tokens else {
            continue;
        };

        let matched = canonical
            .iter()
            .chain(additional.iter())
            .any(|alias| text::groundable_tokens(alias, doc_tokens));

        if matched && !provenance.contains(article) {
            provenance.push(article.clone());
            if mode == ProvenanceMode::FirstMatch {
                break;
            }
        }
    }
    provenance
}
