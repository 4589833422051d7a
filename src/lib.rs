//! # namesake
//!
//! Disambiguation benchmark sets for retrieval evaluation.
//!
//! Many knowledge-base entities share a surface name ("Jordan" the
//! athlete, the country, the professor). `namesake` turns a static
//! catalog of such entities into benchmark sets: for every shared name it
//! finds the facts that tell the namesakes apart, verifies each fact
//! against the text of the entity's own documents, and emits
//! machine-readable query instances in three task formats. A companion
//! evaluator then measures whether a retrieval system favors the popular
//! ("head") entity over the obscure ("tail") one.
//!
//! ## Pipeline
//!
//! ```text
//! EntityCatalog ──► group ──► select ──► ground ──► validate ──► generate
//!                (by name)  (unique     (corpus     (≥2 sides    (QA/FC/SF
//!                           relations)  evidence)   + head)      instances)
//! ```
//!
//! Data flows strictly forward; each stage returns a new structure and
//! never mutates its input. Groups are independent after the grouping
//! stage, so grounding fans out across groups.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use namesake::{catalog::EntityCatalog, ground::InMemoryCorpus,
//!               pipeline, select::DistinguishingProperties,
//!               template::{FcTemplates, QaTemplates}};
//!
//! let catalog = EntityCatalog::from_json_file("catalog.json")?;
//! let corpus = InMemoryCorpus::from_jsonl_file("corpus.jsonl")?;
//! let allow = DistinguishingProperties::from_json_file("distinguishing_properties.json")?;
//! let qa = QaTemplates::from_json_file("qa_templates.json")?;
//! let fc = FcTemplates::from_json_file("fc_templates.json")?;
//!
//! let summary = pipeline::run(&catalog, &corpus, &allow, &qa, &fc,
//!                             "out", &pipeline::PipelineConfig::default())?;
//! println!("{} validated sets", summary.validated);
//! ```
//!
//! ## Evaluation
//!
//! ```rust,ignore
//! use namesake::eval::{evaluate, Predictions};
//!
//! let sets = namesake::pipeline::read_jsonl("out/qa/benchmark_sets.jsonl")?;
//! let predictions = Predictions::from_jsonl_file("predictions.jsonl")?;
//! let (report, _raw) = evaluate(&sets, &predictions, 1)?;
//! println!("accuracy@1: {:.1}  consistency: {:.1}", report.accuracy, report.consistency);
//! ```
//!
//! ## Design notes
//!
//! - Every derived identifier (fact IDs, instance IDs, template choice)
//!   is a pure hash of content, so re-runs and parallel runs are
//!   byte-identical.
//! - Grounding and generation read documents through the same
//!   leading-token window; evidence found by one is visible to the other.
//! - The catalog and corpus are read-only collaborators behind explicit
//!   seams ([`catalog::EntityCatalog`], [`ground::Corpus`]).

#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod eval;
pub mod generate;
pub mod ground;
pub mod group;
pub mod pipeline;
pub mod select;
pub mod template;
pub mod text;
pub mod validate;

pub use error::{Error, Result};
pub use eval::{evaluate, MetricsReport, Predictions};
pub use generate::{BenchmarkSet, QueryInstance};
pub use ground::{Corpus, DocRef, Fact, InMemoryCorpus, ProvenanceMode};
pub use group::NameGroup;
pub use validate::ValidatedGroup;
