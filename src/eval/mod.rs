//! Retrieval evaluation against gold benchmark sets.
//!
//! # Overview
//!
//! Scores a retrieval system's ranked document predictions against the
//! provenance of each gold query instance:
//!
//! - **accuracy@k**: did any gold document appear in the top-k retrieved
//!   documents (after de-duplication and sentinel removal)?
//! - **consistency**: were *all* instances of a name group retrieved
//!   correctly? One confused entity fails the whole group.
//! - **head/tail**: the same scores stratified by entity popularity,
//!   exposing systems that only get the famous namesake right.
//!
//! # Example
//!
//! ```rust,ignore
//! use namesake::eval::{evaluate, Predictions};
//!
//! let sets = namesake::pipeline::read_jsonl("qa/benchmark_sets.jsonl")?;
//! let predictions = Predictions::from_jsonl_file("predictions.jsonl")?;
//! let (report, raw) = evaluate(&sets, &predictions, 1)?;
//! println!("accuracy@1 = {:.1}", report.accuracy);
//! ```

mod evaluator;
mod metrics;

pub use evaluator::{
    evaluate, write_metrics_files, MetricsReport, PredictionRecord, Predictions,
};
pub use metrics::{accuracy_at_k, extract_document_ids, RawMetrics, ACCURACY, NONE_DOCUMENT_ID};
