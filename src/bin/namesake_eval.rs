//! namesake-eval - score retrieval predictions against benchmark sets.
//!
//! # Usage
//!
//! ```bash
//! # Print metrics to stdout
//! namesake-eval -a qa/benchmark_sets.jsonl -p predictions.jsonl -k 5
//!
//! # Write metrics@5.json and raw_metrics@5.json instead
//! namesake-eval -a qa/benchmark_sets.jsonl -p predictions.jsonl -k 5 -m out/
//! ```

use std::path::PathBuf;
use std::process;

use clap::Parser;

use namesake::eval::{evaluate, write_metrics_files, Predictions};
use namesake::generate::BenchmarkSet;
use namesake::pipeline::read_jsonl;
use namesake::Result;

/// Score a retrieval system's predictions against gold benchmark sets.
#[derive(Parser)]
#[command(name = "namesake-eval", author, version, about)]
struct Cli {
    /// Path to the gold benchmark sets JSONL file
    #[arg(long, short)]
    annotations: PathBuf,

    /// Path to the predictions JSONL file (same instance ID space)
    #[arg(long, short)]
    predictions: PathBuf,

    /// Compute accuracy@k
    #[arg(long, short, default_value_t = 1)]
    k: usize,

    /// Directory to write metrics files into; prints to stdout if absent
    #[arg(long, short)]
    metrics_dir: Option<PathBuf>,
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let sets: Vec<BenchmarkSet> = read_jsonl(&cli.annotations)?;
    let predictions = Predictions::from_jsonl_file(&cli.predictions)?;

    let (report, raw) = evaluate(&sets, &predictions, cli.k)?;

    match cli.metrics_dir {
        Some(dir) => write_metrics_files(dir, cli.k, &report, &raw)?,
        None => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
