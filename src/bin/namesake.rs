//! namesake - build disambiguation benchmark sets.
//!
//! # Usage
//!
//! ```bash
//! # Run the full pipeline
//! namesake build \
//!     --catalog catalog.json \
//!     --corpus corpus.jsonl \
//!     --properties distinguishing_properties.json \
//!     --qa-templates qa_templates.json \
//!     --fc-templates fc_templates.json \
//!     --out-dir data/human
//!
//! # Report statistics over a finished run
//! namesake stats --dir data/human --properties distinguishing_properties.json
//! ```

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use namesake::catalog::EntityCatalog;
use namesake::generate::BenchmarkSet;
use namesake::ground::{GrounderConfig, InMemoryCorpus, ProvenanceMode, DEFAULT_WINDOW};
use namesake::group::DEFAULT_MIN_POPULARITY_GAP;
use namesake::pipeline::{self, PipelineConfig, SetStatistics};
use namesake::select::DistinguishingProperties;
use namesake::template::{FcTemplates, QaTemplates};
use namesake::validate::ValidatedGroup;
use namesake::Result;

/// Build disambiguation benchmark sets from a knowledge-base snapshot.
#[derive(Parser)]
#[command(name = "namesake", author, version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full set-construction pipeline
    #[command(visible_alias = "b")]
    Build(BuildArgs),

    /// Print statistics over generated benchmark sets
    #[command(visible_alias = "s")]
    Stats(StatsArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Entity catalog JSON file
    #[arg(long)]
    catalog: PathBuf,

    /// Corpus JSONL file (entity_id, document_id, title, text per line)
    #[arg(long)]
    corpus: PathBuf,

    /// Entity type -> distinguishing property IDs JSON file
    #[arg(long)]
    properties: PathBuf,

    /// QA templates JSON file
    #[arg(long)]
    qa_templates: PathBuf,

    /// Fact-checking templates JSON file
    #[arg(long)]
    fc_templates: PathBuf,

    /// Output directory
    #[arg(long, short)]
    out_dir: PathBuf,

    /// Minimum relative popularity gap between a group's top two entities
    #[arg(long, default_value_t = DEFAULT_MIN_POPULARITY_GAP)]
    gap: f64,

    /// Leading-token window read from each document
    #[arg(long, default_value_t = DEFAULT_WINDOW)]
    window: usize,

    /// Provenance mode: "first" (first matching document) or "all"
    #[arg(long, default_value = "all")]
    mode: String,

    /// Popular values retained per property for REFUTES selection
    #[arg(long, default_value_t = namesake::catalog::PopularValues::DEFAULT_TOP)]
    top_values: usize,

    /// Suppress progress bars
    #[arg(long, short)]
    quiet: bool,
}

#[derive(clap::Args)]
struct StatsArgs {
    /// Directory containing a finished pipeline run
    #[arg(long, short)]
    dir: PathBuf,

    /// Entity type -> distinguishing property IDs JSON file
    #[arg(long)]
    properties: PathBuf,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => build(args),
        Commands::Stats(args) => stats(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn build(args: BuildArgs) -> Result<()> {
    let mode: ProvenanceMode = args.mode.parse()?;

    println!("Loading catalog from {}...", args.catalog.display());
    let catalog = EntityCatalog::from_json_file(&args.catalog)?;
    println!("  {} entities", catalog.len());

    println!("Loading corpus from {}...", args.corpus.display());
    let corpus = InMemoryCorpus::from_jsonl_file(&args.corpus)?;

    let allow = DistinguishingProperties::from_json_file(&args.properties)?;
    let qa_templates = QaTemplates::from_json_file(&args.qa_templates)?;
    let fc_templates = FcTemplates::from_json_file(&args.fc_templates)?;

    let config = PipelineConfig {
        min_popularity_gap: args.gap,
        grounder: GrounderConfig {
            mode,
            window: args.window,
        },
        popular_top: args.top_values,
        progress: !args.quiet,
    };

    let summary = pipeline::run(
        &catalog,
        &corpus,
        &allow,
        &qa_templates,
        &fc_templates,
        &args.out_dir,
        &config,
    )?;

    println!("Polysemous names:  {}", summary.grouped);
    println!("Validated sets:    {}", summary.validated);
    println!("QA instances:      {}", summary.qa_instances);
    println!("FC instances:      {}", summary.fc_instances);
    println!("SF instances:      {}", summary.sf_instances);
    Ok(())
}

fn stats(args: StatsArgs) -> Result<()> {
    let allow = DistinguishingProperties::from_json_file(&args.properties)?;
    let tuples: Vec<ValidatedGroup> =
        pipeline::read_jsonl(args.dir.join("benchmark_tuples.jsonl"))?;

    print!("{}", SetStatistics::compute(&tuples, &allow));

    for task in ["qa", "fc", "sf"] {
        let path = args.dir.join(task).join("benchmark_sets.jsonl");
        if path.is_file() {
            let sets: Vec<BenchmarkSet> = pipeline::read_jsonl(&path)?;
            println!(
                "Number of {} instances: {}",
                task.to_uppercase(),
                pipeline::count_instances(&sets)
            );
        }
    }
    Ok(())
}
