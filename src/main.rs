//! labelforge - Iterative human-corrected text classification
//!
//! CLI entry points for the labeling workflow: prepare data, run a
//! prediction batch, merge corrections, bulk-classify with a trained
//! model, reconcile external edits, and export training data.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use labelforge::{
    batch::{self, ClassifyOptions, SelectionMethod},
    config::LabelForgeConfig,
    dataset::{self, ConsolidatedDataset},
    export,
    gateway::HttpGateway,
    labels::{
        load_master, ApiPredictionLog, FsSnapshotRepository, LabelAssignment, LabelSource,
        LabelStore, SnapshotRepository,
    },
    prompt,
    reconcile::{reconcile, ReviewSnapshot},
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "labelforge")]
#[command(version)]
#[command(about = "Iterative human-corrected text classification")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LABELFORGE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate raw text into a deduplicated dataset
    Prepare {
        /// Input file with one text occurrence per line
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the consolidated dataset
        #[arg(short, long, default_value = "dataset.json")]
        output: PathBuf,
    },

    /// Select a batch of unlabeled records and classify it
    RunBatch {
        /// Consolidated dataset file
        #[arg(short, long, default_value = "dataset.json")]
        dataset: PathBuf,

        /// Batch size (defaults to configuration)
        #[arg(long)]
        size: Option<usize>,

        /// Selection method: longest, shortest, medium, or random
        #[arg(long)]
        method: Option<SelectionMethod>,

        /// Seed for the random method
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum few-shot examples in the prompt
        #[arg(long)]
        max_examples: Option<usize>,
    },

    /// Merge corrected batch files into the master label set
    Merge {
        /// Corrected batch files (merged in chronological order)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Classify every unlabeled record with a trained model
    BulkClassify {
        /// Consolidated dataset file
        #[arg(short, long, default_value = "dataset.json")]
        dataset: PathBuf,

        /// Model to classify with (e.g. a fine-tuned model id)
        #[arg(short, long)]
        model: String,

        /// Records per intermediate chunk
        #[arg(long, default_value_t = 50)]
        chunk_size: usize,

        /// Also re-classify manually labeled records
        #[arg(long)]
        include_labeled: bool,
    },

    /// Diff an edited review export against its source and optionally
    /// merge the changes
    Reconcile {
        /// The original batch file the export was produced from
        #[arg(long)]
        original: PathBuf,

        /// The human-edited batch file
        #[arg(long)]
        edited: PathBuf,

        /// Merge detected changes into the master label set
        #[arg(long)]
        integrate: bool,
    },

    /// Write the training export from the current master label set
    Export {
        /// Output path (defaults to configuration)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("labelforge={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Prepare { input, output } => prepare(&input, &output),
        Commands::RunBatch {
            dataset,
            size,
            method,
            seed,
            max_examples,
        } => run_batch(&config, &dataset, size, method, seed, max_examples).await,
        Commands::Merge { files } => merge(&config, &files),
        Commands::BulkClassify {
            dataset,
            model,
            chunk_size,
            include_labeled,
        } => bulk_classify(&config, &dataset, &model, chunk_size, include_labeled).await,
        Commands::Reconcile {
            original,
            edited,
            integrate,
        } => run_reconcile(&config, &original, &edited, integrate),
        Commands::Export { output } => run_export(&config, output),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<LabelForgeConfig> {
    match path {
        Some(path) => {
            LabelForgeConfig::load(path).with_context(|| format!("loading {}", path.display()))
        }
        None => {
            let default_path = std::path::Path::new("labelforge.toml");
            if default_path.exists() {
                LabelForgeConfig::load(default_path).context("loading labelforge.toml")
            } else {
                Ok(LabelForgeConfig::default())
            }
        }
    }
}

fn prepare(input: &std::path::Path, output: &std::path::Path) -> Result<()> {
    let content = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let dataset = dataset::consolidate(content.lines())?;
    dataset.save(output)?;

    println!(
        "Consolidated {} occurrences into {} records -> {}",
        dataset.total_occurrences(),
        dataset.len(),
        output.display()
    );
    Ok(())
}

async fn run_batch(
    config: &LabelForgeConfig,
    dataset_path: &std::path::Path,
    size: Option<usize>,
    method: Option<SelectionMethod>,
    seed: Option<u64>,
    max_examples: Option<usize>,
) -> Result<()> {
    config.validate()?;
    let dataset = ConsolidatedDataset::load(dataset_path)?;
    let repo = FsSnapshotRepository::new(&config.storage.snapshots_dir)?;
    let store = load_master(&repo)?;

    let size = size.unwrap_or(config.batch.size);
    let method = method.unwrap_or(config.batch.method);
    let max_examples = max_examples.unwrap_or(config.batch.max_examples);
    let seed = seed.or(Some(config.batch.random_seed));

    let selected = batch::select(dataset.records(), &store.labeled_ids(), size, method, seed);
    if selected.is_empty() {
        println!("No unlabeled records remaining.");
        return Ok(());
    }

    let pool = store.example_pool();
    let instruction = prompt::build(&config.categories, &pool, max_examples);

    let gateway = HttpGateway::from_config(&config.gateway, &config.categories)?;
    let classified = batch::classify_records(
        &gateway,
        &selected,
        &instruction,
        &ClassifyOptions::from(&config.gateway),
    )
    .await;

    let batch_file = batch::build_batch_file(method, classified);
    let path = batch::save_batch(&config.storage.batches_dir, &batch_file)?;

    log_api_predictions(config, &batch_file)?;

    println!(
        "Batch saved to {} ({} predicted, {} failed). Correct the values in place, then run `labelforge merge`.",
        path.display(),
        batch_file.predicted_count(),
        batch_file.failed_count()
    );
    Ok(())
}

/// Append the batch's raw predictions to the audit log
fn log_api_predictions(config: &LabelForgeConfig, batch_file: &batch::BatchFile) -> Result<()> {
    let predictions: Vec<LabelAssignment> = batch_file
        .entries
        .iter()
        .filter_map(|entry| {
            entry.api_prediction.as_ref().map(|values| LabelAssignment {
                record_id: entry.record_id.clone(),
                text_content: entry.text_content.clone(),
                category_values: values.clone(),
                source: LabelSource::Api,
                model_ref: batch_file.model_ref.clone(),
                timestamp: batch_file.created_at,
            })
        })
        .collect();
    ApiPredictionLog::new(&config.storage.api_log_file).append(&predictions)?;
    Ok(())
}

fn merge(config: &LabelForgeConfig, files: &[PathBuf]) -> Result<()> {
    config.validate()?;
    let repo = FsSnapshotRepository::new(&config.storage.snapshots_dir)?;
    let mut store = load_master(&repo)?;

    let mut batches = Vec::new();
    let mut skipped = 0usize;
    for path in files {
        match batch::load_corrections(path, &config.categories) {
            Ok(corrections) => batches.push(corrections),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping malformed correction file");
                skipped += 1;
            }
        }
    }
    if batches.is_empty() {
        println!(
            "No valid correction files ({} skipped); master label set unchanged.",
            skipped
        );
        return Ok(());
    }

    let outcome = store.merge_batches(batches);
    let meta = repo.save(store.assignments())?;
    regenerate_training_export(config, &store)?;

    println!(
        "Master label set now has {} records (snapshot {}; {} inserted, {} replaced, {} rejected by manual precedence, {} files skipped).",
        store.len(),
        meta.id,
        outcome.inserted,
        outcome.replaced,
        outcome.rejected,
        skipped
    );
    Ok(())
}

async fn bulk_classify(
    config: &LabelForgeConfig,
    dataset_path: &std::path::Path,
    model: &str,
    chunk_size: usize,
    include_labeled: bool,
) -> Result<()> {
    config.validate()?;
    let dataset = ConsolidatedDataset::load(dataset_path)?;
    let repo = FsSnapshotRepository::new(&config.storage.snapshots_dir)?;
    let store = load_master(&repo)?;
    let labeled = store.labeled_ids();

    let targets: Vec<_> = dataset
        .records()
        .iter()
        .filter(|r| include_labeled || !labeled.contains(&r.id))
        .cloned()
        .collect();
    if targets.is_empty() {
        println!("No records to classify.");
        return Ok(());
    }

    // Trained models get the baseline, definitions-only instruction
    let instruction = prompt::build(&config.categories, &[], 0);
    let gateway = HttpGateway::from_config(&config.gateway, &config.categories)?.with_model(model);
    let opts = ClassifyOptions::from(&config.gateway);

    let out_dir = config.storage.base_dir.join("bulk");
    std::fs::create_dir_all(&out_dir)?;
    let started = chrono::Utc::now();
    let model_slug = model.replace([':', '/'], "_");

    let mut all_entries = Vec::with_capacity(targets.len());
    for (i, chunk) in targets.chunks(chunk_size.max(1)).enumerate() {
        tracing::info!(chunk = i + 1, records = chunk.len(), "classifying bulk chunk");
        let classified = batch::classify_records(&gateway, chunk, &instruction, &opts).await;

        let chunk_path = out_dir.join(format!(
            "bulk-{}-{}-chunk-{}.json",
            model_slug,
            started.format("%Y%m%d_%H%M%S"),
            i + 1
        ));
        std::fs::write(&chunk_path, serde_json::to_string_pretty(&classified.entries)?)?;
        all_entries.extend(classified.entries);
    }

    let final_path = out_dir.join(format!(
        "bulk-{}-{}-total-{}.json",
        model_slug,
        started.format("%Y%m%d_%H%M%S"),
        all_entries.len()
    ));
    std::fs::write(&final_path, serde_json::to_string_pretty(&all_entries)?)?;

    let failed = all_entries.iter().filter(|e| e.failure.is_some()).count();
    println!(
        "Bulk classification complete: {} records ({} failed) -> {}",
        all_entries.len(),
        failed,
        final_path.display()
    );
    Ok(())
}

fn run_reconcile(
    config: &LabelForgeConfig,
    original_path: &std::path::Path,
    edited_path: &std::path::Path,
    integrate: bool,
) -> Result<()> {
    config.validate()?;
    let original = ReviewSnapshot::from_batch(&batch::load_batch(original_path)?);
    let edited = ReviewSnapshot::from_batch(&batch::load_batch(edited_path)?);

    let repo = FsSnapshotRepository::new(&config.storage.snapshots_dir)?;
    let mut store = load_master(&repo)?;

    let integrate_store = integrate.then_some(&mut store);
    let (report, outcome) = reconcile(&original, &edited, &config.categories, integrate_store)?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    match outcome {
        Some(outcome) if !report.is_empty() => {
            let meta = repo.save(store.assignments())?;
            regenerate_training_export(config, &store)?;
            println!(
                "Integrated {} changes into snapshot {} ({} records total).",
                outcome.inserted + outcome.replaced,
                meta.id,
                store.len()
            );
        }
        Some(_) => println!("No changes detected; master label set unchanged."),
        None => {}
    }
    Ok(())
}

fn run_export(config: &LabelForgeConfig, output: Option<PathBuf>) -> Result<()> {
    config.validate()?;
    let repo = FsSnapshotRepository::new(&config.storage.snapshots_dir)?;
    let store = load_master(&repo)?;

    let path = output.unwrap_or_else(|| config.storage.training_export.clone());
    let count = write_export(config, &store, &path)?;
    println!("Wrote {} training examples to {}", count, path.display());
    Ok(())
}

fn regenerate_training_export(config: &LabelForgeConfig, store: &LabelStore) -> Result<()> {
    write_export(config, store, &config.storage.training_export)?;
    Ok(())
}

fn write_export(
    config: &LabelForgeConfig,
    store: &LabelStore,
    path: &std::path::Path,
) -> Result<usize> {
    let pool = store.example_pool();
    let instruction = prompt::build(&config.categories, &pool, config.batch.max_examples);
    Ok(export::write_training_export(path, &instruction, store.assignments())?)
}
