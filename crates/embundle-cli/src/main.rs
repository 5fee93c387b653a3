//! `embundle`: embed a labelled corpus into a bundle, train a linear
//! classifier on it, and export the parameters.
//!
//! # Commands
//!
//! - `embed`: corpus CSV → `embeddings.bin`, `labels.json`, `meta.json`
//! - `train`: bundle → `model_weights.json`
//! - `inspect`: print bundle metadata and check a parameter file against it
//! - `predict`: classify texts with an exported parameter file

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use embundle_core::config::{
    DEFAULT_BATCH_SIZE, DEFAULT_LABEL_COLUMN, DEFAULT_MODEL_ID, DEFAULT_TEXT_COLUMN,
};
use embundle_core::{EmbedConfig, TrainConfig, WriteMode};
use embundle_store::BundlePaths;
use embundle_store::params::PARAMS_FILE;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod display;
mod embed;
mod predict;
mod train;

#[derive(Parser)]
#[command(name = "embundle", version, about = "Corpus embedding bundles and linear classifiers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed a labelled CSV corpus into a bundle
    Embed(EmbedArgs),
    /// Train a classifier on a bundle and export its parameters
    Train(TrainArgs),
    /// Show bundle metadata and class counts
    Inspect(InspectArgs),
    /// Classify texts with an exported parameter file
    Predict(PredictArgs),
}

#[derive(Args)]
struct EmbedArgs {
    /// Corpus CSV with a header row
    #[arg(long, env = "EMBUNDLE_CORPUS")]
    corpus: PathBuf,

    /// Directory holding `model.onnx` and `tokenizer.json`
    #[arg(long, env = "EMBUNDLE_MODEL_DIR")]
    model_dir: PathBuf,

    /// Model identifier recorded in `meta.json`
    #[arg(long, env = "EMBUNDLE_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    #[arg(long, default_value = DEFAULT_TEXT_COLUMN)]
    text_column: String,

    #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
    label_column: String,

    #[arg(long, env = "EMBUNDLE_BATCH_SIZE", default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Output directory for the bundle
    #[arg(long, env = "EMBUNDLE_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Keep raw mean-pooled vectors instead of unit-normalizing them
    #[arg(long)]
    no_normalize: bool,

    /// Write each artifact to a temporary file and rename it into place
    #[arg(long)]
    staged: bool,

    /// Independent model sessions to embed batches on
    #[arg(long, env = "EMBUNDLE_WORKERS", default_value_t = 1)]
    workers: usize,
}

#[derive(Args)]
struct TrainArgs {
    /// Directory holding the bundle
    #[arg(long, env = "EMBUNDLE_BUNDLE_DIR", default_value = ".")]
    bundle_dir: PathBuf,

    /// Parameter file to write (default: `model_weights.json` in the bundle dir)
    #[arg(long)]
    out: Option<PathBuf>,

    #[arg(long, default_value_t = 300)]
    max_iter: usize,

    /// Inverse regularisation strength
    #[arg(long, default_value_t = 1.0)]
    c: f32,

    #[arg(long, default_value_t = 1e-4)]
    tol: f32,

    #[arg(long)]
    staged: bool,
}

#[derive(Args)]
struct InspectArgs {
    #[arg(long, env = "EMBUNDLE_BUNDLE_DIR", default_value = ".")]
    bundle_dir: PathBuf,

    /// Parameter file to check against the bundle's labels
    #[arg(long)]
    params: Option<PathBuf>,
}

#[derive(Args)]
struct PredictArgs {
    #[arg(long, default_value = PARAMS_FILE)]
    params: PathBuf,

    #[arg(long, env = "EMBUNDLE_MODEL_DIR")]
    model_dir: PathBuf,

    #[arg(long, env = "EMBUNDLE_MODEL_ID", default_value = DEFAULT_MODEL_ID)]
    model_id: String,

    #[arg(long)]
    no_normalize: bool,

    /// Texts to classify
    #[arg(required = true)]
    texts: Vec<String>,
}

impl EmbedArgs {
    fn config(&self) -> EmbedConfig {
        EmbedConfig {
            corpus: self.corpus.clone(),
            text_column: self.text_column.clone(),
            label_column: self.label_column.clone(),
            model_id: self.model_id.clone(),
            batch_size: self.batch_size,
            out_dir: self.out_dir.clone(),
            normalize: !self.no_normalize,
            write_mode: write_mode(self.staged),
            workers: self.workers,
        }
    }
}

impl TrainArgs {
    fn config(&self) -> TrainConfig {
        TrainConfig {
            max_iter: self.max_iter,
            c: self.c,
            tol: self.tol,
        }
    }
}

fn write_mode(staged: bool) -> WriteMode {
    if staged {
        WriteMode::Staged
    } else {
        WriteMode::Direct
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("embundle v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Embed(args) => cmd_embed(args).await,
        Command::Train(args) => cmd_train(args),
        Command::Inspect(args) => cmd_inspect(args),
        Command::Predict(args) => cmd_predict(args),
    }
}

#[cfg(feature = "onnx")]
async fn cmd_embed(args: EmbedArgs) -> anyhow::Result<()> {
    let config = args.config().validate().context("embed: invalid settings")?;
    let providers = (0..config.workers)
        .map(|_| embundle_ai::Embedder::load(&args.model_dir, &config.model_id, config.normalize))
        .collect::<anyhow::Result<Vec<_>>>()
        .context("embed: loading model")?;

    eprintln!("Embedding {}...", config.corpus.display());
    let stats = embed::run_embed_pipeline(&config, providers).await?;
    eprintln!(
        "  Wrote {} rows × {} dims to {} in {:.1}s ({} dropped)",
        stats.total_rows,
        stats.dim,
        config.out_dir.display(),
        stats.elapsed_secs,
        stats.dropped
    );
    Ok(())
}

#[cfg(not(feature = "onnx"))]
async fn cmd_embed(_args: EmbedArgs) -> anyhow::Result<()> {
    anyhow::bail!("embed: embundle was built without the `onnx` feature")
}

fn cmd_train(args: TrainArgs) -> anyhow::Result<()> {
    let out = args
        .out
        .clone()
        .unwrap_or_else(|| args.bundle_dir.join(PARAMS_FILE));
    let report = train::run_train(
        &BundlePaths::in_dir(&args.bundle_dir),
        &out,
        &args.config(),
        write_mode(args.staged),
    )?;
    display::print_train_summary(&mut std::io::stdout(), &report)?;
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bundle = embundle_store::read_bundle(&BundlePaths::in_dir(&args.bundle_dir))
        .context("inspect: reading bundle")?;
    let mut out = std::io::stdout();
    display::print_bundle(&mut out, &args.bundle_dir, &bundle)?;

    if let Some(path) = &args.params {
        let params = embundle_store::read_params(path)
            .with_context(|| format!("inspect: reading {}", path.display()))?;
        display::print_params_check(&mut out, &bundle, &params)?;
    }
    Ok(())
}

#[cfg(feature = "onnx")]
fn cmd_predict(args: PredictArgs) -> anyhow::Result<()> {
    let params = embundle_store::read_params(&args.params)
        .with_context(|| format!("predict: reading {}", args.params.display()))?;
    let mut embedder =
        embundle_ai::Embedder::load(&args.model_dir, &args.model_id, !args.no_normalize)
            .context("predict: loading model")?;
    let predictions = predict::predict_texts(&mut embedder, &params, &args.texts)?;
    display::print_predictions(&mut std::io::stdout(), &args.texts, &predictions)?;
    Ok(())
}

#[cfg(not(feature = "onnx"))]
fn cmd_predict(_args: PredictArgs) -> anyhow::Result<()> {
    anyhow::bail!("predict: embundle was built without the `onnx` feature")
}

/// Deterministic providers for command-level tests.
#[cfg(test)]
pub(crate) mod testing {
    use embundle_ai::EmbeddingProvider;

    const LEISURE: &[&str] = &["hiking", "park", "beach", "holiday"];
    const FINANCE: &[&str] = &["market", "rates", "stock", "bank"];

    /// Maps leisure words to one unit vector and finance words to another.
    #[derive(Clone)]
    pub struct KeywordEmbedder;

    impl EmbeddingProvider for KeywordEmbedder {
        fn model_id(&self) -> &str {
            "keyword-stub"
        }

        fn dim(&self) -> usize {
            4
        }

        fn normalized(&self) -> bool {
            true
        }

        fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    if LEISURE.iter().any(|w| t.contains(w)) {
                        vec![0.6, 0.0, 0.8, 0.0]
                    } else if FINANCE.iter().any(|w| t.contains(w)) {
                        vec![0.0, 0.6, 0.0, 0.8]
                    } else {
                        vec![0.5; 4]
                    }
                })
                .collect())
        }
    }
}
