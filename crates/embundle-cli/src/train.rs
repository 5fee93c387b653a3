//! Training pipeline: reads a bundle, fits the classifier, writes its parameters.

use std::path::{Path, PathBuf};

use anyhow::Context;
use embundle_ai::TrainSummary;
use embundle_core::{ModelParams, TrainConfig, WriteMode};
use embundle_store::BundlePaths;

pub struct TrainReport {
    pub summary: TrainSummary,
    pub params: ModelParams,
    pub path: PathBuf,
}

/// Run read bundle → train → export → write `model_weights.json`.
pub fn run_train(
    paths: &BundlePaths,
    out: &Path,
    config: &TrainConfig,
    mode: WriteMode,
) -> anyhow::Result<TrainReport> {
    let bundle = embundle_store::read_bundle(paths).context("train: reading bundle")?;
    eprintln!(
        "  Loaded {} × {} embeddings ({})",
        bundle.meta.count, bundle.meta.dim, bundle.meta.model
    );

    let trained = embundle_ai::train(&bundle.matrix, &bundle.labels, config).context("train")?;
    let params = embundle_ai::export(&trained.model, &trained.encoding, &bundle.meta)
        .context("export")?;
    embundle_store::write_params(out, &params, mode)
        .with_context(|| format!("export: writing {}", out.display()))?;

    Ok(TrainReport {
        summary: trained.summary(bundle.meta.count),
        params,
        path: out.to_path_buf(),
    })
}
