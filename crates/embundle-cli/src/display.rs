//! Human-readable output for `inspect`, `train` and `predict`.

use std::io::Write;
use std::path::Path;

use embundle_core::{BundleError, ModelParams, Prediction};
use embundle_store::Bundle;

use crate::train::TrainReport;

/// Print bundle metadata and per-class row counts.
pub fn print_bundle(out: &mut impl Write, dir: &Path, bundle: &Bundle) -> anyhow::Result<()> {
    let meta = &bundle.meta;
    writeln!(out, "=== {} ===", dir.display())?;
    writeln!(out)?;
    writeln!(out, "Metadata")?;
    field(out, "count", meta.count)?;
    field(out, "dim", meta.dim)?;
    field(out, "dtype", &meta.dtype)?;
    field(out, "model", &meta.model)?;
    field(out, "normalized", if meta.normalized { "yes" } else { "no" })?;
    field(out, "embeddings bytes", meta.expected_bytes()?)?;
    writeln!(out)?;

    let encoding = bundle.encoding();
    writeln!(out, "Classes ({})", encoding.len())?;
    for (id, (label, count)) in encoding.histogram(&bundle.labels)?.iter().enumerate() {
        writeln!(out, "  {id:>4}  {label:<22} {count}")?;
    }
    writeln!(out)?;
    Ok(())
}

/// Check a parameter file against a bundle, print the result, and fail on mismatch.
pub fn print_params_check(
    out: &mut impl Write,
    bundle: &Bundle,
    params: &ModelParams,
) -> anyhow::Result<()> {
    writeln!(out, "Parameters")?;
    field(out, "num_classes", params.num_classes)?;
    field(out, "num_features", params.num_features)?;

    let result = params_consistency(bundle, params);
    match &result {
        Ok(()) => field(out, "consistent", "yes")?,
        Err(e) => field(out, "consistent", format!("no ({e})"))?,
    }
    writeln!(out)?;
    Ok(result?)
}

fn params_consistency(bundle: &Bundle, params: &ModelParams) -> Result<(), BundleError> {
    if params.num_features != bundle.meta.dim {
        return Err(BundleError::FeatureMismatch {
            expected: bundle.meta.dim,
            actual: params.num_features,
        });
    }
    params.check_encoding(&bundle.encoding())
}

pub fn print_train_summary(out: &mut impl Write, report: &TrainReport) -> anyhow::Result<()> {
    let s = &report.summary;
    writeln!(out, "Trained on {} samples", s.samples)?;
    field(out, "classes", s.classes)?;
    field(out, "features", s.features)?;
    field(
        out,
        "iterations",
        format!(
            "{}{}",
            s.iterations,
            if s.converged { "" } else { " (not converged)" }
        ),
    )?;
    field(out, "train accuracy", format!("{:.3}", s.train_accuracy))?;
    field(out, "written to", report.path.display())?;
    Ok(())
}

pub fn print_predictions(
    out: &mut impl Write,
    texts: &[String],
    predictions: &[Prediction],
) -> anyhow::Result<()> {
    for (text, p) in texts.iter().zip(predictions) {
        writeln!(out, "{:<22} {:.3}  {}", p.label, p.probability, text)?;
    }
    Ok(())
}

fn field(out: &mut impl Write, name: &str, value: impl std::fmt::Display) -> std::io::Result<()> {
    writeln!(out, "  {name:<20} {value}")
}
