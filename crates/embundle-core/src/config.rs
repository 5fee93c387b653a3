//! Immutable configuration records passed into each pipeline stage.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::BundleError;

pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_TEXT_COLUMN: &str = "original_text";
pub const DEFAULT_LABEL_COLUMN: &str = "primary_theme";
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// How the bundle's three artifacts reach disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Three independent writes straight to the target paths. A crash
    /// part-way can leave an inconsistent triplet.
    #[default]
    Direct,
    /// Each artifact goes to a temporary file beside its target and is renamed
    /// into place, `meta.json` last.
    Staged,
}

/// Settings for the embed stage (corpus → bundle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedConfig {
    pub corpus: PathBuf,
    pub text_column: String,
    pub label_column: String,
    pub model_id: String,
    pub batch_size: usize,
    pub out_dir: PathBuf,
    pub normalize: bool,
    pub write_mode: WriteMode,
    /// Number of independent embedding sessions to run batches on.
    pub workers: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("dataset.csv"),
            text_column: DEFAULT_TEXT_COLUMN.into(),
            label_column: DEFAULT_LABEL_COLUMN.into(),
            model_id: DEFAULT_MODEL_ID.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            out_dir: PathBuf::from("."),
            normalize: true,
            write_mode: WriteMode::Direct,
            workers: 1,
        }
    }
}

impl EmbedConfig {
    pub fn validate(self) -> Result<Self, BundleError> {
        if self.batch_size == 0 {
            return Err(BundleError::InvalidConfig(
                "batch_size must be at least 1".into(),
            ));
        }
        if self.workers == 0 {
            return Err(BundleError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if self.text_column.is_empty() || self.label_column.is_empty() {
            return Err(BundleError::InvalidConfig(
                "text and label column names must be non-empty".into(),
            ));
        }
        Ok(self)
    }
}

/// Settings for the linear-model solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    pub max_iter: usize,
    /// Inverse L2 regularisation strength; larger means weaker.
    pub c: f32,
    /// Stop once the largest absolute gradient entry falls below this.
    pub tol: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            max_iter: 300,
            c: 1.0,
            tol: 1e-4,
        }
    }
}

impl TrainConfig {
    pub fn validate(self) -> Result<Self, BundleError> {
        if self.max_iter == 0 {
            return Err(BundleError::InvalidConfig("max_iter must be at least 1".into()));
        }
        if !(self.c.is_finite() && self.c > 0.0) {
            return Err(BundleError::InvalidConfig(format!(
                "c must be a positive number, got {}",
                self.c
            )));
        }
        if !(self.tol.is_finite() && self.tol >= 0.0) {
            return Err(BundleError::InvalidConfig(format!(
                "tol must be non-negative, got {}",
                self.tol
            )));
        }
        Ok(self)
    }
}
