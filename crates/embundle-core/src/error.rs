use thiserror::Error;

/// Invariant violations across the bundle and parameter-export contracts.
#[derive(Debug, Error, PartialEq)]
pub enum BundleError {
    #[error("byte length mismatch: expected {expected}, got {actual}")]
    ByteLength { expected: usize, actual: usize },

    #[error("shape mismatch: {rows}×{dim} needs {expected} values, got {actual}")]
    Shape {
        rows: usize,
        dim: usize,
        expected: usize,
        actual: usize,
    },

    #[error("shape {rows}×{dim} overflows the addressable byte length")]
    Overflow { rows: usize, dim: usize },

    #[error("zero embedding dimension for {rows} rows")]
    ZeroDimension { rows: usize },

    #[error("embedding dimension mismatch at row {row}: expected {expected}, got {actual}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("batch {batch} returned {actual} embeddings for {expected} texts")]
    BatchSizeMismatch {
        batch: usize,
        expected: usize,
        actual: usize,
    },

    #[error("label count mismatch: expected {expected}, got {actual}")]
    LabelCount { expected: usize, actual: usize },

    #[error("unsupported dtype {0:?}: only \"float32\" is supported")]
    UnsupportedDtype(String),

    #[error("label {0:?} is not in the label encoding")]
    UnknownLabel(String),

    #[error("encoding mismatch: {0}")]
    EncodingMismatch(String),

    #[error("cannot fit or export a classifier with zero classes")]
    NoClasses,

    #[error("cannot fit a classifier with a single class {0:?}")]
    SingleClass(String),

    #[error("feature mismatch: expected {expected} features, got {actual}")]
    FeatureMismatch { expected: usize, actual: usize },

    #[error("invalid model parameters: {0}")]
    InvalidParams(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
