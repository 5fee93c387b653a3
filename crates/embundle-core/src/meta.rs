//! Bundle metadata (`meta.json`).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{BundleError, EmbeddingMatrix};

/// Element type of the binary embedding file.
///
/// Only `float32` exists today; any other string in `meta.json` is rejected
/// when the metadata is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dtype {
    #[default]
    Float32,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
        }
    }

    pub fn parse(s: &str) -> Result<Self, BundleError> {
        match s {
            "float32" => Ok(Self::Float32),
            other => Err(BundleError::UnsupportedDtype(other.to_string())),
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Dtype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Dtype {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Dtype::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// `{count, dim, dtype, model, normalized}` describing one bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMeta {
    pub count: usize,
    pub dim: usize,
    pub dtype: Dtype,
    pub model: String,
    pub normalized: bool,
}

impl BundleMeta {
    /// Metadata for `matrix`. Count and dim always come from the matrix itself.
    pub fn for_matrix(matrix: &EmbeddingMatrix, model: &str, normalized: bool) -> Self {
        Self {
            count: matrix.rows(),
            dim: matrix.dim(),
            dtype: Dtype::Float32,
            model: model.to_string(),
            normalized,
        }
    }

    /// Exact byte length of the embedding file this metadata describes.
    ///
    /// Fails when `count` and `dim` cannot describe a real file: a zero `dim`
    /// with rows present, or a product that overflows.
    pub fn expected_bytes(&self) -> Result<usize, BundleError> {
        crate::matrix::byte_len(self.count, self.dim)
    }

    /// Check that a loaded matrix matches `count` and `dim`.
    pub fn check_matrix(&self, matrix: &EmbeddingMatrix) -> Result<(), BundleError> {
        if matrix.rows() != self.count || matrix.dim() != self.dim {
            return Err(BundleError::Shape {
                rows: self.count,
                dim: self.dim,
                expected: self.count.saturating_mul(self.dim),
                actual: matrix.as_slice().len(),
            });
        }
        Ok(())
    }

    /// Check that a label vector has exactly `count` entries.
    pub fn check_labels(&self, len: usize) -> Result<(), BundleError> {
        if len != self.count {
            return Err(BundleError::LabelCount {
                expected: self.count,
                actual: len,
            });
        }
        Ok(())
    }
}
