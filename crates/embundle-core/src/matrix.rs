//! Row-major `f32` embedding matrix and its raw byte codec.
//!
//! The on-disk form is the matrix values back to back, little-endian, with no
//! header, length prefix or padding. A matrix of `rows × dim` therefore always
//! occupies exactly `rows * dim * 4` bytes.

use crate::BundleError;

/// Size in bytes of one stored element.
pub const F32_BYTES: usize = std::mem::size_of::<f32>();

/// An `N × D` matrix of embeddings, one row per input text.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl EmbeddingMatrix {
    /// A matrix with no rows. `dim` is still recorded so an empty bundle
    /// carries the provider's dimension.
    pub fn empty(dim: usize) -> Self {
        Self {
            rows: 0,
            dim,
            data: Vec::new(),
        }
    }

    /// Wrap a flat row-major buffer.
    pub fn from_flat(rows: usize, dim: usize, data: Vec<f32>) -> Result<Self, BundleError> {
        byte_len(rows, dim)?;
        let expected = rows * dim;
        if data.len() != expected {
            return Err(BundleError::Shape {
                rows,
                dim,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { rows, dim, data })
    }

    /// Stack row vectors. Every row must share the first row's length.
    ///
    /// With no rows the dimension falls back to `dim_hint`.
    pub fn from_rows(rows: Vec<Vec<f32>>, dim_hint: usize) -> Result<Self, BundleError> {
        let Some(first) = rows.first() else {
            return Ok(Self::empty(dim_hint));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(BundleError::ZeroDimension { rows: rows.len() });
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(BundleError::DimensionMismatch {
                    row: i,
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            dim,
            data,
        })
    }

    /// Decode raw little-endian bytes as a `rows × dim` matrix.
    ///
    /// Fails unless `bytes.len() == rows * dim * 4` exactly; the buffer is
    /// never truncated or padded to fit.
    pub fn from_le_bytes(bytes: &[u8], rows: usize, dim: usize) -> Result<Self, BundleError> {
        let expected = byte_len(rows, dim)?;
        if bytes.len() != expected {
            return Err(BundleError::ByteLength {
                expected,
                actual: bytes.len(),
            });
        }
        let data = bytes
            .chunks_exact(F32_BYTES)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { rows, dim, data })
    }

    /// Encode as raw little-endian bytes, row-major.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of bytes the encoded matrix occupies.
    pub fn byte_len(&self) -> usize {
        self.data.len() * F32_BYTES
    }

    /// Row `i`. Panics if out of bounds, like slice indexing.
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        // `dim` is only zero when there are no rows; chunks_exact panics on zero.
        let dim = self.dim.max(1);
        self.data.chunks_exact(dim).take(self.rows)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// `rows * dim * 4`: the exact byte length of an encoded matrix.
///
/// Fails for a zero dimension with rows present, or when the product does not
/// fit in `usize`.
pub fn byte_len(rows: usize, dim: usize) -> Result<usize, BundleError> {
    if dim == 0 && rows > 0 {
        return Err(BundleError::ZeroDimension { rows });
    }
    rows.checked_mul(dim)
        .and_then(|n| n.checked_mul(F32_BYTES))
        .ok_or(BundleError::Overflow { rows, dim })
}
