//! Batch embedding pipeline: texts → one `N × D` matrix in input order.
//!
//! Texts are cut into consecutive batches of at most `batch_size`. Each batch
//! is embedded independently and appended in batch order, so row `i` is always
//! the embedding of text `i`. The first row fixes `D`; any later row of a
//! different length, or a batch that returns the wrong number of vectors,
//! fails the whole run.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use embundle_core::{BundleError, EmbeddingMatrix};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::provider::EmbeddingProvider;

/// A fully embedded corpus, ready for the bundle writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedded {
    pub matrix: EmbeddingMatrix,
    pub model: String,
    pub normalized: bool,
    pub elapsed_secs: f64,
}

/// Ordered accumulator that enforces a single dimension across batches.
struct MatrixBuilder {
    dim: Option<usize>,
    rows: usize,
    data: Vec<f32>,
}

impl MatrixBuilder {
    fn with_capacity(rows: usize, dim_hint: usize) -> Self {
        Self {
            dim: None,
            rows: 0,
            data: Vec::with_capacity(rows * dim_hint),
        }
    }

    fn push_batch(
        &mut self,
        batch: usize,
        expected: usize,
        vectors: Vec<Vec<f32>>,
    ) -> Result<(), BundleError> {
        if vectors.len() != expected {
            return Err(BundleError::BatchSizeMismatch {
                batch,
                expected,
                actual: vectors.len(),
            });
        }
        for v in vectors {
            let dim = *self.dim.get_or_insert(v.len());
            if v.len() != dim {
                return Err(BundleError::DimensionMismatch {
                    row: self.rows,
                    expected: dim,
                    actual: v.len(),
                });
            }
            self.data.extend_from_slice(&v);
            self.rows += 1;
        }
        Ok(())
    }

    fn finish(self, dim_hint: usize) -> Result<EmbeddingMatrix, BundleError> {
        match self.dim {
            Some(dim) => EmbeddingMatrix::from_flat(self.rows, dim, self.data),
            None => Ok(EmbeddingMatrix::empty(dim_hint)),
        }
    }
}

/// Embed `texts` with one provider, batch by batch.
pub fn embed_texts<P>(provider: &mut P, texts: &[String], batch_size: usize) -> anyhow::Result<Embedded>
where
    P: EmbeddingProvider + ?Sized,
{
    check_batch_size(batch_size)?;
    let start = Instant::now();
    let total = texts.len();
    let mut builder = MatrixBuilder::with_capacity(total, provider.dim());

    let mut processed = 0usize;
    for (batch, chunk) in texts.chunks(batch_size).enumerate() {
        let refs: Vec<&str> = chunk.iter().map(String::as_str).collect();
        let vectors = provider
            .embed_batch(&refs)
            .with_context(|| format!("embedding batch {batch}"))?;
        builder.push_batch(batch, chunk.len(), vectors)?;

        processed += chunk.len();
        debug!(batch, rows = chunk.len(), "embedded batch");
        eprint!(
            "\r  Embedded {processed}/{total} ({:.1}%)",
            processed as f64 / total as f64 * 100.0
        );
    }
    if total > 0 {
        eprintln!();
    }

    let matrix = builder.finish(provider.dim())?;
    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        rows = matrix.rows(),
        dim = matrix.dim(),
        elapsed_secs,
        "embedded corpus"
    );
    Ok(Embedded {
        matrix,
        model: provider.model_id().to_string(),
        normalized: provider.normalized(),
        elapsed_secs,
    })
}

/// Embed `texts` on a pool of independently owned providers.
///
/// Worker `w` takes batches `w, w + W, w + 2W, …` on a blocking thread. Each
/// result is stored in the slot for its batch index and the matrix is
/// assembled in batch order once every worker has finished.
pub async fn embed_texts_with_workers<P>(
    providers: Vec<P>,
    texts: Vec<String>,
    batch_size: usize,
) -> anyhow::Result<Embedded>
where
    P: EmbeddingProvider + Send + 'static,
{
    check_batch_size(batch_size)?;
    let first = providers
        .first()
        .ok_or_else(|| BundleError::InvalidConfig("at least one embedding worker is required".into()))?;
    let model = first.model_id().to_string();
    let normalized = first.normalized();
    let dim_hint = first.dim();
    for p in &providers[1..] {
        anyhow::ensure!(
            p.model_id() == model && p.normalized() == normalized && p.dim() == dim_hint,
            "embedding workers disagree on model, dimension or normalization"
        );
    }

    let start = Instant::now();
    let total = texts.len();
    let texts: Arc<[String]> = texts.into();
    let num_batches = total.div_ceil(batch_size);
    let workers = providers.len();

    let mut set = JoinSet::new();
    for (w, mut provider) in providers.into_iter().enumerate() {
        let texts = Arc::clone(&texts);
        set.spawn_blocking(move || -> anyhow::Result<Vec<(usize, Vec<Vec<f32>>)>> {
            let mut out = Vec::new();
            for batch in (w..num_batches).step_by(workers) {
                let lo = batch * batch_size;
                let hi = (lo + batch_size).min(texts.len());
                let refs: Vec<&str> = texts[lo..hi].iter().map(String::as_str).collect();
                let vectors = provider
                    .embed_batch(&refs)
                    .with_context(|| format!("embedding batch {batch}"))?;
                debug!(worker = w, batch, rows = refs.len(), "embedded batch");
                out.push((batch, vectors));
            }
            Ok(out)
        });
    }

    let mut slots: Vec<Option<Vec<Vec<f32>>>> = vec![None; num_batches];
    while let Some(joined) = set.join_next().await {
        for (batch, vectors) in joined.context("embedding worker panicked")?? {
            slots[batch] = Some(vectors);
        }
    }

    let mut builder = MatrixBuilder::with_capacity(total, dim_hint);
    for (batch, slot) in slots.into_iter().enumerate() {
        let vectors = slot.ok_or_else(|| anyhow::anyhow!("batch {batch} was never embedded"))?;
        let expected = batch_size.min(total - batch * batch_size);
        builder.push_batch(batch, expected, vectors)?;
    }

    let matrix = builder.finish(dim_hint)?;
    let elapsed_secs = start.elapsed().as_secs_f64();
    info!(
        rows = matrix.rows(),
        dim = matrix.dim(),
        workers,
        elapsed_secs,
        "embedded corpus"
    );
    Ok(Embedded {
        matrix,
        model,
        normalized,
        elapsed_secs,
    })
}

fn check_batch_size(batch_size: usize) -> Result<(), BundleError> {
    if batch_size == 0 {
        return Err(BundleError::InvalidConfig(
            "batch_size must be at least 1".into(),
        ));
    }
    Ok(())
}
