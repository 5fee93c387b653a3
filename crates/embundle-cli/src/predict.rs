//! Inference against an exported parameter file.

use anyhow::Context;
use embundle_ai::EmbeddingProvider;
use embundle_core::{BundleError, ModelParams, Prediction};

/// Embed `texts` and return the top class for each.
pub fn predict_texts<P>(
    provider: &mut P,
    params: &ModelParams,
    texts: &[String],
) -> anyhow::Result<Vec<Prediction>>
where
    P: EmbeddingProvider + ?Sized,
{
    if provider.dim() != params.num_features {
        return Err(BundleError::FeatureMismatch {
            expected: params.num_features,
            actual: provider.dim(),
        })
        .context("predict: embedding model does not match the parameter file");
    }

    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let vectors = provider
        .embed_batch(&refs)
        .context("predict: generating embeddings")?;
    if vectors.len() != texts.len() {
        return Err(BundleError::BatchSizeMismatch {
            batch: 0,
            expected: texts.len(),
            actual: vectors.len(),
        })
        .context("predict");
    }
    vectors
        .iter()
        .map(|v| params.predict(v).context("predict"))
        .collect()
}
