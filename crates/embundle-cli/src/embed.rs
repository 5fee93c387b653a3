//! Embedding pipeline: reads the corpus CSV, embeds every text, writes the bundle.

use std::fs;

use anyhow::Context;
use embundle_ai::{EmbeddingProvider, embed_texts, embed_texts_with_workers};
use embundle_core::EmbedConfig;
use embundle_store::{BundleOptions, BundlePaths};
use tracing::warn;

pub struct EmbedStats {
    pub total_rows: usize,
    pub dropped: usize,
    pub dim: usize,
    pub elapsed_secs: f64,
}

/// Run the full embedding pipeline: read CSV → embed text → write bundle.
///
/// With more than one provider, batches are spread across them; otherwise the
/// single provider embeds every batch in order on the current thread.
pub async fn run_embed_pipeline<P>(
    config: &EmbedConfig,
    mut providers: Vec<P>,
) -> anyhow::Result<EmbedStats>
where
    P: EmbeddingProvider + Send + 'static,
{
    // 1. Read source corpus.
    let corpus = embundle_store::load_csv_corpus(
        &config.corpus,
        &config.text_column,
        &config.label_column,
    )
    .context("embed: reading corpus")?;
    eprintln!(
        "  Read {} rows from {}",
        corpus.len(),
        config.corpus.display()
    );
    if corpus.is_empty() {
        warn!(corpus = %config.corpus.display(), "corpus has no usable rows");
    }

    // 2. Embed.
    let embedded = if providers.len() > 1 {
        embed_texts_with_workers(providers, corpus.texts, config.batch_size)
            .await
            .context("embed: generating embeddings")?
    } else {
        let mut provider = providers
            .pop()
            .context("embed: no embedding provider configured")?;
        embed_texts(&mut provider, &corpus.texts, config.batch_size)
            .context("embed: generating embeddings")?
    };

    // 3. Write bundle.
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("embed: creating {}", config.out_dir.display()))?;
    let meta = embundle_store::write_bundle(
        &BundlePaths::in_dir(&config.out_dir),
        &embedded.matrix,
        &corpus.labels,
        &BundleOptions {
            model: embedded.model,
            normalized: embedded.normalized,
            mode: config.write_mode,
        },
    )
    .context("embed: writing bundle")?;

    Ok(EmbedStats {
        total_rows: meta.count,
        dropped: corpus.dropped,
        dim: meta.dim,
        elapsed_secs: embedded.elapsed_secs,
    })
}
