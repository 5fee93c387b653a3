//! Embedding and classification layer: embedding providers, the batch
//! embedding pipeline, and multinomial linear classifier training/export.

pub mod classifier;
pub mod pipeline;
pub mod provider;
pub mod solver;

pub use classifier::{TrainSummary, TrainedClassifier, export, train};
pub use pipeline::{Embedded, embed_texts, embed_texts_with_workers};
pub use provider::EmbeddingProvider;
pub use solver::LinearModel;

#[cfg(feature = "onnx")]
mod embedder;
#[cfg(feature = "onnx")]
pub use embedder::Embedder;
