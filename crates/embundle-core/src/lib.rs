pub mod config;
pub mod error;
pub mod labels;
pub mod matrix;
pub mod meta;
pub mod params;

pub use config::{EmbedConfig, TrainConfig, WriteMode};
pub use error::BundleError;
pub use labels::{Label, LabelEncoding};
pub use matrix::EmbeddingMatrix;
pub use meta::{BundleMeta, Dtype};
pub use params::{ModelParams, Prediction};
