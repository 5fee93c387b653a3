//! Storage layer: CSV corpus ingestion, embedding bundles, model parameter files.

mod error;
pub use error::StoreError;

pub mod bundle;
pub use bundle::{Bundle, BundleOptions, BundlePaths, read_bundle, write_bundle};

pub mod corpus;
pub use corpus::{Corpus, load_csv_corpus};

pub mod params;
pub use params::{read_params, write_params};
