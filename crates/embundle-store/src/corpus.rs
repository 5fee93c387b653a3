//! CSV corpus loader: `(text, label)` pairs from two named columns.
//!
//! Reads the file with the Arrow CSV reader (schema inferred from the header
//! and data). Both columns are cast to `Utf8`, so numeric labels become their
//! string form. Rows with a null in either column are dropped; a value that is
//! present but blank is a schema error and aborts the load.

use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use embundle_core::Label;
use tracing::{info, warn};

use crate::StoreError;

/// Cleaned corpus, texts and labels index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub texts: Vec<String>,
    pub labels: Vec<Label>,
    /// Rows skipped because the text or label was missing.
    pub dropped: usize,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

/// Load `(text, label)` pairs from a CSV file with a header row.
pub fn load_csv_corpus(
    path: &Path,
    text_column: &str,
    label_column: &str,
) -> Result<Corpus, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }

    let mut file = File::open(path).map_err(StoreError::io(path))?;
    let format = Format::default().with_header(true);
    let (schema, _) = format.infer_schema(&mut file, None)?;
    file.rewind().map_err(StoreError::io(path))?;

    for column in [text_column, label_column] {
        if schema.index_of(column).is_err() {
            return Err(StoreError::Schema(format!(
                "missing column {column:?} in {}",
                path.display()
            )));
        }
    }

    let reader = ReaderBuilder::new(Arc::new(schema))
        .with_format(format)
        .build(file)?;

    let mut corpus = Corpus {
        texts: Vec::new(),
        labels: Vec::new(),
        dropped: 0,
    };
    let mut offset = 0usize;
    for batch in reader {
        let batch = batch?;
        collect_rows(&batch, text_column, label_column, offset, &mut corpus)?;
        offset += batch.num_rows();
    }

    if corpus.dropped > 0 {
        warn!(
            dropped = corpus.dropped,
            "dropped rows with missing text or label"
        );
    }
    info!(rows = corpus.len(), path = %path.display(), "loaded corpus");
    Ok(corpus)
}

fn collect_rows(
    batch: &RecordBatch,
    text_column: &str,
    label_column: &str,
    offset: usize,
    corpus: &mut Corpus,
) -> Result<(), StoreError> {
    let texts = utf8_column(batch, text_column)?;
    let labels = utf8_column(batch, label_column)?;
    let texts = as_strings(&texts, text_column)?;
    let labels = as_strings(&labels, label_column)?;

    for row in 0..batch.num_rows() {
        if texts.is_null(row) || labels.is_null(row) {
            corpus.dropped += 1;
            continue;
        }
        let text = texts.value(row);
        let label = labels.value(row);
        // Record numbers are 1-based and exclude the header.
        let record = offset + row + 1;
        if text.trim().is_empty() {
            return Err(StoreError::Schema(format!(
                "empty {text_column:?} value in record {record}"
            )));
        }
        if label.trim().is_empty() {
            return Err(StoreError::Schema(format!(
                "empty {label_column:?} value in record {record}"
            )));
        }
        corpus.texts.push(text.to_string());
        corpus.labels.push(Label::Text(label.to_string()));
    }
    Ok(())
}

fn utf8_column(batch: &RecordBatch, name: &str) -> Result<Arc<dyn Array>, StoreError> {
    let col = batch
        .column_by_name(name)
        .ok_or_else(|| StoreError::Schema(format!("missing column {name:?}")))?;
    Ok(cast(col.as_ref(), &DataType::Utf8)?)
}

fn as_strings<'a>(col: &'a Arc<dyn Array>, name: &str) -> Result<&'a StringArray, StoreError> {
    col.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| StoreError::Schema(format!("column {name:?} is not castable to text")))
}
