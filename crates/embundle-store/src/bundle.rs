//! Bundle files: `embeddings.bin`, `labels.json`, `meta.json`.
//!
//! The three artifacts share one shape contract: the binary file holds exactly
//! `count * dim * 4` bytes, the label array holds exactly `count` entries, and
//! `meta.json` records `count` and `dim`. Nothing links the files beyond those
//! numbers, so every read re-validates them.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use embundle_core::{
    BundleError, BundleMeta, Dtype, EmbeddingMatrix, Label, LabelEncoding, WriteMode,
};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::StoreError;

pub const EMBEDDINGS_FILE: &str = "embeddings.bin";
pub const LABELS_FILE: &str = "labels.json";
pub const META_FILE: &str = "meta.json";

/// Locations of a bundle's three artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlePaths {
    pub embeddings: PathBuf,
    pub labels: PathBuf,
    pub meta: PathBuf,
}

impl BundlePaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            embeddings: dir.join(EMBEDDINGS_FILE),
            labels: dir.join(LABELS_FILE),
            meta: dir.join(META_FILE),
        }
    }
}

/// Per-bundle settings recorded in, or governing, the write.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleOptions {
    pub model: String,
    pub normalized: bool,
    pub mode: WriteMode,
}

/// A bundle loaded back from disk, already shape-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub meta: BundleMeta,
    pub matrix: EmbeddingMatrix,
    pub labels: Vec<Label>,
}

impl Bundle {
    /// Recompute the label encoding from the labels actually loaded.
    pub fn encoding(&self) -> LabelEncoding {
        LabelEncoding::fit(&self.labels)
    }
}

/// Write the matrix, labels and metadata.
///
/// `count` and `dim` are taken from `matrix`. Artifacts are written in the
/// order embeddings, labels, metadata; with [`WriteMode::Direct`] a failure
/// part-way can leave earlier files from this run next to stale later ones.
pub fn write_bundle(
    paths: &BundlePaths,
    matrix: &EmbeddingMatrix,
    labels: &[Label],
    options: &BundleOptions,
) -> Result<BundleMeta, StoreError> {
    let meta = BundleMeta::for_matrix(matrix, &options.model, options.normalized);
    meta.check_labels(labels.len())?;
    let expected = meta.expected_bytes()?;

    let bin = matrix.to_le_bytes();
    let labels_json = serde_json::to_vec(labels).map_err(StoreError::json(&paths.labels))?;
    let mut meta_json =
        serde_json::to_vec_pretty(&meta).map_err(StoreError::json(&paths.meta))?;
    meta_json.push(b'\n');

    write_artifact(&paths.embeddings, &bin, options.mode)?;
    debug!(path = %paths.embeddings.display(), bytes = bin.len(), "wrote embeddings");
    write_artifact(&paths.labels, &labels_json, options.mode)?;
    debug!(path = %paths.labels.display(), count = labels.len(), "wrote labels");

    let written = file_len(&paths.embeddings)?;
    if written != expected {
        return Err(BundleError::ByteLength {
            expected,
            actual: written,
        }
        .into());
    }

    write_artifact(&paths.meta, &meta_json, options.mode)?;
    info!(
        count = meta.count,
        dim = meta.dim,
        model = %meta.model,
        normalized = meta.normalized,
        "wrote bundle"
    );
    Ok(meta)
}

/// Read and validate `meta.json`.
pub fn read_meta(path: &Path) -> Result<BundleMeta, StoreError> {
    let bytes = read_file(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(StoreError::json(path))?;

    // Surface an unsupported dtype as such rather than as a parse error.
    match value.get("dtype") {
        Some(serde_json::Value::String(s)) => {
            Dtype::parse(s)?;
        }
        Some(other) => return Err(BundleError::UnsupportedDtype(other.to_string()).into()),
        None => {
            return Err(StoreError::Schema(format!(
                "missing \"dtype\" in {}",
                path.display()
            )));
        }
    }

    let meta: BundleMeta = serde_json::from_value(value).map_err(StoreError::json(path))?;
    meta.expected_bytes()?;
    Ok(meta)
}

/// Read the binary embedding file described by `meta`.
///
/// The file length must equal `count * dim * 4` before anything is decoded.
pub fn read_embeddings(meta: &BundleMeta, path: &Path) -> Result<EmbeddingMatrix, StoreError> {
    let expected = meta.expected_bytes()?;
    let actual = file_len(path)?;
    if actual != expected {
        return Err(BundleError::ByteLength { expected, actual }.into());
    }

    let bytes = read_file(path)?;
    let matrix = EmbeddingMatrix::from_le_bytes(&bytes, meta.count, meta.dim)?;
    meta.check_matrix(&matrix)?;
    Ok(matrix)
}

/// Read `labels.json` (strings and/or integers).
pub fn read_labels(path: &Path) -> Result<Vec<Label>, StoreError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(StoreError::json(path))
}

/// Read all three artifacts and check they agree.
pub fn read_bundle(paths: &BundlePaths) -> Result<Bundle, StoreError> {
    let meta = read_meta(&paths.meta)?;
    let matrix = read_embeddings(&meta, &paths.embeddings)?;
    let labels = read_labels(&paths.labels)?;
    meta.check_labels(labels.len())?;

    info!(count = meta.count, dim = meta.dim, model = %meta.model, "loaded bundle");
    Ok(Bundle {
        meta,
        matrix,
        labels,
    })
}

// ── File helpers ──

pub(crate) fn write_artifact(path: &Path, bytes: &[u8], mode: WriteMode) -> Result<(), StoreError> {
    match mode {
        WriteMode::Direct => fs::write(path, bytes).map_err(StoreError::io(path)),
        WriteMode::Staged => {
            let dir = match path.parent() {
                Some(p) if !p.as_os_str().is_empty() => p,
                _ => Path::new("."),
            };
            let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
            tmp.write_all(bytes).map_err(StoreError::io(path))?;
            tmp.as_file().sync_all().map_err(StoreError::io(path))?;
            tmp.persist(path).map_err(|e| StoreError::Io {
                path: path.to_path_buf(),
                source: e.error,
            })?;
            Ok(())
        }
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    fs::read(path).map_err(StoreError::io(path))
}

fn file_len(path: &Path) -> Result<usize, StoreError> {
    if !path.exists() {
        return Err(StoreError::NotFound(path.to_path_buf()));
    }
    let len = fs::metadata(path).map_err(StoreError::io(path))?.len();
    usize::try_from(len).map_err(|_| {
        StoreError::Schema(format!(
            "{} is {len} bytes, too large to address",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(mode: WriteMode) -> BundleOptions {
        BundleOptions {
            model: "stub-model".into(),
            normalized: true,
            mode,
        }
    }

    fn sample() -> (EmbeddingMatrix, Vec<Label>) {
        let matrix = EmbeddingMatrix::from_rows(
            vec![
                vec![0.1, 0.2, 0.3, 0.4],
                vec![-1.0, 0.0, 1.0, 1e-30],
                vec![f32::MAX, f32::MIN, 0.5, -0.25],
            ],
            4,
        )
        .unwrap();
        let labels = vec![
            Label::from("leisure"),
            Label::from("finance"),
            Label::from("café"),
        ];
        (matrix, labels)
    }

    #[test]
    fn write_then_read_is_bit_identical() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();

        let meta = write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();
        assert_eq!(meta.count, 3);
        assert_eq!(meta.dim, 4);

        let bundle = read_bundle(&paths).unwrap();
        assert_eq!(bundle.meta, meta);
        assert_eq!(bundle.labels, labels);
        let written: Vec<u32> = matrix.as_slice().iter().map(|v| v.to_bits()).collect();
        let read: Vec<u32> = bundle.matrix.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(written, read);
    }

    #[test]
    fn binary_file_has_exact_length() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();

        let len = fs::metadata(&paths.embeddings).unwrap().len();
        assert_eq!(len, 3 * 4 * 4);
    }

    #[test]
    fn artifact_formats() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();

        let labels_text = fs::read_to_string(&paths.labels).unwrap();
        assert_eq!(labels_text, r#"["leisure","finance","café"]"#);

        let meta: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&paths.meta).unwrap()).unwrap();
        assert_eq!(meta["count"], 3);
        assert_eq!(meta["dim"], 4);
        assert_eq!(meta["dtype"], "float32");
        assert_eq!(meta["model"], "stub-model");
        assert_eq!(meta["normalized"], true);
    }

    #[test]
    fn staged_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Staged)).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec![EMBEDDINGS_FILE, LABELS_FILE, META_FILE]);
        assert!(read_bundle(&paths).is_ok());
    }

    #[test]
    fn label_count_checked_before_writing() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, mut labels) = sample();
        labels.pop();

        let err = write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Bundle(BundleError::LabelCount {
                expected: 3,
                actual: 2
            })
        ));
        assert!(!paths.embeddings.exists());
    }

    #[test]
    fn truncated_binary_fails() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();

        let bytes = fs::read(&paths.embeddings).unwrap();
        fs::write(&paths.embeddings, &bytes[..bytes.len() - 1]).unwrap();

        let err = read_bundle(&paths).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Bundle(BundleError::ByteLength {
                expected: 48,
                actual: 47
            })
        ));
        assert_eq!(err.to_string(), "byte length mismatch: expected 48, got 47");
    }

    #[test]
    fn oversized_binary_fails() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();

        let mut bytes = fs::read(&paths.embeddings).unwrap();
        bytes.extend_from_slice(&[0u8; 16]);
        fs::write(&paths.embeddings, bytes).unwrap();

        assert!(matches!(
            read_bundle(&paths),
            Err(StoreError::Bundle(BundleError::ByteLength { .. }))
        ));
    }

    #[test]
    fn stale_labels_fail() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let (matrix, labels) = sample();
        write_bundle(&paths, &matrix, &labels, &options(WriteMode::Direct)).unwrap();

        fs::write(&paths.labels, r#"["a","b"]"#).unwrap();
        assert!(matches!(
            read_bundle(&paths),
            Err(StoreError::Bundle(BundleError::LabelCount {
                expected: 3,
                actual: 2
            }))
        ));
    }

    #[test]
    fn unsupported_dtype_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(META_FILE);
        fs::write(
            &path,
            r#"{"count":1,"dim":2,"dtype":"float16","model":"m","normalized":false}"#,
        )
        .unwrap();

        let err = read_meta(&path).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Bundle(BundleError::UnsupportedDtype(ref d)) if d == "float16"
        ));
    }

    #[test]
    fn missing_dtype_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(META_FILE);
        fs::write(&path, r#"{"count":1,"dim":2,"model":"m","normalized":false}"#).unwrap();
        assert!(matches!(read_meta(&path), Err(StoreError::Schema(_))));
    }

    fn write_meta(dir: &TempDir, count: usize, dim: usize) -> BundlePaths {
        let paths = BundlePaths::in_dir(dir.path());
        fs::write(
            &paths.meta,
            format!(
                r#"{{"count":{count},"dim":{dim},"dtype":"float32","model":"m","normalized":true}}"#
            ),
        )
        .unwrap();
        paths
    }

    #[test]
    fn overflowing_meta_fails_without_reshaping() {
        let dir = TempDir::new().unwrap();
        let count = usize::MAX / 4 + 1;
        let paths = write_meta(&dir, count, 1);
        fs::write(&paths.embeddings, b"").unwrap();

        let meta = BundleMeta {
            count,
            dim: 1,
            dtype: Dtype::Float32,
            model: "m".into(),
            normalized: true,
        };
        assert!(matches!(
            read_embeddings(&meta, &paths.embeddings),
            Err(StoreError::Bundle(BundleError::Overflow { dim: 1, .. }))
        ));
        assert!(matches!(
            read_meta(&paths.meta),
            Err(StoreError::Bundle(BundleError::Overflow { .. }))
        ));
    }

    #[test]
    fn zero_dim_with_rows_fails() {
        let dir = TempDir::new().unwrap();
        let paths = write_meta(&dir, 4, 0);
        fs::write(&paths.embeddings, b"").unwrap();
        fs::write(&paths.labels, r#"["a","b","a","b"]"#).unwrap();

        assert!(matches!(
            read_bundle(&paths),
            Err(StoreError::Bundle(BundleError::ZeroDimension { rows: 4 }))
        ));
    }

    #[test]
    fn empty_bundle_round_trips() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        let matrix = EmbeddingMatrix::empty(384);

        let meta = write_bundle(&paths, &matrix, &[], &options(WriteMode::Direct)).unwrap();
        assert_eq!(meta.count, 0);
        assert_eq!(meta.dim, 384);
        assert_eq!(fs::metadata(&paths.embeddings).unwrap().len(), 0);
        assert_eq!(fs::read_to_string(&paths.labels).unwrap(), "[]");

        let bundle = read_bundle(&paths).unwrap();
        assert!(bundle.matrix.is_empty());
        assert!(bundle.labels.is_empty());
        assert!(bundle.encoding().is_empty());
    }

    #[test]
    fn integer_labels_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(LABELS_FILE);
        fs::write(&path, "[3, 1, 3]").unwrap();

        let labels = read_labels(&path).unwrap();
        assert_eq!(labels, vec![Label::Integer(3), Label::Integer(1), Label::Integer(3)]);
    }

    #[test]
    fn missing_meta_is_not_found() {
        let dir = TempDir::new().unwrap();
        let paths = BundlePaths::in_dir(dir.path());
        assert!(matches!(read_bundle(&paths), Err(StoreError::NotFound(_))));
    }
}
