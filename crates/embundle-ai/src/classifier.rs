//! Linear classifier training and export.
//!
//! Training always recomputes the label encoding from the labels it is given,
//! never from a cached encoding, so a stale label file shows up as a class
//! mismatch at export or prediction time rather than as silently shifted ids.

use embundle_core::{
    BundleError, BundleMeta, EmbeddingMatrix, Label, LabelEncoding, ModelParams, TrainConfig,
};
use tracing::info;

use crate::solver::{self, LinearModel};

/// A fitted model together with the encoding its class ids refer to.
pub struct TrainedClassifier {
    pub encoding: LabelEncoding,
    pub model: LinearModel,
    /// Accuracy on the training rows.
    pub train_accuracy: f32,
}

/// Summary of a training run.
pub struct TrainSummary {
    pub samples: usize,
    pub classes: usize,
    pub features: usize,
    pub iterations: usize,
    pub converged: bool,
    pub train_accuracy: f32,
}

impl TrainedClassifier {
    pub fn summary(&self, samples: usize) -> TrainSummary {
        TrainSummary {
            samples,
            classes: self.encoding.len(),
            features: self.model.num_features,
            iterations: self.model.iterations,
            converged: self.model.converged,
            train_accuracy: self.train_accuracy,
        }
    }
}

/// Encode `labels` and fit a multinomial model on the rows of `x`.
pub fn train(
    x: &EmbeddingMatrix,
    labels: &[Label],
    config: &TrainConfig,
) -> Result<TrainedClassifier, BundleError> {
    if labels.len() != x.rows() {
        return Err(BundleError::LabelCount {
            expected: x.rows(),
            actual: labels.len(),
        });
    }

    let encoding = LabelEncoding::fit(labels);
    match encoding.len() {
        0 => return Err(BundleError::NoClasses),
        1 => return Err(BundleError::SingleClass(encoding.classes()[0].clone())),
        _ => {}
    }
    let y = encoding.encode(labels)?;
    info!(
        samples = y.len(),
        classes = encoding.len(),
        "encoded labels"
    );

    let model = solver::fit(x, &y, encoding.len(), config)?;
    let train_accuracy = model.accuracy(x, &y);
    info!(train_accuracy, "training accuracy");

    Ok(TrainedClassifier {
        encoding,
        model,
        train_accuracy,
    })
}

/// Build the parameter document for a fitted model.
///
/// Checks `C > 0`, that weights have one row per class and `meta.dim` columns,
/// and that the bias has one entry per class.
pub fn export(
    model: &LinearModel,
    encoding: &LabelEncoding,
    meta: &BundleMeta,
) -> Result<ModelParams, BundleError> {
    if encoding.is_empty() {
        return Err(BundleError::NoClasses);
    }
    if model.weights.len() != encoding.len() {
        return Err(BundleError::EncodingMismatch(format!(
            "model has {} weight rows but the labels have {} classes",
            model.weights.len(),
            encoding.len()
        )));
    }
    if model.num_features != meta.dim {
        return Err(BundleError::FeatureMismatch {
            expected: meta.dim,
            actual: model.num_features,
        });
    }
    if let Some(row) = model.weights.iter().find(|w| w.len() != meta.dim) {
        return Err(BundleError::FeatureMismatch {
            expected: meta.dim,
            actual: row.len(),
        });
    }
    if model.bias.len() != encoding.len() {
        return Err(BundleError::InvalidParams(format!(
            "bias has {} entries, expected {}",
            model.bias.len(),
            encoding.len()
        )));
    }

    let params = ModelParams {
        num_classes: encoding.len(),
        num_features: meta.dim,
        classes: encoding.classes().to_vec(),
        label_to_id: encoding.label_to_id(),
        weights: model.weights.clone(),
        bias: model.bias.clone(),
    };
    params.validate()?;
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(count: usize, dim: usize) -> BundleMeta {
        BundleMeta {
            count,
            dim,
            dtype: Default::default(),
            model: "stub".into(),
            normalized: true,
        }
    }

    fn two_topics() -> (EmbeddingMatrix, Vec<Label>) {
        let x = EmbeddingMatrix::from_rows(
            vec![
                vec![0.9, 0.1, 0.0, 0.0],
                vec![0.1, 0.9, 0.0, 0.0],
                vec![0.8, 0.0, 0.2, 0.0],
                vec![0.0, 0.8, 0.0, 0.2],
            ],
            4,
        )
        .unwrap();
        let labels = ["leisure", "finance", "leisure", "finance"]
            .into_iter()
            .map(Label::from)
            .collect();
        (x, labels)
    }

    #[test]
    fn train_and_export() {
        let (x, labels) = two_topics();
        let trained = train(&x, &labels, &TrainConfig::default()).unwrap();
        assert_eq!(trained.encoding.classes(), &["finance", "leisure"]);
        assert_eq!(trained.train_accuracy, 1.0);

        let params = export(&trained.model, &trained.encoding, &meta(4, 4)).unwrap();
        assert_eq!(params.num_classes, 2);
        assert_eq!(params.num_features, 4);
        assert_eq!(params.classes, vec!["finance", "leisure"]);
        assert_eq!(params.label_to_id["finance"], 0);
        assert_eq!(params.label_to_id["leisure"], 1);
        assert_eq!(params.weights.len(), 2);
        assert!(params.weights.iter().all(|w| w.len() == 4));
        assert_eq!(params.bias.len(), 2);

        // Exported parameters reproduce the training predictions.
        for (row, label) in x.iter_rows().zip(&labels) {
            assert_eq!(params.predict(row).unwrap().label, label.key());
        }
    }

    #[test]
    fn export_rejects_zero_classes() {
        let model = LinearModel {
            num_features: 4,
            weights: vec![],
            bias: vec![],
            iterations: 0,
            converged: false,
            loss: 0.0,
        };
        let err = export(&model, &LabelEncoding::fit(&[]), &meta(0, 4)).unwrap_err();
        assert_eq!(err, BundleError::NoClasses);
    }

    #[test]
    fn export_rejects_dim_mismatch() {
        let (x, labels) = two_topics();
        let trained = train(&x, &labels, &TrainConfig::default()).unwrap();
        let err = export(&trained.model, &trained.encoding, &meta(4, 8)).unwrap_err();
        assert_eq!(
            err,
            BundleError::FeatureMismatch {
                expected: 8,
                actual: 4
            }
        );
    }

    #[test]
    fn export_rejects_stale_encoding() {
        let (x, labels) = two_topics();
        let trained = train(&x, &labels, &TrainConfig::default()).unwrap();
        let stale = LabelEncoding::fit(&[Label::from("a"), Label::from("b"), Label::from("c")]);
        assert!(matches!(
            export(&trained.model, &stale, &meta(4, 4)),
            Err(BundleError::EncodingMismatch(_))
        ));
    }

    #[test]
    fn train_rejects_empty_corpus() {
        let x = EmbeddingMatrix::empty(4);
        assert!(matches!(
            train(&x, &[], &TrainConfig::default()),
            Err(BundleError::NoClasses)
        ));
    }

    #[test]
    fn train_rejects_single_class() {
        let x = EmbeddingMatrix::from_rows(vec![vec![1.0], vec![0.5]], 1).unwrap();
        let labels = vec![Label::from("only"), Label::from("only")];
        assert_eq!(
            train(&x, &labels, &TrainConfig::default()).err(),
            Some(BundleError::SingleClass("only".into()))
        );
    }

    #[test]
    fn train_rejects_label_count_mismatch() {
        let (x, mut labels) = two_topics();
        labels.push(Label::from("extra"));
        assert!(matches!(
            train(&x, &labels, &TrainConfig::default()),
            Err(BundleError::LabelCount {
                expected: 4,
                actual: 5
            })
        ));
    }

    #[test]
    fn integer_labels_export_string_keys() {
        let x = EmbeddingMatrix::from_rows(
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1], vec![0.1, 0.9]],
            2,
        )
        .unwrap();
        let labels = vec![
            Label::Integer(10),
            Label::Integer(2),
            Label::Integer(10),
            Label::Integer(2),
        ];
        let trained = train(&x, &labels, &TrainConfig::default()).unwrap();
        let params = export(&trained.model, &trained.encoding, &meta(4, 2)).unwrap();
        assert_eq!(params.classes, vec!["10", "2"]);
        assert_eq!(params.label_to_id["10"], 0);
        assert_eq!(params.predict(&[0.0, 1.0]).unwrap().label, "2");
    }
}
