//! Exported linear classifier parameters (`model_weights.json`).
//!
//! The document is everything a downstream runtime needs for inference:
//! `argmax_c(dot(x, weights[c]) + bias[c])`, with softmax for probabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{BundleError, LabelEncoding};

/// `{num_classes, num_features, classes, label_to_id, weights, bias}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub num_classes: usize,
    pub num_features: usize,
    pub classes: Vec<String>,
    pub label_to_id: BTreeMap<String, u32>,
    /// `num_classes` rows of `num_features` weights.
    pub weights: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// One prediction: class id, its label, and its softmax probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_id: u32,
    pub label: String,
    pub probability: f32,
}

impl ModelParams {
    /// Check every shape and encoding invariant of the document.
    pub fn validate(&self) -> Result<(), BundleError> {
        if self.num_classes == 0 {
            return Err(BundleError::NoClasses);
        }
        if self.classes.len() != self.num_classes {
            return Err(BundleError::InvalidParams(format!(
                "num_classes is {} but {} classes are listed",
                self.num_classes,
                self.classes.len()
            )));
        }
        if self.weights.len() != self.num_classes {
            return Err(BundleError::InvalidParams(format!(
                "weights has {} rows, expected {}",
                self.weights.len(),
                self.num_classes
            )));
        }
        if let Some((c, row)) = self
            .weights
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.num_features)
        {
            return Err(BundleError::InvalidParams(format!(
                "weights row {c} has {} columns, expected {}",
                row.len(),
                self.num_features
            )));
        }
        if self.bias.len() != self.num_classes {
            return Err(BundleError::InvalidParams(format!(
                "bias has {} entries, expected {}",
                self.bias.len(),
                self.num_classes
            )));
        }

        let encoding = LabelEncoding::from_classes(self.classes.clone())?;
        if self.label_to_id != encoding.label_to_id() {
            return Err(BundleError::EncodingMismatch(
                "label_to_id does not match the class list".into(),
            ));
        }
        Ok(())
    }

    /// Fail unless these parameters were trained on exactly `encoding`'s classes.
    pub fn check_encoding(&self, encoding: &LabelEncoding) -> Result<(), BundleError> {
        if self.classes.as_slice() != encoding.classes() {
            return Err(BundleError::EncodingMismatch(format!(
                "model classes {:?} differ from label classes {:?}",
                self.classes,
                encoding.classes()
            )));
        }
        Ok(())
    }

    /// Raw scores `dot(x, w_c) + b_c` for every class.
    pub fn logits(&self, embedding: &[f32]) -> Result<Vec<f32>, BundleError> {
        if embedding.len() != self.num_features {
            return Err(BundleError::FeatureMismatch {
                expected: self.num_features,
                actual: embedding.len(),
            });
        }
        Ok(self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| dot(w, embedding) + b)
            .collect())
    }

    /// Softmax over [`logits`](Self::logits).
    pub fn probabilities(&self, embedding: &[f32]) -> Result<Vec<f32>, BundleError> {
        let mut scores = self.logits(embedding)?;
        softmax(&mut scores);
        Ok(scores)
    }

    /// Highest-probability class.
    pub fn predict(&self, embedding: &[f32]) -> Result<Prediction, BundleError> {
        let probs = self.probabilities(embedding)?;
        let (class_id, probability) = argmax(&probs).ok_or(BundleError::NoClasses)?;
        Ok(Prediction {
            class_id: class_id as u32,
            label: self.classes[class_id].clone(),
            probability,
        })
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// In-place softmax, shifted by the max for stability.
pub fn softmax(scores: &mut [f32]) {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    if sum > 0.0 {
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }
}

/// Index and value of the largest element; the first wins on ties.
pub fn argmax(values: &[f32]) -> Option<(usize, f32)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((i, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Label;

    fn two_class() -> ModelParams {
        let enc = LabelEncoding::fit(&[Label::from("leisure"), Label::from("finance")]);
        ModelParams {
            num_classes: 2,
            num_features: 2,
            classes: enc.classes().to_vec(),
            label_to_id: enc.label_to_id(),
            weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            bias: vec![0.0, 0.5],
        }
    }

    #[test]
    fn valid_params() {
        assert!(two_class().validate().is_ok());
    }

    #[test]
    fn predict_argmax() {
        let p = two_class();
        let pred = p.predict(&[2.0, 0.0]).unwrap();
        assert_eq!(pred.class_id, 0);
        assert_eq!(pred.label, "finance");
        assert!(pred.probability > 0.8);

        // Bias tips an even input toward class 1.
        let pred = p.predict(&[1.0, 1.0]).unwrap();
        assert_eq!(pred.label, "leisure");
    }

    #[test]
    fn probabilities_sum_to_one() {
        let probs = two_class().probabilities(&[0.3, -0.7]).unwrap();
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_handles_large_logits() {
        let mut s = vec![1000.0, 1000.0];
        softmax(&mut s);
        assert!((s[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn wrong_feature_count() {
        let err = two_class().predict(&[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            BundleError::FeatureMismatch {
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn validate_catches_shape_errors() {
        let mut p = two_class();
        p.weights.pop();
        assert!(matches!(p.validate(), Err(BundleError::InvalidParams(_))));

        let mut p = two_class();
        p.weights[1].push(0.0);
        assert!(matches!(p.validate(), Err(BundleError::InvalidParams(_))));

        let mut p = two_class();
        p.bias.push(0.0);
        assert!(matches!(p.validate(), Err(BundleError::InvalidParams(_))));
    }

    #[test]
    fn validate_catches_encoding_errors() {
        let mut p = two_class();
        p.label_to_id.insert("finance".into(), 1);
        assert!(matches!(p.validate(), Err(BundleError::EncodingMismatch(_))));

        let mut p = two_class();
        p.classes.reverse();
        assert!(matches!(p.validate(), Err(BundleError::EncodingMismatch(_))));
    }

    #[test]
    fn zero_classes_invalid() {
        let p = ModelParams {
            num_classes: 0,
            num_features: 4,
            classes: vec![],
            label_to_id: BTreeMap::new(),
            weights: vec![],
            bias: vec![],
        };
        assert_eq!(p.validate().unwrap_err(), BundleError::NoClasses);
    }

    #[test]
    fn check_encoding_detects_stale_labels() {
        let p = two_class();
        let same = LabelEncoding::fit(&[Label::from("finance"), Label::from("leisure")]);
        assert!(p.check_encoding(&same).is_ok());

        let other = LabelEncoding::fit(&[Label::from("finance"), Label::from("sport")]);
        assert!(matches!(
            p.check_encoding(&other),
            Err(BundleError::EncodingMismatch(_))
        ));
    }

    #[test]
    fn json_field_names() {
        let json = serde_json::to_value(two_class()).unwrap();
        assert_eq!(json["num_classes"], 2);
        assert_eq!(json["num_features"], 2);
        assert_eq!(json["classes"][0], "finance");
        assert_eq!(json["label_to_id"]["leisure"], 1);
        assert_eq!(json["weights"].as_array().unwrap().len(), 2);
        assert_eq!(json["bias"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), Some((1, 0.5)));
        assert_eq!(argmax(&[]), None);
    }
}
