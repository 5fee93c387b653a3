//! Class labels and the deterministic label encoding.
//!
//! Labels arrive either as strings or as integers (a `labels.json` written by
//! another producer may hold bare numbers). Both resolve to a canonical string
//! key before encoding, and ids are assigned by sorting those keys, so integer
//! labels follow string order (`"10"` sorts before `"2"`).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::BundleError;

/// A raw class label as stored in `labels.json`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Integer(i64),
}

impl Label {
    /// Canonical string key used by the encoding and the exported map.
    pub fn key(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Label {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// Bijection between the distinct label keys and `0..C`.
///
/// Built from the *set* of keys only: any permutation of the same multiset
/// yields the same encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoding {
    classes: Vec<String>,
    index: HashMap<String, u32>,
}

impl LabelEncoding {
    /// Compute the encoding from a label vector.
    pub fn fit(labels: &[Label]) -> Self {
        let texts = labels.iter().filter(|l| matches!(l, Label::Text(_))).count();
        if texts > 0 && texts < labels.len() {
            warn!(
                text = texts,
                integer = labels.len() - texts,
                "mixed text and integer labels; integers are encoded by their string form"
            );
        }

        let distinct: BTreeSet<String> = labels.iter().map(Label::key).collect();
        Self::from_sorted(distinct.into_iter().collect())
    }

    /// Build from class names that are already distinct and sorted.
    fn from_sorted(classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as u32))
            .collect();
        Self { classes, index }
    }

    /// Rebuild an encoding from an exported class list, checking it is
    /// strictly ascending (sorted and distinct).
    pub fn from_classes(classes: Vec<String>) -> Result<Self, BundleError> {
        if let Some(w) = classes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(BundleError::EncodingMismatch(format!(
                "classes not strictly ascending at {:?}, {:?}",
                w[0], w[1]
            )));
        }
        Ok(Self::from_sorted(classes))
    }

    /// Integer-encode a label vector.
    pub fn encode(&self, labels: &[Label]) -> Result<Vec<u32>, BundleError> {
        labels
            .iter()
            .map(|l| {
                let key = l.key();
                self.id_of(&key).ok_or(BundleError::UnknownLabel(key))
            })
            .collect()
    }

    /// Sorted class keys; index `i` is the key for id `i`.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn id_of(&self, key: &str) -> Option<u32> {
        self.index.get(key).copied()
    }

    /// Key → id map in key order, as exported.
    pub fn label_to_id(&self) -> BTreeMap<String, u32> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i as u32))
            .collect()
    }

    /// Number of classes (C).
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Per-class counts for a label vector, in class-id order.
    pub fn histogram(&self, labels: &[Label]) -> Result<Vec<(String, usize)>, BundleError> {
        let mut counts = vec![0usize; self.len()];
        for id in self.encode(labels)? {
            counts[id as usize] += 1;
        }
        Ok(self.classes.iter().cloned().zip(counts).collect())
    }
}
