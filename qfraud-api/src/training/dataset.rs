//! Feature matrix / label vector view of stored rows

use super::Matrix;
use crate::models::transaction::FEATURE_COUNT;
use crate::models::TransactionRow;
use std::collections::BTreeMap;

/// Features and labels, row-aligned
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub features: Matrix,
    pub labels: Vec<i64>,
}

impl Dataset {
    pub fn from_rows(rows: &[TransactionRow]) -> Self {
        Self {
            features: Matrix::from_shape_fn((rows.len(), FEATURE_COUNT), |(i, j)| {
                rows[i].features[j]
            }),
            labels: rows.iter().map(|row| row.class).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Member count per label, ordered by label
    pub fn class_counts(&self) -> BTreeMap<i64, usize> {
        class_counts(&self.labels)
    }
}

pub fn class_counts(labels: &[i64]) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}
