//! Built-in classifiers and cross-validation.
//!
//! All models consume dense standardized feature rows and class indices produced by the
//! fitted preprocessor. Fitting is deterministic for a given input.

pub mod classical;
pub mod evaluation;
pub mod knn;
pub mod linear;
pub mod naive_bayes;
pub mod tree;

pub use classical::{Algorithm, TrainedModel};
pub use evaluation::{CrossValidation, CrossValidationResult};

use crate::error::MlError;

/// Feature rows with their class indices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledData {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl LabeledData {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<usize>) -> Result<Self, MlError> {
        if features.len() != labels.len() {
            return Err(MlError::invalid_input(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.first().map_or(0, Vec::len)
    }

    pub fn subset(&self, indices: &[usize]) -> LabeledData {
        LabeledData {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Index of the largest value. Ties go to the lowest index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Per-class counts of `labels`.
pub(crate) fn class_counts(labels: impl IntoIterator<Item = usize>, n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for label in labels {
        if label < n_classes {
            counts[label] += 1;
        }
    }
    counts
}

pub(crate) fn check_training_input(data: &LabeledData, n_classes: usize) -> Result<(), MlError> {
    if data.is_empty() {
        return Err(MlError::training("cannot fit on zero rows"));
    }
    if n_classes == 0 {
        return Err(MlError::training("no target classes"));
    }
    if let Some(&bad) = data.labels.iter().find(|&&l| l >= n_classes) {
        return Err(MlError::training(format!(
            "label index {bad} out of range for {n_classes} classes"
        )));
    }
    let width = data.n_features();
    if data.features.iter().any(|row| row.len() != width) {
        return Err(MlError::training("feature rows have uneven widths"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_prefers_first() {
        assert_eq!(argmax(&[1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&[0.0]), 0);
    }

    #[test]
    fn test_labeled_data_shape_checks() {
        assert!(LabeledData::new(vec![vec![1.0]], vec![]).is_err());
        let data = LabeledData::new(vec![vec![1.0], vec![2.0]], vec![0, 3]).unwrap();
        assert!(check_training_input(&data, 2).is_err());
        assert!(check_training_input(&data, 4).is_ok());
        assert_eq!(data.subset(&[1]).labels, vec![3]);
    }
}
