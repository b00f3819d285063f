//! Gaussian naive Bayes.

use super::{LabeledData, argmax, check_training_input};
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Per-class feature means and variances. Classes absent from training are never predicted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaussianNbModel {
    pub class_counts: Vec<usize>,
    pub means: Vec<Vec<f64>>,
    pub variances: Vec<Vec<f64>>,
}

/// Added to every variance, relative to the largest feature variance.
const VAR_SMOOTHING: f64 = 1e-9;

impl GaussianNbModel {
    pub fn fit(data: &LabeledData, n_classes: usize) -> Result<Self, MlError> {
        check_training_input(data, n_classes)?;
        let n_features = data.n_features();

        let mut class_counts = vec![0usize; n_classes];
        let mut means = vec![vec![0.0; n_features]; n_classes];
        for (row, &label) in data.features.iter().zip(&data.labels) {
            class_counts[label] += 1;
            for (m, x) in means[label].iter_mut().zip(row) {
                *m += x;
            }
        }
        for (class, mean) in means.iter_mut().enumerate() {
            if class_counts[class] > 0 {
                mean.iter_mut().for_each(|m| *m /= class_counts[class] as f64);
            }
        }

        let mut variances = vec![vec![0.0; n_features]; n_classes];
        for (row, &label) in data.features.iter().zip(&data.labels) {
            for ((v, x), m) in variances[label].iter_mut().zip(row).zip(&means[label]) {
                *v += (x - m).powi(2);
            }
        }

        let epsilon = VAR_SMOOTHING * max_feature_variance(data).max(1.0);
        for (class, var) in variances.iter_mut().enumerate() {
            let count = class_counts[class].max(1) as f64;
            var.iter_mut().for_each(|v| *v = *v / count + epsilon);
        }

        Ok(Self {
            class_counts,
            means,
            variances,
        })
    }

    pub fn predict_one(&self, row: &[f64]) -> usize {
        let total: usize = self.class_counts.iter().sum();
        let scores: Vec<f64> = (0..self.class_counts.len())
            .map(|class| {
                if self.class_counts[class] == 0 {
                    return f64::NEG_INFINITY;
                }
                let prior = (self.class_counts[class] as f64 / total as f64).ln();
                let likelihood: f64 = row
                    .iter()
                    .zip(&self.means[class])
                    .zip(&self.variances[class])
                    .map(|((x, m), v)| -0.5 * (2.0 * PI * v).ln() - (x - m).powi(2) / (2.0 * v))
                    .sum();
                prior + likelihood
            })
            .collect();
        argmax(&scores)
    }
}

fn max_feature_variance(data: &LabeledData) -> f64 {
    let n = data.len() as f64;
    (0..data.n_features())
        .map(|j| {
            let mean = data.features.iter().map(|r| r[j]).sum::<f64>() / n;
            data.features.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n
        })
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separates_two_gaussians() {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = (i % 5) as f64 * 0.1;
            features.push(vec![-2.0 + jitter, 1.0]);
            labels.push(0);
            features.push(vec![2.0 + jitter, 1.0]);
            labels.push(1);
        }
        let data = LabeledData::new(features, labels).unwrap();
        let model = GaussianNbModel::fit(&data, 2).unwrap();
        assert_eq!(model.predict_one(&[-1.8, 1.0]), 0);
        assert_eq!(model.predict_one(&[2.1, 1.0]), 1);
        assert!(model.variances.iter().flatten().all(|v| *v > 0.0));
    }

    #[test]
    fn test_unseen_class_is_never_predicted() {
        let data = LabeledData::new(vec![vec![0.0], vec![1.0]], vec![1, 1]).unwrap();
        let model = GaussianNbModel::fit(&data, 3).unwrap();
        assert_eq!(model.predict_one(&[0.5]), 1);
        assert_eq!(model.class_counts, vec![0, 2, 0]);
    }
}
