//! Multinomial logistic regression trained with full-batch gradient descent.

use super::{LabeledData, argmax, check_training_input};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// One row of weights per class.
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

fn softmax(logits: &mut [f64]) {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for z in logits.iter_mut() {
        *z = (*z - max).exp();
        sum += *z;
    }
    for z in logits.iter_mut() {
        *z /= sum;
    }
}

impl LogisticModel {
    /// Weights start at zero, so the result depends only on the data.
    pub fn fit(
        data: &LabeledData,
        n_classes: usize,
        learning_rate: f64,
        epochs: usize,
    ) -> Result<Self, MlError> {
        check_training_input(data, n_classes)?;
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(MlError::training(format!(
                "learning_rate must be positive, got {learning_rate}"
            )));
        }

        let n_features = data.n_features();
        let n = data.len() as f64;
        let mut model = Self {
            weights: vec![vec![0.0; n_features]; n_classes],
            bias: vec![0.0; n_classes],
        };

        for _ in 0..epochs {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];
            for (row, &label) in data.features.iter().zip(&data.labels) {
                let mut probs = model.logits(row);
                softmax(&mut probs);
                for class in 0..n_classes {
                    let err = probs[class] - if class == label { 1.0 } else { 0.0 };
                    grad_b[class] += err;
                    for (g, x) in grad_w[class].iter_mut().zip(row) {
                        *g += err * x;
                    }
                }
            }
            for class in 0..n_classes {
                model.bias[class] -= learning_rate * grad_b[class] / n;
                for (w, g) in model.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= learning_rate * g / n;
                }
            }
        }
        Ok(model)
    }

    fn logits(&self, row: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(w, b)| b + w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>())
            .collect()
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut probs = self.logits(row);
        softmax(&mut probs);
        probs
    }

    pub fn predict_one(&self, row: &[f64]) -> usize {
        argmax(&self.logits(row))
    }
}
