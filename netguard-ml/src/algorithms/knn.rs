//! k-nearest neighbours.

use super::{LabeledData, argmax, check_training_input};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Keeps the training set and votes among the `n_neighbors` closest rows (Euclidean).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnModel {
    pub n_neighbors: usize,
    pub n_classes: usize,
    pub points: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl KnnModel {
    pub fn fit(data: &LabeledData, n_classes: usize, n_neighbors: usize) -> Result<Self, MlError> {
        check_training_input(data, n_classes)?;
        if n_neighbors == 0 {
            return Err(MlError::training("n_neighbors must be at least 1"));
        }
        Ok(Self {
            n_neighbors,
            n_classes,
            points: data.features.clone(),
            labels: data.labels.clone(),
        })
    }

    /// Equal distances keep training order; equal votes go to the lower class index.
    pub fn predict_one(&self, row: &[f64]) -> usize {
        let mut distances: Vec<(f64, usize)> = self
            .points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let d: f64 = p.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d, i)
            })
            .collect();
        distances.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut votes = vec![0.0; self.n_classes];
        for &(_, i) in distances.iter().take(self.n_neighbors) {
            votes[self.labels[i]] += 1.0;
        }
        argmax(&votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_majority_of_neighbours() {
        let data = LabeledData::new(
            vec![vec![0.0], vec![0.1], vec![0.2], vec![5.0], vec![5.1]],
            vec![0, 0, 0, 1, 1],
        )
        .unwrap();
        let model = KnnModel::fit(&data, 2, 3).unwrap();
        assert_eq!(model.predict_one(&[0.05]), 0);
        assert_eq!(model.predict_one(&[4.9]), 1);
    }

    #[test]
    fn test_zero_neighbours_rejected() {
        let data = LabeledData::new(vec![vec![0.0]], vec![0]).unwrap();
        assert!(KnnModel::fit(&data, 1, 0).is_err());
    }
}
