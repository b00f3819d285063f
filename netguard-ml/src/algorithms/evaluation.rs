//! K-fold cross-validation.

use super::{Algorithm, LabeledData};
use crate::error::MlError;
use crate::training::metrics::accuracy;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Cross-validation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidation {
    pub n_folds: usize,
    pub shuffle: bool,
    pub random_state: Option<u64>,
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self {
            n_folds: 3,
            shuffle: true,
            random_state: Some(42),
        }
    }
}

/// Cross-validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationResult {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub metric_name: String,
}

impl CrossValidationResult {
    pub fn from_scores(scores: Vec<f64>, metric_name: &str) -> Self {
        let n = scores.len().max(1) as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_scores: scores,
            mean_score: mean,
            std_score: variance.sqrt(),
            metric_name: metric_name.to_string(),
        }
    }
}

impl CrossValidation {
    /// `(train, validation)` index pairs. The first `n % n_folds` folds get one extra row.
    pub fn folds(&self, n: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>, MlError> {
        if self.n_folds < 2 {
            return Err(MlError::config(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.n_folds
            )));
        }
        if n < self.n_folds {
            return Err(MlError::training(format!(
                "cannot split {n} rows into {} folds",
                self.n_folds
            )));
        }

        let mut order: Vec<usize> = (0..n).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.random_state.unwrap_or(0));
            order.shuffle(&mut rng);
        }

        let base = n / self.n_folds;
        let extra = n % self.n_folds;
        let mut folds = Vec::with_capacity(self.n_folds);
        let mut start = 0;
        for k in 0..self.n_folds {
            let size = base + usize::from(k < extra);
            let validation = order[start..start + size].to_vec();
            let train = order[..start]
                .iter()
                .chain(&order[start + size..])
                .copied()
                .collect();
            folds.push((train, validation));
            start += size;
        }
        Ok(folds)
    }

    /// Mean validation accuracy of `algorithm` across the folds.
    pub fn evaluate(
        &self,
        algorithm: &Algorithm,
        data: &LabeledData,
        n_classes: usize,
    ) -> Result<CrossValidationResult, MlError> {
        let mut scores = Vec::with_capacity(self.n_folds);
        for (train_idx, val_idx) in self.folds(data.len())? {
            let train = data.subset(&train_idx);
            let validation = data.subset(&val_idx);
            let model = algorithm.fit(&train, n_classes)?;
            scores.push(accuracy(&validation.labels, &model.predict(&validation.features)));
        }
        Ok(CrossValidationResult::from_scores(scores, "accuracy"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folds_partition_all_rows() {
        let cv = CrossValidation::default();
        let folds = cv.folds(10).unwrap();
        assert_eq!(folds.len(), 3);
        assert_eq!(
            folds.iter().map(|(_, v)| v.len()).collect::<Vec<_>>(),
            vec![4, 3, 3]
        );
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, v)| v.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        for (train, val) in &folds {
            assert_eq!(train.len() + val.len(), 10);
            assert!(val.iter().all(|i| !train.contains(i)));
        }
    }

    #[test]
    fn test_folds_are_seeded() {
        let cv = CrossValidation::default();
        assert_eq!(cv.folds(50).unwrap(), cv.folds(50).unwrap());
    }

    #[test]
    fn test_fold_count_validation() {
        let cv = CrossValidation {
            n_folds: 1,
            ..CrossValidation::default()
        };
        assert!(cv.folds(10).is_err());
        assert!(CrossValidation::default().folds(2).is_err());
    }

    #[test]
    fn test_evaluate_scores_separable_data() {
        let features: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64]).collect();
        let labels = (0..30).map(|i| usize::from(i >= 15)).collect();
        let data = LabeledData::new(features, labels).unwrap();
        let result = CrossValidation::default()
            .evaluate(&Algorithm::KNearestNeighbors { n_neighbors: 1 }, &data, 2)
            .unwrap();
        assert_eq!(result.fold_scores.len(), 3);
        assert!(result.mean_score > 0.9);
        assert_eq!(result.metric_name, "accuracy");
    }

    #[test]
    fn test_from_scores() {
        let r = CrossValidationResult::from_scores(vec![0.5, 1.0], "accuracy");
        assert_eq!(r.mean_score, 0.75);
        assert_eq!(r.std_score, 0.25);
    }
}
