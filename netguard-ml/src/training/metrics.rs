//! Classification metrics.

use serde::{Deserialize, Serialize};

/// Scores of one model on one split.
///
/// `precision`, `recall` and `f1_score` are support-weighted over all classes. The
/// `positive_*` fields score only the nominated positive class.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub positive_precision: f64,
    pub positive_recall: f64,
    pub positive_f1: f64,
    /// Rows are true classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ClassScore {
    precision: f64,
    recall: f64,
    f1: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

fn class_score(matrix: &[Vec<usize>], class: usize) -> ClassScore {
    let tp = matrix[class][class];
    let predicted: usize = matrix.iter().map(|row| row[class]).sum();
    let actual: usize = matrix[class].iter().sum();
    let precision = ratio(tp, predicted);
    let recall = ratio(tp, actual);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    ClassScore {
        precision,
        recall,
        f1,
    }
}

impl ClassificationMetrics {
    /// Score `y_pred` against `y_true`. Labels are class indices below `n_classes`.
    /// Undefined ratios (no predictions or no support) count as zero.
    pub fn compute(
        y_true: &[usize],
        y_pred: &[usize],
        n_classes: usize,
        positive_class: Option<usize>,
    ) -> Self {
        let mut matrix = vec![vec![0usize; n_classes]; n_classes];
        for (&t, &p) in y_true.iter().zip(y_pred) {
            if t < n_classes && p < n_classes {
                matrix[t][p] += 1;
            }
        }

        let total: usize = matrix.iter().flatten().sum();
        let correct: usize = (0..n_classes).map(|c| matrix[c][c]).sum();

        let mut weighted = ClassScore::default();
        for class in 0..n_classes {
            let support: usize = matrix[class].iter().sum();
            if support == 0 {
                continue;
            }
            let score = class_score(&matrix, class);
            let w = ratio(support, total);
            weighted.precision += w * score.precision;
            weighted.recall += w * score.recall;
            weighted.f1 += w * score.f1;
        }

        let positive = positive_class
            .filter(|&c| c < n_classes)
            .map(|c| class_score(&matrix, c))
            .unwrap_or_default();

        Self {
            accuracy: ratio(correct, total),
            precision: weighted.precision,
            recall: weighted.recall,
            f1_score: weighted.f1,
            positive_precision: positive.precision,
            positive_recall: positive.recall,
            positive_f1: positive.f1,
            confusion_matrix: matrix,
        }
    }
}

/// Fraction of positions where the two label slices agree.
pub fn accuracy(y_true: &[usize], y_pred: &[usize]) -> f64 {
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    ratio(correct, y_true.len())
}
