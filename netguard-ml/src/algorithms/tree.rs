//! CART decision tree with axis-aligned threshold splits.

use super::{LabeledData, check_training_input, class_counts};
use crate::error::MlError;
use serde::{Deserialize, Serialize};

/// Impurity measure used to score splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

impl SplitCriterion {
    pub fn parse(name: &str) -> Result<Self, MlError> {
        match name {
            "gini" => Ok(Self::Gini),
            "entropy" => Ok(Self::Entropy),
            other => Err(MlError::invalid_input(format!(
                "unknown split criterion '{other}'"
            ))),
        }
    }

    fn impurity(self, counts: &[usize], total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            Self::Gini => 1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>(),
            Self::Entropy => counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    -p * p.log2()
                })
                .sum(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TreeNode {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    pub criterion: SplitCriterion,
    pub max_depth: usize,
    pub root: TreeNode,
}

struct Builder<'a> {
    data: &'a LabeledData,
    n_classes: usize,
    criterion: SplitCriterion,
    max_depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

const MIN_GAIN: f64 = 1e-12;

impl Builder<'_> {
    fn build(&self, indices: &[usize], depth: usize) -> TreeNode {
        let counts = class_counts(indices.iter().map(|&i| self.data.labels[i]), self.n_classes);
        let majority = majority_class(&counts);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if depth >= self.max_depth || indices.len() < 2 || pure {
            return TreeNode::Leaf { class: majority };
        }

        let Some(split) = self.best_split(indices, &counts) else {
            return TreeNode::Leaf { class: majority };
        };
        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.data.features[i][split.feature] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(&left, depth + 1)),
            right: Box::new(self.build(&right, depth + 1)),
        }
    }

    fn best_split(&self, indices: &[usize], counts: &[usize]) -> Option<BestSplit> {
        let n = indices.len();
        let parent = self.criterion.impurity(counts, n);
        let mut best: Option<BestSplit> = None;

        for feature in 0..self.data.n_features() {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| {
                self.data.features[a][feature].total_cmp(&self.data.features[b][feature])
            });

            let mut left = vec![0usize; self.n_classes];
            let mut right = counts.to_vec();
            for pos in 0..n - 1 {
                let label = self.data.labels[sorted[pos]];
                left[label] += 1;
                right[label] -= 1;

                let here = self.data.features[sorted[pos]][feature];
                let next = self.data.features[sorted[pos + 1]][feature];
                if here == next {
                    continue;
                }
                let n_left = pos + 1;
                let n_right = n - n_left;
                let weighted = (n_left as f64 * self.criterion.impurity(&left, n_left)
                    + n_right as f64 * self.criterion.impurity(&right, n_right))
                    / n as f64;
                let gain = parent - weighted;
                if gain > best.as_ref().map_or(MIN_GAIN, |b| b.gain + MIN_GAIN) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn majority_class(counts: &[usize]) -> usize {
    let mut best = 0;
    for (class, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = class;
        }
    }
    best
}

impl DecisionTreeModel {
    pub fn fit(
        data: &LabeledData,
        n_classes: usize,
        criterion: SplitCriterion,
        max_depth: usize,
    ) -> Result<Self, MlError> {
        check_training_input(data, n_classes)?;
        let builder = Builder {
            data,
            n_classes,
            criterion,
            max_depth,
        };
        let indices: Vec<usize> = (0..data.len()).collect();
        Ok(Self {
            criterion,
            max_depth,
            root: builder.build(&indices, 0),
        })
    }

    pub fn predict_one(&self, row: &[f64]) -> usize {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { class } => return *class,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}
