//! Algorithm definitions and fitted models.

use super::knn::KnnModel;
use super::linear::LogisticModel;
use super::naive_bayes::GaussianNbModel;
use super::tree::{DecisionTreeModel, SplitCriterion};
use super::LabeledData;
use crate::error::MlError;
use crate::training::sweep::ParamSet;
use serde::{Deserialize, Serialize};

/// A concrete, fully parameterised algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Algorithm {
    KNearestNeighbors {
        n_neighbors: usize,
    },
    DecisionTree {
        criterion: SplitCriterion,
        max_depth: usize,
    },
    LogisticRegression {
        learning_rate: f64,
        epochs: usize,
    },
    GaussianNaiveBayes,
}

fn param_usize(params: &ParamSet, name: &str, default: usize) -> Result<usize, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| MlError::invalid_input(format!("parameter '{name}' must be a non-negative integer, got {v}"))),
    }
}

fn param_f64(params: &ParamSet, name: &str, default: f64) -> Result<f64, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| MlError::invalid_input(format!("parameter '{name}' must be a number, got {v}"))),
    }
}

fn param_str<'a>(params: &'a ParamSet, name: &str, default: &'a str) -> Result<&'a str, MlError> {
    match params.get(name) {
        None => Ok(default),
        Some(v) => v
            .as_str()
            .ok_or_else(|| MlError::invalid_input(format!("parameter '{name}' must be a string, got {v}"))),
    }
}

impl Algorithm {
    /// Build the algorithm `name` with `params`. Unset parameters take their defaults.
    pub fn from_params(name: &str, params: &ParamSet) -> Result<Self, MlError> {
        match name {
            "k_nearest_neighbors" => Ok(Self::KNearestNeighbors {
                n_neighbors: param_usize(params, "n_neighbors", 5)?,
            }),
            "decision_tree" => Ok(Self::DecisionTree {
                criterion: SplitCriterion::parse(param_str(params, "criterion", "gini")?)?,
                max_depth: param_usize(params, "max_depth", 8)?,
            }),
            "logistic_regression" => Ok(Self::LogisticRegression {
                learning_rate: param_f64(params, "learning_rate", 0.1)?,
                epochs: param_usize(params, "epochs", 200)?,
            }),
            "gaussian_naive_bayes" => Ok(Self::GaussianNaiveBayes),
            other => Err(MlError::invalid_input(format!("unknown algorithm '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::KNearestNeighbors { .. } => "k_nearest_neighbors",
            Self::DecisionTree { .. } => "decision_tree",
            Self::LogisticRegression { .. } => "logistic_regression",
            Self::GaussianNaiveBayes => "gaussian_naive_bayes",
        }
    }

    pub fn fit(&self, data: &LabeledData, n_classes: usize) -> Result<TrainedModel, MlError> {
        Ok(match *self {
            Self::KNearestNeighbors { n_neighbors } => {
                TrainedModel::KNearestNeighbors(KnnModel::fit(data, n_classes, n_neighbors)?)
            }
            Self::DecisionTree {
                criterion,
                max_depth,
            } => TrainedModel::DecisionTree(DecisionTreeModel::fit(
                data, n_classes, criterion, max_depth,
            )?),
            Self::LogisticRegression {
                learning_rate,
                epochs,
            } => TrainedModel::LogisticRegression(LogisticModel::fit(
                data,
                n_classes,
                learning_rate,
                epochs,
            )?),
            Self::GaussianNaiveBayes => {
                TrainedModel::GaussianNaiveBayes(GaussianNbModel::fit(data, n_classes)?)
            }
        })
    }
}

/// A fitted model, serialisable into the inference bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainedModel {
    KNearestNeighbors(KnnModel),
    DecisionTree(DecisionTreeModel),
    LogisticRegression(LogisticModel),
    GaussianNaiveBayes(GaussianNbModel),
}

impl TrainedModel {
    pub fn predict_one(&self, row: &[f64]) -> usize {
        match self {
            Self::KNearestNeighbors(m) => m.predict_one(row),
            Self::DecisionTree(m) => m.predict_one(row),
            Self::LogisticRegression(m) => m.predict_one(row),
            Self::GaussianNaiveBayes(m) => m.predict_one(row),
        }
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }
}
