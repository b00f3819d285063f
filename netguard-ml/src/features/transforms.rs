//! Fitted preprocessing: target encoding, imputation, ordinal encoding and scaling.

use crate::data::source::DataBatch;
use crate::error::MlError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

/// How one raw column becomes one number before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encoding {
    /// Numbers and booleans. Missing or non-numeric cells take `fill`, the training mean.
    Numeric { fill: f64 },
    /// Sorted category codes. Unknown or missing cells encode as -1.
    Categorical { categories: Vec<String> },
}

/// A single fitted feature column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub name: String,
    pub encoding: Encoding,
    pub mean: f64,
    /// 1.0 when the column had no spread in training.
    pub scale: f64,
}

impl FeatureEncoder {
    fn raw(&self, value: &Value) -> f64 {
        match &self.encoding {
            Encoding::Numeric { fill } => numeric_value(value).unwrap_or(*fill),
            Encoding::Categorical { categories } => cell_text(value)
                .and_then(|text| categories.binary_search(&text).ok())
                .map_or(-1.0, |code| code as f64),
        }
    }

    pub fn encode(&self, value: &Value) -> f64 {
        (self.raw(value) - self.mean) / self.scale
    }
}

/// Preprocessor fitted on the training split and reused unchanged for test data and
/// inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub target_column: String,
    /// Sorted class names. A label's index here is its class index.
    pub classes: Vec<String>,
    pub features: Vec<FeatureEncoder>,
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn column_values<'a>(batch: &'a DataBatch, name: &str) -> Result<Vec<&'a Value>, MlError> {
    batch
        .column(name)
        .ok_or_else(|| MlError::invalid_input(format!("column '{name}' is missing")))
}

impl Preprocessor {
    /// Fit on `batch`. Every column other than `target_column` becomes a feature, in
    /// batch order.
    pub fn fit(batch: &DataBatch, target_column: &str) -> Result<Self, MlError> {
        if batch.is_empty() {
            return Err(MlError::EmptyDataset(
                "cannot fit a preprocessor on zero rows".into(),
            ));
        }

        let classes: Vec<String> = column_values(batch, target_column)?
            .into_iter()
            .map(|v| {
                cell_text(v).ok_or_else(|| {
                    MlError::dataset(format!("target column '{target_column}' has missing values"))
                })
            })
            .collect::<Result<BTreeSet<_>, _>>()?
            .into_iter()
            .collect();

        let mut features = Vec::new();
        for name in batch.columns.iter().filter(|c| *c != target_column) {
            let values = column_values(batch, name)?;
            let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();

            let encoding = if present.iter().all(|v| numeric_value(v).is_some()) {
                let sum: f64 = present.iter().filter_map(|v| numeric_value(v)).sum();
                let fill = if present.is_empty() { 0.0 } else { sum / present.len() as f64 };
                Encoding::Numeric { fill }
            } else {
                let categories: BTreeSet<String> =
                    present.iter().filter_map(|v| cell_text(v)).collect();
                Encoding::Categorical {
                    categories: categories.into_iter().collect(),
                }
            };

            let mut encoder = FeatureEncoder {
                name: name.clone(),
                encoding,
                mean: 0.0,
                scale: 1.0,
            };
            let raw: Vec<f64> = values.iter().map(|v| encoder.raw(v)).collect();
            let n = raw.len() as f64;
            let mean = raw.iter().sum::<f64>() / n;
            let std = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
            encoder.mean = mean;
            encoder.scale = if std > f64::EPSILON { std } else { 1.0 };
            debug!(column = %name, encoding = ?encoder.encoding, "Fitted feature encoder");
            features.push(encoder);
        }

        Ok(Self {
            target_column: target_column.to_string(),
            classes,
            features,
        })
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    /// Encode the feature columns of `batch`. Extra columns are ignored; missing
    /// feature columns are an error.
    pub fn transform_features(&self, batch: &DataBatch) -> Result<Vec<Vec<f64>>, MlError> {
        let indices = self
            .features
            .iter()
            .map(|f| {
                batch.column_index(&f.name).ok_or_else(|| {
                    MlError::invalid_input(format!("input is missing feature column '{}'", f.name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(batch
            .rows
            .iter()
            .map(|row| {
                self.features
                    .iter()
                    .zip(&indices)
                    .map(|(f, &i)| f.encode(row.get(i).unwrap_or(&Value::Null)))
                    .collect()
            })
            .collect())
    }

    /// Class index of every row's target value. Labels unseen during fitting are an error.
    pub fn encode_target(&self, batch: &DataBatch) -> Result<Vec<usize>, MlError> {
        column_values(batch, &self.target_column)?
            .into_iter()
            .map(|v| {
                cell_text(v)
                    .and_then(|label| self.class_index(&label))
                    .ok_or_else(|| {
                        MlError::dataset(format!("unknown target label {v}"))
                    })
            })
            .collect()
    }

    pub fn class_index(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn decode_label(&self, index: usize) -> Result<&str, MlError> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| MlError::inference(format!("class index {index} out of range")))
    }
}
