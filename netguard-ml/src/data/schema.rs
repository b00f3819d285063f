//! Declarative dataset schema and the structural check run against it.

use crate::data::source::DataBatch;
use crate::error::MlError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Column data type. Accepts the pandas dtype names older schema files use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    #[serde(alias = "int", alias = "int32", alias = "int64")]
    Integer,
    #[serde(alias = "float32", alias = "float64", alias = "double")]
    Float,
    #[serde(alias = "object", alias = "str", alias = "category")]
    String,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "datetime64")]
    DateTime,
    Unknown,
}

/// Schema declaration, loaded once per validation run.
///
/// ```yaml
/// columns:
///   src_ip: object
///   bytes: int64
/// target_column: label
/// positive_label: attack
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub columns: IndexMap<String, ColumnType>,
    /// Column holding the class label.
    #[serde(default = "default_target_column")]
    pub target_column: String,
    /// Class treated as "positive" by every binary metric computation.
    #[serde(default = "default_positive_label")]
    pub positive_label: String,
}

fn default_target_column() -> String {
    "label".to_string()
}

fn default_positive_label() -> String {
    "attack".to_string()
}

impl SchemaDefinition {
    pub fn new(columns: IndexMap<String, ColumnType>) -> Self {
        Self {
            columns,
            target_column: default_target_column(),
            positive_label: default_positive_label(),
        }
    }

    /// Load from a YAML file. A missing or unparsable schema is a configuration error.
    pub fn load(path: &Path) -> Result<Self, MlError> {
        if !path.exists() {
            return Err(MlError::config(format!(
                "schema file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let schema: Self = serde_yaml::from_str(&content)
            .map_err(|e| MlError::config(format!("invalid schema {}: {e}", path.display())))?;
        if schema.columns.is_empty() {
            return Err(MlError::config(format!(
                "schema {} declares no columns",
                path.display()
            )));
        }
        Ok(schema)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Feature columns: every declared column except the target.
    pub fn feature_columns(&self) -> Vec<&str> {
        self.columns
            .keys()
            .map(String::as_str)
            .filter(|c| *c != self.target_column)
            .collect()
    }
}

/// Name-level differences between a table and a schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDiff {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl ColumnDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// True iff the table has exactly as many columns as the schema declares.
///
/// Only the count is enforced. Names and types are compared by [`diff_columns`] and
/// reported, but a renamed column with the right count still passes.
pub fn validate_column_count(batch: &DataBatch, schema: &SchemaDefinition) -> bool {
    let required = schema.columns.len();
    let actual = batch.column_count();
    info!(required, actual, "Comparing column count against schema");

    let diff = diff_columns(batch, schema);
    if !diff.is_clean() {
        warn!(
            missing = ?diff.missing,
            unexpected = ?diff.unexpected,
            "Column names differ from schema (not enforced)"
        );
    }
    actual == required
}

pub fn diff_columns(batch: &DataBatch, schema: &SchemaDefinition) -> ColumnDiff {
    let missing = schema
        .columns
        .keys()
        .filter(|name| batch.column_index(name).is_none())
        .cloned()
        .collect();
    let unexpected = batch
        .columns
        .iter()
        .filter(|c| !schema.columns.contains_key(*c))
        .cloned()
        .collect();
    ColumnDiff {
        missing,
        unexpected,
    }
}
