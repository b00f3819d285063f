//! Stage artifacts.
//!
//! Each stage returns one of these once its outputs are on disk. Artifacts carry paths,
//! not data: the next stage re-reads the files. They are never modified after
//! construction; consumers take them by shared reference.

use crate::training::metrics::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of data ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    /// Full snapshot of the fetched collection.
    pub feature_store_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    /// SHA-256 of the feature store file, hex encoded.
    pub feature_store_sha256: String,
    pub row_count: usize,
}

/// Output of data validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    /// False when any column drifted. The valid paths are written either way.
    pub validation_status: bool,
    pub valid_train_path: PathBuf,
    pub valid_test_path: PathBuf,
    /// Reserved for a quarantine policy. Never populated today.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_train_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_test_path: Option<PathBuf>,
    pub drift_report_path: PathBuf,
    /// Schema facts read once by validation and carried to the later stages.
    pub target_column: String,
    pub positive_label: String,
}

/// Output of data transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    /// Fitted preprocessor, JSON.
    pub transformed_object_path: PathBuf,
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub positive_label: String,
}

/// Output of model selection. The terminal artifact of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    /// Preprocessor and winning model bundled together.
    pub model_path: PathBuf,
    pub model_name: String,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
}
