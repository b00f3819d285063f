//! Per-run stage configuration.
//!
//! A [`TrainingPipelineConfig`] owns one run-scoped directory; every stage config is
//! derived from it and fixes the paths that stage writes.

use crate::config::NetguardConfig;
use crate::error::MlError;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Timestamp layout of run directory names.
pub const RUN_DIR_FORMAT: &str = "%m_%d_%Y_%H_%M_%S";

pub const DATA_INGESTION_DIR: &str = "data_ingestion";
pub const FEATURE_STORE_DIR: &str = "feature_store";
pub const INGESTED_DIR: &str = "ingested";
pub const DATA_VALIDATION_DIR: &str = "data_validation";
pub const VALID_DIR: &str = "valid";
pub const DRIFT_REPORT_FILE: &str = "drift_report.yaml";
pub const DATA_TRANSFORMATION_DIR: &str = "data_transformation";
pub const TRANSFORMED_DIR: &str = "transformed";
pub const TRANSFORMED_OBJECT_DIR: &str = "transformed_object";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const MODEL_TRAINER_DIR: &str = "model_trainer";
pub const TRAINED_MODEL_DIR: &str = "trained_model";
pub const MODEL_FILE: &str = "model.json";
pub const MODEL_REPORT_FILE: &str = "report.json";
pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";

/// Run-scoped root shared by all stages of one pipeline execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingPipelineConfig {
    pub run_dir: PathBuf,
    pub timestamp: String,
    pub final_model_dir: PathBuf,
}

impl TrainingPipelineConfig {
    /// Reserve a fresh run directory under `pipeline.artifact_dir`, named after `now`.
    /// An existing directory of the same name gets a `_1`, `_2`, ... suffix.
    pub fn create(config: &NetguardConfig, now: DateTime<Local>) -> Result<Self, MlError> {
        let timestamp = now.format(RUN_DIR_FORMAT).to_string();
        let root = &config.pipeline.artifact_dir;
        std::fs::create_dir_all(root)?;

        let mut run_dir = root.join(&timestamp);
        let mut suffix = 0;
        // create_dir fails on an existing path, which makes the reservation race-free
        loop {
            match std::fs::create_dir(&run_dir) {
                Ok(()) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    run_dir = root.join(format!("{timestamp}_{suffix}"));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self {
            run_dir,
            timestamp,
            final_model_dir: config.pipeline.final_model_dir.clone(),
        })
    }

    /// Use an existing directory as the run root.
    pub fn at(run_dir: &Path, final_model_dir: &Path) -> Self {
        Self {
            run_dir: run_dir.to_path_buf(),
            timestamp: run_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            final_model_dir: final_model_dir.to_path_buf(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub database: String,
    pub collection: String,
    pub feature_store_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub test_split_ratio: f64,
    pub split_seed: u64,
    pub synthetic_fixture: bool,
    pub synthetic_rows: usize,
}

impl DataIngestionConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, config: &NetguardConfig) -> Self {
        let dir = pipeline.run_dir.join(DATA_INGESTION_DIR);
        Self {
            database: config.store.database.clone(),
            collection: config.store.collection.clone(),
            feature_store_path: dir
                .join(FEATURE_STORE_DIR)
                .join(&config.ingestion.feature_store_file_name),
            train_path: dir.join(INGESTED_DIR).join(TRAIN_FILE),
            test_path: dir.join(INGESTED_DIR).join(TEST_FILE),
            test_split_ratio: config.ingestion.test_split_ratio,
            split_seed: config.ingestion.split_seed,
            synthetic_fixture: config.ingestion.synthetic_fixture,
            synthetic_rows: config.ingestion.synthetic_rows,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub schema_path: PathBuf,
    pub drift_threshold: f64,
    pub valid_train_path: PathBuf,
    pub valid_test_path: PathBuf,
    pub drift_report_path: PathBuf,
}

impl DataValidationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, config: &NetguardConfig) -> Self {
        let dir = pipeline.run_dir.join(DATA_VALIDATION_DIR);
        Self {
            schema_path: config.validation.schema_path.clone(),
            drift_threshold: config.validation.drift_threshold,
            valid_train_path: dir.join(VALID_DIR).join(TRAIN_FILE),
            valid_test_path: dir.join(VALID_DIR).join(TEST_FILE),
            drift_report_path: dir.join(DRIFT_REPORT_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
    pub transformed_object_path: PathBuf,
}

impl DataTransformationConfig {
    pub fn new(pipeline: &TrainingPipelineConfig) -> Self {
        let dir = pipeline.run_dir.join(DATA_TRANSFORMATION_DIR);
        Self {
            transformed_train_path: dir.join(TRANSFORMED_DIR).join(TRAIN_FILE),
            transformed_test_path: dir.join(TRANSFORMED_DIR).join(TEST_FILE),
            transformed_object_path: dir.join(TRANSFORMED_OBJECT_DIR).join(PREPROCESSOR_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub model_path: PathBuf,
    pub report_path: PathBuf,
    pub cv_folds: usize,
    pub seed: u64,
}

impl ModelTrainerConfig {
    pub fn new(pipeline: &TrainingPipelineConfig, config: &NetguardConfig) -> Self {
        let dir = pipeline.run_dir.join(MODEL_TRAINER_DIR);
        Self {
            model_path: dir.join(TRAINED_MODEL_DIR).join(MODEL_FILE),
            report_path: dir.join(MODEL_REPORT_FILE),
            cv_folds: config.training.cv_folds,
            seed: config.training.seed,
        }
    }
}
