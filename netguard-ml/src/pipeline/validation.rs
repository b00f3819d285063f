//! Data validation: schema column count, then drift between train and test.

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::data::drift::DriftDetector;
use crate::data::schema::{SchemaDefinition, validate_column_count};
use crate::data::source::CsvSource;
use crate::error::{ErrorKind, MlError, PipelineError, Stage};
use crate::pipeline::config::DataValidationConfig;
use tracing::{info, warn};

pub struct DataValidation {
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the ingested splits.
    ///
    /// A column-count mismatch aborts before drift detection. Drift does not: the valid
    /// copies are written and the outcome is reported through `validation_status`.
    pub fn run(
        &self,
        ingestion: &DataIngestionArtifact,
    ) -> Result<DataValidationArtifact, PipelineError> {
        let fail = |e: MlError| e.in_stage(Stage::Validation);

        let train = CsvSource::read(&ingestion.train_path).map_err(fail)?;
        let test = CsvSource::read(&ingestion.test_path).map_err(fail)?;
        let schema = SchemaDefinition::load(&self.config.schema_path).map_err(fail)?;

        for (name, batch) in [("train", &train), ("test", &test)] {
            if !validate_column_count(batch, &schema) {
                return Err(PipelineError::new(
                    ErrorKind::SchemaValidation,
                    Stage::Validation,
                    format!(
                        "{name} dataset has {} columns, schema declares {}",
                        batch.column_count(),
                        schema.columns.len()
                    ),
                ));
            }
        }

        let detector = DriftDetector::new(
            self.config.drift_threshold,
            self.config.drift_report_path.clone(),
        );
        let (status, _report) = detector.detect(&train, &test).map_err(fail)?;
        if !status {
            warn!(
                report = %self.config.drift_report_path.display(),
                "Data drift detected between train and test"
            );
        }

        CsvSource::write(&self.config.valid_train_path, &train).map_err(fail)?;
        CsvSource::write(&self.config.valid_test_path, &test).map_err(fail)?;

        let artifact = DataValidationArtifact {
            validation_status: status,
            valid_train_path: self.config.valid_train_path.clone(),
            valid_test_path: self.config.valid_test_path.clone(),
            invalid_train_path: None,
            invalid_test_path: None,
            drift_report_path: self.config.drift_report_path.clone(),
            target_column: schema.target_column,
            positive_label: schema.positive_label,
        };
        info!(validation_status = status, "Data validation completed");
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::DataBatch;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const SCHEMA: &str = "columns:\n  bytes: int64\n  label: object\n";

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            std::fs::write(root.join("schema.yaml"), SCHEMA).unwrap();
            Self { _dir: dir, root }
        }

        fn config(&self) -> DataValidationConfig {
            DataValidationConfig {
                schema_path: self.root.join("schema.yaml"),
                drift_threshold: 0.05,
                valid_train_path: self.root.join("valid/train.csv"),
                valid_test_path: self.root.join("valid/test.csv"),
                drift_report_path: self.root.join("drift_report.yaml"),
            }
        }

        fn ingested(&self, train: &DataBatch, test: &DataBatch) -> DataIngestionArtifact {
            let train_path = self.root.join("ingested/train.csv");
            let test_path = self.root.join("ingested/test.csv");
            CsvSource::write(&train_path, train).unwrap();
            CsvSource::write(&test_path, test).unwrap();
            DataIngestionArtifact {
                feature_store_path: self.root.join("fs.csv"),
                train_path,
                test_path,
                feature_store_sha256: String::new(),
                row_count: train.row_count() + test.row_count(),
            }
        }
    }

    fn table(bytes: impl Iterator<Item = i64>) -> DataBatch {
        DataBatch::new(
            vec!["bytes".into(), "label".into()],
            bytes.map(|b| vec![json!(b), json!("normal")]).collect(),
        )
    }

    #[test]
    fn test_matching_data_passes() {
        let fx = Fixture::new();
        let artifact = DataValidation::new(fx.config())
            .run(&fx.ingested(&table(0..40), &table(0..40)))
            .unwrap();
        assert!(artifact.validation_status);
        assert!(artifact.valid_train_path.exists());
        assert!(artifact.valid_test_path.exists());
        assert!(artifact.drift_report_path.exists());
        assert_eq!(artifact.invalid_train_path, None);
    }

    #[test]
    fn test_drift_is_a_status_not_an_error() {
        let fx = Fixture::new();
        let artifact = DataValidation::new(fx.config())
            .run(&fx.ingested(&table(0..40), &table(1000..1040)))
            .unwrap();
        assert!(!artifact.validation_status);
        assert!(artifact.valid_test_path.exists());
    }

    #[test]
    fn test_column_count_mismatch_aborts_before_drift() {
        let fx = Fixture::new();
        let mut wide = table(0..10);
        wide.push_column("extra", vec![json!(1); 10]).unwrap();
        let err = DataValidation::new(fx.config())
            .run(&fx.ingested(&wide, &wide))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::SchemaValidation);
        assert!(!fx.config().drift_report_path.exists());
    }

    #[test]
    fn test_missing_input_is_file_not_found() {
        let fx = Fixture::new();
        let artifact = DataIngestionArtifact {
            feature_store_path: PathBuf::from("x"),
            train_path: Path::new("/nonexistent/train.csv").to_path_buf(),
            test_path: Path::new("/nonexistent/test.csv").to_path_buf(),
            feature_store_sha256: String::new(),
            row_count: 0,
        };
        let err = DataValidation::new(fx.config()).run(&artifact).unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[test]
    fn test_missing_schema_is_configuration_error() {
        let fx = Fixture::new();
        let mut config = fx.config();
        config.schema_path = fx.root.join("absent.yaml");
        let err = DataValidation::new(config)
            .run(&fx.ingested(&table(0..5), &table(0..5)))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }
}
