//! Data transformation: fit the preprocessor on train, encode both splits.

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact};
use crate::data::source::{CsvSource, DataBatch};
use crate::error::{MlError, PipelineError, Stage};
use crate::features::Preprocessor;
use crate::persistence::atomic_write_json;
use crate::pipeline::config::DataTransformationConfig;
use serde_json::Value;
use tracing::info;

pub struct DataTransformation {
    config: DataTransformationConfig,
}

/// Encoded features followed by the class index, one row per input row.
fn encoded_table(
    preprocessor: &Preprocessor,
    batch: &DataBatch,
) -> Result<DataBatch, MlError> {
    let features = preprocessor.transform_features(batch)?;
    let labels = preprocessor.encode_target(batch)?;

    let mut columns: Vec<String> = preprocessor
        .feature_names()
        .into_iter()
        .map(String::from)
        .collect();
    columns.push(preprocessor.target_column.clone());

    let rows = features
        .into_iter()
        .zip(labels)
        .map(|(row, label)| {
            let mut out: Vec<Value> = row.into_iter().map(Value::from).collect();
            out.push(Value::from(label));
            out
        })
        .collect();
    Ok(DataBatch::new(columns, rows))
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    pub fn run(
        &self,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact, PipelineError> {
        self.transform(validation)
            .map_err(|e| e.in_stage(Stage::Transformation))
    }

    fn transform(
        &self,
        validation: &DataValidationArtifact,
    ) -> Result<DataTransformationArtifact, MlError> {
        let train = CsvSource::read(&validation.valid_train_path)?;
        let test = CsvSource::read(&validation.valid_test_path)?;

        let preprocessor = Preprocessor::fit(&train, &validation.target_column)?;
        info!(
            features = preprocessor.features.len(),
            classes = ?preprocessor.classes,
            "Fitted preprocessor"
        );

        let encoded_train = encoded_table(&preprocessor, &train)?;
        let encoded_test = encoded_table(&preprocessor, &test)?;
        CsvSource::write(&self.config.transformed_train_path, &encoded_train)?;
        CsvSource::write(&self.config.transformed_test_path, &encoded_test)?;
        atomic_write_json(&self.config.transformed_object_path, &preprocessor)?;

        info!(
            path = %self.config.transformed_object_path.display(),
            "Data transformation completed"
        );
        Ok(DataTransformationArtifact {
            transformed_object_path: self.config.transformed_object_path.clone(),
            transformed_train_path: self.config.transformed_train_path.clone(),
            transformed_test_path: self.config.transformed_test_path.clone(),
            positive_label: validation.positive_label.clone(),
        })
    }
}
