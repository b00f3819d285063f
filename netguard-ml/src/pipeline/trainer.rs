//! Model selection stage: search the catalogue, bundle the winner with its preprocessor.

use crate::algorithms::{CrossValidation, LabeledData};
use crate::artifact::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::data::source::{CsvSource, DataBatch};
use crate::error::{MlError, PipelineError, Stage};
use crate::features::Preprocessor;
use crate::persistence::{atomic_write_json, load_json};
use crate::pipeline::config::ModelTrainerConfig;
use crate::training::{
    ModelCandidate, NetworkModel, SelectionInput, default_catalogue, select_model,
};
use tracing::{info, warn};

pub struct ModelTrainer {
    config: ModelTrainerConfig,
    catalogue: Vec<ModelCandidate>,
}

/// Split a transformed table back into feature rows and class indices.
/// The last column holds the class index.
fn labeled_data(batch: &DataBatch) -> Result<LabeledData, MlError> {
    if batch.column_count() < 2 {
        return Err(MlError::dataset(
            "transformed table needs at least one feature and the label",
        ));
    }
    let mut features = Vec::with_capacity(batch.row_count());
    let mut labels = Vec::with_capacity(batch.row_count());
    for (i, row) in batch.rows.iter().enumerate() {
        let (label, values) = row
            .split_last()
            .ok_or_else(|| MlError::dataset(format!("row {i} is empty")))?;
        let label = label
            .as_u64()
            .ok_or_else(|| MlError::dataset(format!("row {i}: label {label} is not a class index")))?;
        let values = values
            .iter()
            .map(|v| {
                v.as_f64()
                    .ok_or_else(|| MlError::dataset(format!("row {i}: feature {v} is not numeric")))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        features.push(values);
        labels.push(label as usize);
    }
    LabeledData::new(features, labels)
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self {
            config,
            catalogue: default_catalogue(),
        }
    }

    /// Replace the built-in catalogue.
    pub fn with_catalogue(mut self, catalogue: Vec<ModelCandidate>) -> Self {
        self.catalogue = catalogue;
        self
    }

    pub async fn run(
        &self,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact, PipelineError> {
        self.train(transformation)
            .await
            .map_err(|e| e.in_stage(Stage::ModelSelection))
    }

    async fn train(
        &self,
        transformation: &DataTransformationArtifact,
    ) -> Result<ModelTrainerArtifact, MlError> {
        let preprocessor: Preprocessor = load_json(&transformation.transformed_object_path)?;
        let train = labeled_data(&CsvSource::read(&transformation.transformed_train_path)?)?;
        let test = labeled_data(&CsvSource::read(&transformation.transformed_test_path)?)?;

        let positive_class = preprocessor.class_index(&transformation.positive_label);
        if positive_class.is_none() {
            warn!(
                positive_label = %transformation.positive_label,
                classes = ?preprocessor.classes,
                "Positive label is not among the classes; positive-class metrics will be 0"
            );
        }

        let n_classes = preprocessor.classes.len();
        let catalogue = self.catalogue.clone();
        let cv = CrossValidation {
            n_folds: self.config.cv_folds,
            shuffle: true,
            random_state: Some(self.config.seed),
        };
        info!(
            candidates = catalogue.len(),
            train_rows = train.len(),
            test_rows = test.len(),
            cv_folds = cv.n_folds,
            "Starting model selection"
        );

        // CPU-bound search runs off the async workers
        let outcome = tokio::task::spawn_blocking(move || {
            let input = SelectionInput {
                train: &train,
                test: &test,
                n_classes,
                positive_class,
                cv: &cv,
            };
            select_model(&catalogue, &input)
        })
        .await
        .map_err(|e| MlError::training(format!("model selection task failed: {e}")))??;

        let bundle = NetworkModel::new(&outcome.best.model_name, preprocessor, outcome.model);
        bundle.save(&self.config.model_path)?;
        atomic_write_json(&self.config.report_path, &outcome.reports)?;

        info!(
            model = %outcome.best.model_name,
            path = %self.config.model_path.display(),
            "Model trainer completed"
        );
        Ok(ModelTrainerArtifact {
            model_path: self.config.model_path.clone(),
            model_name: outcome.best.model_name,
            train_metrics: outcome.best.train_metrics,
            test_metrics: outcome.best.test_metrics,
        })
    }
}
