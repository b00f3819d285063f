//! The training pipeline: ingestion, validation, transformation, model selection.

use crate::artifact::ModelTrainerArtifact;
use crate::config::NetguardConfig;
use crate::error::{ErrorKind, MlError, PipelineError, Stage};
use crate::persistence::atomic_write;
use crate::pipeline::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, MODEL_FILE,
    ModelTrainerConfig, TrainingPipelineConfig,
};
use crate::pipeline::ingestion::DataIngestion;
use crate::pipeline::trainer::ModelTrainer;
use crate::pipeline::transformation::DataTransformation;
use crate::pipeline::validation::DataValidation;
use crate::store::{RecordStore, RetryPolicy, open_store};
use crate::training::ModelCandidate;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the four stages in order and stops at the first failure.
///
/// Nothing is retried here. Files written by completed stages stay on disk after a
/// failure; a re-run gets a fresh run directory.
pub struct TrainingPipeline {
    config: NetguardConfig,
    store: Option<Arc<dyn RecordStore>>,
    catalogue: Option<Vec<ModelCandidate>>,
}

impl TrainingPipeline {
    /// Build with the store named by `store.url`. No store is opened in synthetic
    /// fixture mode.
    pub fn from_config(config: NetguardConfig) -> Result<Self, PipelineError> {
        let store = if config.ingestion.synthetic_fixture {
            None
        } else {
            Some(open_store(&config.store).map_err(|e| MlError::from(e).in_stage(Stage::Pipeline))?)
        };
        Ok(Self {
            config,
            store,
            catalogue: None,
        })
    }

    pub fn with_store(config: NetguardConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config,
            store: Some(store),
            catalogue: None,
        }
    }

    pub fn with_catalogue(mut self, catalogue: Vec<ModelCandidate>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    pub async fn run(&self) -> Result<ModelTrainerArtifact, PipelineError> {
        let run = TrainingPipelineConfig::create(&self.config, Local::now())
            .map_err(|e| e.in_stage(Stage::Pipeline))?;
        info!(run_dir = %run.run_dir.display(), "Training pipeline started");

        let ingestion = DataIngestion::new(
            DataIngestionConfig::new(&run, &self.config),
            self.store.clone(),
            RetryPolicy::from_config(&self.config.store),
        )
        .run()
        .await?;

        let validation =
            DataValidation::new(DataValidationConfig::new(&run, &self.config)).run(&ingestion)?;
        if !validation.validation_status {
            if self.config.pipeline.halt_on_drift {
                return Err(PipelineError::new(
                    ErrorKind::DataDrift,
                    Stage::Validation,
                    format!(
                        "drift detected, see {}",
                        validation.drift_report_path.display()
                    ),
                ));
            }
            warn!("Continuing on drifted data (pipeline.halt_on_drift is off)");
        }

        let transformation =
            DataTransformation::new(DataTransformationConfig::new(&run)).run(&validation)?;

        let mut trainer = ModelTrainer::new(ModelTrainerConfig::new(&run, &self.config));
        if let Some(catalogue) = &self.catalogue {
            trainer = trainer.with_catalogue(catalogue.clone());
        }
        let artifact = trainer.run(&transformation).await?;

        let published = self
            .push_final_model(&artifact)
            .map_err(|e| e.in_stage(Stage::Pipeline))?;
        info!(
            model = %artifact.model_name,
            final_model = %published.display(),
            test_accuracy = artifact.test_metrics.accuracy,
            "Training pipeline completed"
        );
        Ok(artifact)
    }

    /// Copy the trained bundle to `<final_model_dir>/model.json`.
    fn push_final_model(&self, artifact: &ModelTrainerArtifact) -> Result<PathBuf, MlError> {
        let target = self.config.pipeline.final_model_dir.join(MODEL_FILE);
        let bytes = std::fs::read(&artifact.model_path)?;
        atomic_write(&target, &bytes)?;
        Ok(target)
    }
}
