//! Pipeline stages and the orchestrator that chains them.
//!
//! Stages only talk through artifacts and the files those point at. Each stage maps
//! any failure into a [`PipelineError`](crate::error::PipelineError) tagged with its
//! own [`Stage`](crate::error::Stage).

pub mod config;
pub mod ingestion;
pub mod predict;
pub mod push;
pub mod trainer;
pub mod training_pipeline;
pub mod transformation;
pub mod validation;

pub use config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelTrainerConfig,
    TrainingPipelineConfig,
};
pub use ingestion::DataIngestion;
pub use predict::{PREDICTION_COLUMN, predict_file};
pub use push::{PushOutcome, push_records};
pub use trainer::ModelTrainer;
pub use training_pipeline::TrainingPipeline;
pub use transformation::DataTransformation;
pub use validation::DataValidation;
