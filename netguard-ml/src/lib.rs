//! # netguard-ml: network traffic classification pipeline
//!
//! A batch pipeline that trains a classifier for network traffic records
//! ("normal" vs "attack"):
//!
//! 1. **Ingestion** fetches a record-store collection (with connect retry), snapshots it
//!    and splits it into train/test.
//! 2. **Validation** checks the column count against a declared schema and runs a
//!    two-sample Kolmogorov-Smirnov drift test per column.
//! 3. **Transformation** fits a preprocessor on the training split.
//! 4. **Model selection** grid-searches a catalogue of classifiers and bundles the winner
//!    with its preprocessor.
//!
//! Stages hand over immutable artifacts that point at files in a run-scoped directory.

// Foundation
pub mod artifact;
pub mod config;
pub mod error;
pub mod persistence;

// Data
pub mod data;
pub mod features;
pub mod store;

// Models
pub mod algorithms;
pub mod training;

// Stages
pub mod pipeline;

// Re-exports
pub use artifact::{
    DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
    ModelTrainerArtifact,
};
pub use config::{NetguardConfig, load_config};
pub use data::{CsvSource, DataBatch, DriftDetector, SchemaDefinition};
pub use error::{ErrorKind, MlError, PipelineError, Stage, StoreError};
pub use pipeline::TrainingPipeline;
pub use store::{RecordStore, StoreConnection};
pub use training::NetworkModel;
