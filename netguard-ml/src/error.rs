//! Error types for the netguard-ml crate.
//!
//! Components return [`MlError`]. Every pipeline stage converts whatever it hits into a
//! single [`PipelineError`] tagged with the stage it came from, so the orchestrator can
//! short-circuit without looking inside.

use std::fmt;
use thiserror::Error;

/// Errors raised at the record store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Retryable fault (connect timeout, name resolution, busy database).
    #[error("Transient store fault: {message}")]
    Transient { message: String },

    /// Any other connection fault. Not retried.
    #[error("Store connection failed: {message}")]
    Connection { message: String },

    #[error("Store misconfigured: {message}")]
    Configuration { message: String },

    #[error("Store query failed: {message}")]
    Query { message: String },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient {
            message: msg.into(),
        }
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection {
            message: msg.into(),
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query {
            message: msg.into(),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::Interrupted | ErrorKind::WouldBlock => {
                Self::transient(e.to_string())
            }
            ErrorKind::NotFound | ErrorKind::PermissionDenied => Self::connection(e.to_string()),
            _ => Self::query(e.to_string()),
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                Self::transient(e.to_string())
            }
            Some(
                rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::NotADatabase
                | rusqlite::ErrorCode::PermissionDenied,
            ) => Self::connection(e.to_string()),
            _ => Self::query(e.to_string()),
        }
    }
}

/// Component-level error type.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl MlError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify this error for stage-level reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDataset(_) => ErrorKind::EmptyDataset,
            Self::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            Self::Training(_) => ErrorKind::Training,
            Self::Inference(_) => ErrorKind::Prediction,
            Self::Config(_) | Self::InvalidInput(_) => ErrorKind::Configuration,
            Self::NotFound(_) => ErrorKind::FileNotFound,
            Self::Store(StoreError::Configuration { .. }) => ErrorKind::Configuration,
            Self::Store(_) => ErrorKind::Connectivity,
            Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            Self::Io(_) => ErrorKind::Persistence,
            Self::Dataset(_) | Self::Serde(_) | Self::Yaml(_) => ErrorKind::Persistence,
        }
    }

    /// Wrap into a [`PipelineError`] originating from `stage`.
    pub fn in_stage(self, stage: Stage) -> PipelineError {
        PipelineError {
            kind: self.kind(),
            stage,
            message: self.to_string(),
            source: Some(Box::new(self)),
        }
    }
}

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    ModelSelection,
    Pipeline,
    Prediction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ingestion => "data ingestion",
            Self::Validation => "data validation",
            Self::Transformation => "data transformation",
            Self::ModelSelection => "model selection",
            Self::Pipeline => "pipeline",
            Self::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

/// Failure category carried by a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store unreachable after retries, or a non-retryable connection fault.
    Connectivity,
    /// Missing or invalid configuration, schema, or store location.
    Configuration,
    EmptyDataset,
    /// Column count differs from the declared schema.
    SchemaValidation,
    /// Base and current datasets do not share a column set.
    SchemaMismatch,
    /// Drift detected while `halt_on_drift` is enabled.
    DataDrift,
    FileNotFound,
    Persistence,
    Training,
    Prediction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connectivity => "connectivity",
            Self::Configuration => "configuration",
            Self::EmptyDataset => "empty dataset",
            Self::SchemaValidation => "schema validation",
            Self::SchemaMismatch => "schema mismatch",
            Self::DataDrift => "data drift",
            Self::FileNotFound => "file not found",
            Self::Persistence => "persistence",
            Self::Training => "training",
            Self::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

/// Uniform error returned by every stage and by the orchestrator.
#[derive(Debug, Error)]
#[error("{stage} failed ({kind}): {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub stage: Stage,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage,
            message: message.into(),
            source: None,
        }
    }
}
