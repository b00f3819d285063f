//! Configuration for the Netguard pipeline.
//!
//! Uses `figment` for layered configuration: defaults -> `netguard.toml` -> environment.
//! The result is built once at process start and passed by reference to every component;
//! nothing reads the environment after that.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "netguard.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetguardConfig {
    /// Record store connectivity.
    #[serde(default)]
    pub store: StoreConfig,
    /// Artifact layout and run policy.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Ingestion stage settings.
    #[serde(default)]
    pub ingestion: IngestionSettings,
    /// Validation stage settings.
    #[serde(default)]
    pub validation: ValidationSettings,
    /// Model selection settings.
    #[serde(default)]
    pub training: TrainingSettings,
}

/// Record store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store location: `jsonl://<dir>` or `sqlite://<file>`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Retries after the first failed attempt, for transient faults only.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Backoff unit. Retry `k` waits `base * 2^k + base * U[0,1)`.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            database: default_database(),
            collection: default_collection(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_database() -> String {
    "NETWORK".to_string()
}

fn default_collection() -> String {
    "NetworkData".to_string()
}

fn default_max_retries() -> usize {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_connect_timeout() -> u64 {
    30
}

/// Artifact layout and orchestration policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Root under which each run gets a timestamped directory.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Where the winning model is published once a run completes.
    #[serde(default = "default_final_model_dir")]
    pub final_model_dir: PathBuf,
    /// Abort after validation when drift is detected.
    #[serde(default)]
    pub halt_on_drift: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            final_model_dir: default_final_model_dir(),
            halt_on_drift: false,
        }
    }
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("Artifacts")
}

fn default_final_model_dir() -> PathBuf {
    PathBuf::from("final_model")
}

/// Ingestion stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Fraction of rows held out as the test partition.
    #[serde(default = "default_test_split_ratio")]
    pub test_split_ratio: f64,
    #[serde(default = "default_seed")]
    pub split_seed: u64,
    #[serde(default = "default_feature_store_file")]
    pub feature_store_file_name: String,
    /// Generate synthetic traffic instead of querying the store.
    #[serde(default)]
    pub synthetic_fixture: bool,
    #[serde(default = "default_synthetic_rows")]
    pub synthetic_rows: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            test_split_ratio: default_test_split_ratio(),
            split_seed: default_seed(),
            feature_store_file_name: default_feature_store_file(),
            synthetic_fixture: false,
            synthetic_rows: default_synthetic_rows(),
        }
    }
}

fn default_test_split_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_feature_store_file() -> String {
    "phishingData.csv".to_string()
}

fn default_synthetic_rows() -> usize {
    1000
}

/// Validation stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_schema_path")]
    pub schema_path: PathBuf,
    /// A column drifts when its KS p-value is at or below this.
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema_path: default_schema_path(),
            drift_threshold: default_drift_threshold(),
        }
    }
}

fn default_schema_path() -> PathBuf {
    PathBuf::from("data_schema").join("schema.yaml")
}

fn default_drift_threshold() -> f64 {
    crate::data::drift::DEFAULT_DRIFT_THRESHOLD
}

/// Model selection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            cv_folds: default_cv_folds(),
            seed: default_seed(),
        }
    }
}

fn default_cv_folds() -> usize {
    3
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`NETGUARD_STORE__URL`, `NETGUARD_VALIDATION__DRIFT_THRESHOLD`, ...)
/// 2. The explicit config file, or `netguard.toml` in `workspace`
/// 3. Built-in defaults
///
/// A missing `netguard.toml` is skipped; a missing explicit `config_file` is an error.
pub fn load_config(
    workspace: &Path,
    config_file: Option<&Path>,
) -> Result<NetguardConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(NetguardConfig::default()));

    match config_file {
        Some(file) if !file.exists() => {
            return Err(Box::new(figment::Error::from(format!(
                "config file {} does not exist",
                file.display()
            ))));
        }
        Some(file) => figment = figment.merge(Toml::file(file)),
        None => {
            let implicit = workspace.join(CONFIG_FILE_NAME);
            if implicit.exists() {
                figment = figment.merge(Toml::file(implicit));
            }
        }
    }

    figment = figment.merge(Env::prefixed("NETGUARD_").split("__"));

    figment.extract().map_err(Box::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = NetguardConfig::default();
        assert_eq!(config.store.max_retries, 3);
        assert_eq!(config.store.backoff_base_ms, 1000);
        assert_eq!(config.ingestion.test_split_ratio, 0.2);
        assert_eq!(config.ingestion.split_seed, 42);
        assert!(!config.ingestion.synthetic_fixture);
        assert_eq!(config.validation.drift_threshold, 0.05);
        assert_eq!(config.training.cv_folds, 3);
        assert!(!config.pipeline.halt_on_drift);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = NetguardConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: NetguardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_config_merges_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[store]\nurl = \"jsonl://records\"\n\n[validation]\ndrift_threshold = 0.01\n",
        )
        .unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.store.url.as_deref(), Some("jsonl://records"));
        assert_eq!(config.validation.drift_threshold, 0.01);
        assert_eq!(config.store.collection, "NetworkData");
    }

    #[test]
    fn test_load_config_without_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path(), None).unwrap();
        assert_eq!(config.pipeline.artifact_dir, PathBuf::from("Artifacts"));
    }

    #[test]
    fn test_load_config_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("typo.toml");
        let err = load_config(dir.path(), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("typo.toml"));
    }
}
