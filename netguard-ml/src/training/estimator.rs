//! The inference bundle: fitted preprocessor plus winning model.

use crate::algorithms::TrainedModel;
use crate::data::source::DataBatch;
use crate::error::MlError;
use crate::features::Preprocessor;
use crate::persistence::{atomic_write_json, load_json};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Everything needed to turn raw feature rows into labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkModel {
    pub model_name: String,
    pub preprocessor: Preprocessor,
    pub model: TrainedModel,
}

impl NetworkModel {
    pub fn new(model_name: &str, preprocessor: Preprocessor, model: TrainedModel) -> Self {
        Self {
            model_name: model_name.to_string(),
            preprocessor,
            model,
        }
    }

    pub fn load(path: &Path) -> Result<Self, MlError> {
        let model: Self = load_json(path)?;
        info!(path = %path.display(), model = %model.model_name, "Loaded model bundle");
        Ok(model)
    }

    pub fn save(&self, path: &Path) -> Result<(), MlError> {
        atomic_write_json(path, self)
    }

    /// One label per input row, in input order. A target column in the input is ignored.
    pub fn predict(&self, batch: &DataBatch) -> Result<Vec<String>, MlError> {
        let features = self.preprocessor.transform_features(batch)?;
        self.model
            .predict(&features)
            .into_iter()
            .map(|class| self.preprocessor.decode_label(class).map(str::to_string))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::{Algorithm, LabeledData};
    use serde_json::json;
    use tempfile::TempDir;

    fn fitted() -> (NetworkModel, DataBatch) {
        let batch = DataBatch::new(
            vec!["bytes".into(), "label".into()],
            (0..20)
                .map(|i| {
                    let attack = i % 2 == 0;
                    vec![
                        json!(if attack { 9000 + i } else { 100 + i }),
                        json!(if attack { "attack" } else { "normal" }),
                    ]
                })
                .collect(),
        );
        let pre = Preprocessor::fit(&batch, "label").unwrap();
        let data = LabeledData::new(
            pre.transform_features(&batch).unwrap(),
            pre.encode_target(&batch).unwrap(),
        )
        .unwrap();
        let model = Algorithm::GaussianNaiveBayes.fit(&data, 2).unwrap();
        (NetworkModel::new("gaussian_naive_bayes", pre, model), batch)
    }

    #[test]
    fn test_predict_aligns_with_rows() {
        let (model, _) = fitted();
        let input = DataBatch::new(
            vec!["bytes".into()],
            vec![vec![json!(9100)], vec![json!(120)], vec![json!(9050)]],
        );
        assert_eq!(
            model.predict(&input).unwrap(),
            vec!["attack", "normal", "attack"]
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("final_model").join("model.json");
        let (model, batch) = fitted();
        model.save(&path).unwrap();
        let loaded = NetworkModel::load(&path).unwrap();
        assert_eq!(loaded.model_name, "gaussian_naive_bayes");
        assert_eq!(loaded.predict(&batch).unwrap(), model.predict(&batch).unwrap());
    }

    #[test]
    fn test_load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = NetworkModel::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
    }
}
