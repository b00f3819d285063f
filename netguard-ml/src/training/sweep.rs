//! Hyper-parameter grids and the candidate catalogue.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// One point in a grid.
pub type ParamSet = BTreeMap<String, Value>;

/// Exhaustive grid over named parameters. Keys are kept sorted so the expansion order
/// never depends on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub params: BTreeMap<String, Vec<Value>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, values: Vec<Value>) -> Self {
        self.params.insert(name.to_string(), values);
        self
    }

    /// Cartesian product. The first key varies slowest. An empty grid yields one empty set.
    pub fn combinations(&self) -> Vec<ParamSet> {
        let mut configs = vec![ParamSet::new()];
        for (key, values) in &self.params {
            let mut next = Vec::with_capacity(configs.len() * values.len());
            for config in &configs {
                for value in values {
                    let mut c = config.clone();
                    c.insert(key.clone(), value.clone());
                    next.push(c);
                }
            }
            configs = next;
        }
        configs
    }
}

/// A named model family and the grid searched for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCandidate {
    pub name: String,
    pub grid: ParamGrid,
}

impl ModelCandidate {
    pub fn new(name: &str, grid: ParamGrid) -> Self {
        Self {
            name: name.to_string(),
            grid,
        }
    }
}

/// The built-in catalogue. Its order is the tie-break order during selection.
pub fn default_catalogue() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::new(
            "k_nearest_neighbors",
            ParamGrid::new().with("n_neighbors", vec![json!(3), json!(5), json!(7)]),
        ),
        ModelCandidate::new(
            "decision_tree",
            ParamGrid::new()
                .with("criterion", vec![json!("gini"), json!("entropy")])
                .with("max_depth", vec![json!(4), json!(8)]),
        ),
        ModelCandidate::new(
            "logistic_regression",
            ParamGrid::new()
                .with("learning_rate", vec![json!(0.1), json!(0.01)])
                .with("epochs", vec![json!(200)]),
        ),
        ModelCandidate::new("gaussian_naive_bayes", ParamGrid::new()),
    ]
}
