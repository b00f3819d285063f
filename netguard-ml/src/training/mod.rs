//! Model selection: grids, metrics, candidate selection and the inference bundle.

pub mod estimator;
pub mod metrics;
pub mod selection;
pub mod sweep;

pub use estimator::NetworkModel;
pub use metrics::ClassificationMetrics;
pub use selection::{ModelReport, SelectionInput, SelectionOutcome, select_model};
pub use sweep::{ModelCandidate, ParamGrid, ParamSet, default_catalogue};
