//! Tabular data: the CSV codec, schema declarations, splitting, and drift detection.

pub mod drift;
pub mod schema;
pub mod source;
pub mod split;
pub mod synthetic;

pub use drift::{ColumnDrift, DriftDetector, DriftReport, KsResult, ks_2samp};
pub use schema::{ColumnType, SchemaDefinition, validate_column_count};
pub use source::{CsvSource, DataBatch};
pub use split::{SplitIndices, split_indices, train_test_split};
