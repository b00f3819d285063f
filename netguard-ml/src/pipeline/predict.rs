//! Batch prediction over a CSV file with a published model bundle.

use crate::data::source::CsvSource;
use crate::error::{MlError, PipelineError, Stage};
use crate::training::NetworkModel;
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Column appended to the input table.
pub const PREDICTION_COLUMN: &str = "predicted_column";

/// Label every row of `input` with `model` and write the table plus a
/// [`PREDICTION_COLUMN`] to `output`. Returns the number of rows labelled.
pub fn predict_file(model: &Path, input: &Path, output: &Path) -> Result<usize, PipelineError> {
    run(model, input, output).map_err(|e| e.in_stage(Stage::Prediction))
}

fn run(model: &Path, input: &Path, output: &Path) -> Result<usize, MlError> {
    let bundle = NetworkModel::load(model)?;
    let mut batch = CsvSource::read(input)?;
    if batch.is_empty() {
        return Err(MlError::EmptyDataset(format!(
            "{} has no rows to predict",
            input.display()
        )));
    }

    let labels = bundle.predict(&batch)?;
    let rows = labels.len();
    batch.push_column(PREDICTION_COLUMN, labels.into_iter().map(Value::String).collect())?;
    CsvSource::write(output, &batch)?;
    info!(
        rows,
        model = %bundle.model_name,
        output = %output.display(),
        "Wrote predictions"
    );
    Ok(rows)
}
