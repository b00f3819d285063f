//! Grid search over the model catalogue and selection of the winner.

use crate::algorithms::{Algorithm, CrossValidation, LabeledData, TrainedModel};
use crate::error::MlError;
use crate::training::metrics::ClassificationMetrics;
use crate::training::sweep::{ModelCandidate, ParamSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Evaluation of one catalogue entry at its best hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub model_name: String,
    pub best_params: ParamSet,
    /// Mean cross-validated accuracy at `best_params`.
    pub cv_score: f64,
    pub train_metrics: ClassificationMetrics,
    pub test_metrics: ClassificationMetrics,
}

/// The selected model with the reports of every candidate, in catalogue order.
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub best: ModelReport,
    pub model: TrainedModel,
    pub reports: Vec<ModelReport>,
}

/// Inputs shared by every candidate.
pub struct SelectionInput<'a> {
    pub train: &'a LabeledData,
    pub test: &'a LabeledData,
    pub n_classes: usize,
    pub positive_class: Option<usize>,
    pub cv: &'a CrossValidation,
}

/// Grid-search one candidate, refit at its best point, and score both splits.
fn evaluate_candidate(
    candidate: &ModelCandidate,
    input: &SelectionInput<'_>,
) -> Result<(ModelReport, TrainedModel), MlError> {
    let mut best: Option<(ParamSet, Algorithm, f64)> = None;
    for params in candidate.grid.combinations() {
        let algorithm = Algorithm::from_params(&candidate.name, &params)?;
        let cv = input.cv.evaluate(&algorithm, input.train, input.n_classes)?;
        debug!(
            model = %candidate.name,
            params = ?params,
            cv_score = cv.mean_score,
            "Evaluated grid point"
        );
        if best.as_ref().is_none_or(|(_, _, score)| cv.mean_score > *score) {
            best = Some((params, algorithm, cv.mean_score));
        }
    }
    let (best_params, algorithm, cv_score) = best
        .ok_or_else(|| MlError::training(format!("'{}' has an empty grid", candidate.name)))?;

    let model = algorithm.fit(input.train, input.n_classes)?;
    let train_metrics = ClassificationMetrics::compute(
        &input.train.labels,
        &model.predict(&input.train.features),
        input.n_classes,
        input.positive_class,
    );
    let test_metrics = ClassificationMetrics::compute(
        &input.test.labels,
        &model.predict(&input.test.features),
        input.n_classes,
        input.positive_class,
    );

    Ok((
        ModelReport {
            model_name: candidate.name.clone(),
            best_params,
            cv_score,
            train_metrics,
            test_metrics,
        },
        model,
    ))
}

/// Evaluate every candidate and keep the one with the highest test accuracy.
///
/// Candidates are tried in catalogue order and only a strictly better score replaces
/// the current winner, so ties go to the earlier entry.
pub fn select_model(
    catalogue: &[ModelCandidate],
    input: &SelectionInput<'_>,
) -> Result<SelectionOutcome, MlError> {
    if catalogue.is_empty() {
        return Err(MlError::training("model catalogue is empty"));
    }

    let mut reports: Vec<ModelReport> = Vec::with_capacity(catalogue.len());
    let mut winner: Option<(usize, TrainedModel)> = None;
    for candidate in catalogue {
        let (report, model) = evaluate_candidate(candidate, input)?;
        info!(
            model = %report.model_name,
            cv_score = report.cv_score,
            test_accuracy = report.test_metrics.accuracy,
            test_f1 = report.test_metrics.f1_score,
            "Candidate evaluated"
        );
        let better = winner.as_ref().is_none_or(|(i, _)| {
            report.test_metrics.accuracy > reports[*i].test_metrics.accuracy
        });
        reports.push(report);
        if better {
            winner = Some((reports.len() - 1, model));
        }
    }

    let (index, model) =
        winner.ok_or_else(|| MlError::training("no candidate produced a model"))?;
    let best: ModelReport = reports[index].clone();
    info!(
        model = %best.model_name,
        params = ?best.best_params,
        test_accuracy = best.test_metrics.accuracy,
        "Selected best model"
    );
    Ok(SelectionOutcome {
        best,
        model,
        reports,
    })
}
