//! Dataset drift detection with the two-sample Kolmogorov–Smirnov test.

use crate::data::source::DataBatch;
use crate::error::MlError;
use crate::persistence::atomic_write_yaml;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Drift verdict for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDrift {
    pub statistic: f64,
    pub p_value: f64,
    pub drift_status: bool,
}

/// Per-column drift report, in base column order.
pub type DriftReport = IndexMap<String, ColumnDrift>;

/// Result of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Largest absolute distance between the two empirical CDFs.
    pub statistic: f64,
    pub p_value: f64,
}

/// Compares a reference dataset against a current one and persists the report.
#[derive(Debug, Clone)]
pub struct DriftDetector {
    pub threshold: f64,
    pub report_path: PathBuf,
}

impl DriftDetector {
    pub fn new(threshold: f64, report_path: PathBuf) -> Self {
        Self {
            threshold,
            report_path,
        }
    }

    /// Run the test on every base column. Returns `true` iff no column drifted.
    ///
    /// The report is written whether or not drift was found.
    pub fn detect(
        &self,
        base: &DataBatch,
        current: &DataBatch,
    ) -> Result<(bool, DriftReport), MlError> {
        let report = compute_drift_report(base, current, self.threshold)?;
        let passed = report.values().all(|c| !c.drift_status);

        atomic_write_yaml(&self.report_path, &report)?;
        info!(
            passed,
            drifted = report.values().filter(|c| c.drift_status).count(),
            path = %self.report_path.display(),
            "Drift report written"
        );
        Ok((passed, report))
    }
}

/// Build the drift report without touching the filesystem.
pub fn compute_drift_report(
    base: &DataBatch,
    current: &DataBatch,
    threshold: f64,
) -> Result<DriftReport, MlError> {
    check_same_columns(base, current)?;

    let mut report = DriftReport::new();
    for name in &base.columns {
        let (Some(b), Some(c)) = (base.column(name), current.column(name)) else {
            continue;
        };
        let ks = ks_2samp(&b, &c);
        let drift_status = ks.p_value <= threshold;
        if drift_status {
            warn!(column = %name, p_value = ks.p_value, "Drift detected");
        } else {
            debug!(column = %name, p_value = ks.p_value, "No drift");
        }
        report.insert(
            name.clone(),
            ColumnDrift {
                statistic: ks.statistic,
                p_value: ks.p_value,
                drift_status,
            },
        );
    }
    Ok(report)
}

fn check_same_columns(base: &DataBatch, current: &DataBatch) -> Result<(), MlError> {
    let missing: Vec<&str> = base
        .columns
        .iter()
        .filter(|c| current.column_index(c).is_none())
        .map(String::as_str)
        .collect();
    let extra: Vec<&str> = current
        .columns
        .iter()
        .filter(|c| base.column_index(c).is_none())
        .map(String::as_str)
        .collect();
    if missing.is_empty() && extra.is_empty() {
        return Ok(());
    }
    Err(MlError::SchemaMismatch(format!(
        "current dataset is missing {missing:?} and has unexpected {extra:?}"
    )))
}

/// A sortable sample value. Numeric when every value on both sides is numeric.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
enum Sample {
    Num(f64),
    Text(String),
}

fn to_samples(values: &[&Value], numeric: bool) -> Vec<Sample> {
    let mut out: Vec<Sample> = values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::Number(n) if numeric => Sample::Num(n.as_f64().unwrap_or(f64::NAN)),
            Value::Bool(b) if numeric => Sample::Num(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => Sample::Text(s.clone()),
            other => Sample::Text(other.to_string()),
        })
        .filter(|s| !matches!(s, Sample::Num(f) if f.is_nan()))
        .collect();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

fn is_numeric(v: &Value) -> bool {
    v.is_null() || v.is_number() || v.is_boolean()
}

/// Two-sample Kolmogorov–Smirnov test (two-sided).
///
/// Nulls are dropped. An empty side or identical samples give `p = 1`. Samples of up to
/// 10 000 values use the exact null distribution; larger ones use the
/// Stephens-corrected asymptotic tail.
pub fn ks_2samp(a: &[&Value], b: &[&Value]) -> KsResult {
    let numeric = a.iter().chain(b.iter()).all(|v| is_numeric(v));
    let xs = to_samples(a, numeric);
    let ys = to_samples(b, numeric);
    if xs.is_empty() || ys.is_empty() {
        return KsResult {
            statistic: 0.0,
            p_value: 1.0,
        };
    }

    let statistic = ks_statistic(&xs, &ys);
    let p_value = if statistic == 0.0 {
        1.0
    } else if xs.len().max(ys.len()) <= MAX_EXACT_SAMPLE {
        exact_p_value(xs.len(), ys.len(), statistic)
    } else {
        let (n1, n2) = (xs.len() as f64, ys.len() as f64);
        let en = (n1 * n2 / (n1 + n2)).sqrt();
        kolmogorov_survival((en + 0.12 + 0.11 / en) * statistic)
    };
    KsResult { statistic, p_value }
}

/// Largest sample size for which the exact null distribution is computed.
const MAX_EXACT_SAMPLE: usize = 10_000;

/// P(D >= d) under the null, counting monotone lattice paths from (0, 0) to (n, m)
/// that stay strictly inside |i/n - j/m| < d.
///
/// `w[i][j]` holds the fraction of paths to (i, j) that stayed inside, so the
/// recurrence never overflows.
fn exact_p_value(n: usize, m: usize, d: f64) -> f64 {
    let (ni, mi) = (n as i64, m as i64);
    let bound = (d * n as f64 * m as f64).round() as i64;
    let inside = |i: usize, j: usize| (i as i64 * mi - j as i64 * ni).abs() < bound;

    let mut row = vec![0.0f64; m + 1];
    for i in 0..=n {
        for j in 0..=m {
            row[j] = if !inside(i, j) {
                0.0
            } else if i == 0 && j == 0 {
                1.0
            } else {
                let up = if i > 0 { i as f64 * row[j] } else { 0.0 };
                let left = if j > 0 { j as f64 * row[j - 1] } else { 0.0 };
                (up + left) / (i + j) as f64
            };
        }
    }
    (1.0 - row[m]).clamp(0.0, 1.0)
}

fn ks_statistic(xs: &[Sample], ys: &[Sample]) -> f64 {
    let (n1, n2) = (xs.len() as f64, ys.len() as f64);
    let (mut i, mut j) = (0usize, 0usize);
    let mut d: f64 = 0.0;
    while i < xs.len() && j < ys.len() {
        let x = &xs[i];
        let y = &ys[j];
        let current = if x.partial_cmp(y) == Some(Ordering::Greater) {
            y.clone()
        } else {
            x.clone()
        };
        while i < xs.len() && xs[i] == current {
            i += 1;
        }
        while j < ys.len() && ys[j] == current {
            j += 1;
        }
        d = d.max((i as f64 / n1 - j as f64 / n2).abs());
    }
    d
}

/// Q_KS(λ) = 2 Σ (-1)^(j-1) exp(-2 j² λ²), clamped to [0, 1].
fn kolmogorov_survival(lambda: f64) -> f64 {
    const EPS1: f64 = 1e-3;
    const EPS2: f64 = 1e-8;
    if lambda <= 0.0 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut fac = 2.0;
    let mut sum = 0.0;
    let mut term_prev: f64 = 0.0;
    for j in 1..=100 {
        let jf = j as f64;
        let term = fac * (a2 * jf * jf).exp();
        sum += term;
        if term.abs() <= EPS1 * term_prev || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        fac = -fac;
        term_prev = term.abs();
    }
    // Series fails to converge only for tiny λ, where the true value is ~1.
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn batch(columns: &[&str], rows: Vec<Vec<Value>>) -> DataBatch {
        DataBatch::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn refs(values: &[Value]) -> Vec<&Value> {
        values.iter().collect()
    }

    #[test]
    fn test_identical_samples_have_no_drift() {
        let values: Vec<Value> = (0..100).map(|i| json!(i % 17)).collect();
        let ks = ks_2samp(&refs(&values), &refs(&values));
        assert_eq!(ks.statistic, 0.0);
        assert_eq!(ks.p_value, 1.0);
    }

    #[test]
    fn test_constant_shift_is_drift() {
        let zeros: Vec<Value> = (0..50).map(|_| json!(0)).collect();
        let hundreds: Vec<Value> = (0..50).map(|_| json!(100)).collect();
        let ks = ks_2samp(&refs(&zeros), &refs(&hundreds));
        assert_eq!(ks.statistic, 1.0);
        assert!(ks.p_value < 1e-6);
    }

    #[test]
    fn test_constant_columns_do_not_crash() {
        let a: Vec<Value> = (0..10).map(|_| json!(7)).collect();
        let ks = ks_2samp(&refs(&a), &refs(&a));
        assert_eq!(ks.p_value, 1.0);
    }

    #[test]
    fn test_empty_side_is_no_drift() {
        let a = vec![json!(1), json!(2)];
        let nulls = vec![Value::Null, Value::Null];
        assert_eq!(ks_2samp(&refs(&a), &refs(&nulls)).p_value, 1.0);
    }

    #[test]
    fn test_statistic_matches_hand_computation() {
        // ECDFs at 1,2,3,4: a = .5,1,1,1 ; b = 0,0,.5,1 → D = 1.0 at x=2
        let a = vec![json!(1), json!(2)];
        let b = vec![json!(3), json!(4)];
        assert_eq!(ks_2samp(&refs(&a), &refs(&b)).statistic, 1.0);
        // a = 1,2,3 ; b = 2,3,4 → max gap 1/3
        let a = vec![json!(1), json!(2), json!(3)];
        let b = vec![json!(2), json!(3), json!(4)];
        let d = ks_2samp(&refs(&a), &refs(&b)).statistic;
        assert!((d - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_categorical_columns_compare_lexicographically() {
        let a: Vec<Value> = (0..60).map(|_| json!("TCP")).collect();
        let b: Vec<Value> = (0..60).map(|_| json!("UDP")).collect();
        assert!(ks_2samp(&refs(&a), &refs(&b)).p_value < 0.05);
        assert_eq!(ks_2samp(&refs(&a), &refs(&a)).p_value, 1.0);
    }

    #[test]
    fn test_small_samples_use_exact_distribution() {
        // 1..=10 vs 6..=15: D = 0.5, exact p = 0.1678 (the asymptotic tail gives 0.111)
        let a: Vec<Value> = (1..=10).map(|i| json!(i)).collect();
        let b: Vec<Value> = (6..=15).map(|i| json!(i)).collect();
        let ks = ks_2samp(&refs(&a), &refs(&b));
        assert_eq!(ks.statistic, 0.5);
        assert!((ks.p_value - 0.167_821).abs() < 1e-5, "got {}", ks.p_value);

        // D = 0.6 at n = m = 10 sits just above the 5% level
        let b: Vec<Value> = (7..=16).map(|i| json!(i)).collect();
        let ks = ks_2samp(&refs(&a), &refs(&b));
        assert!((ks.statistic - 0.6).abs() < 1e-12);
        assert!((ks.p_value - 0.052_448).abs() < 1e-5, "got {}", ks.p_value);
    }

    #[test]
    fn test_exact_p_value_counts_lattice_paths() {
        // two of the six paths to (2, 2) touch a corner
        assert!((exact_p_value(2, 2, 1.0) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(exact_p_value(3, 3, 1.0 / 3.0), 1.0);
    }

    #[test]
    fn test_kolmogorov_survival_known_value() {
        // Q_KS(1.36) ≈ 0.0494, the classic 5% critical point.
        let q = kolmogorov_survival(1.36);
        assert!((q - 0.0494).abs() < 1e-3, "got {q}");
    }

    #[test]
    fn test_detector_writes_report_even_on_drift() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_validation").join("drift_report.yaml");
        let base = batch(&["bytes"], (0..50).map(|_| vec![json!(0)]).collect());
        let current = batch(&["bytes"], (0..50).map(|_| vec![json!(100)]).collect());

        let detector = DriftDetector::new(DEFAULT_DRIFT_THRESHOLD, path.clone());
        let (passed, report) = detector.detect(&base, &current).unwrap();
        assert!(!passed);
        assert!(report["bytes"].drift_status);

        let written: DriftReport =
            serde_yaml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written["bytes"].drift_status);
    }

    #[test]
    fn test_single_drifted_column_fails_whole_dataset() {
        let rows_a: Vec<Vec<Value>> = (0..50).map(|i| vec![json!(i), json!(0)]).collect();
        let rows_b: Vec<Vec<Value>> = (0..50).map(|i| vec![json!(i), json!(100)]).collect();
        let a = batch(&["packets", "bytes"], rows_a);
        let b = batch(&["packets", "bytes"], rows_b);
        let report = compute_drift_report(&a, &b, 0.05).unwrap();
        assert!(!report["packets"].drift_status);
        assert!(report["bytes"].drift_status);
        assert_eq!(
            report.keys().collect::<Vec<_>>(),
            vec!["packets", "bytes"]
        );
    }

    #[test]
    fn test_mismatched_columns_fail_fast() {
        let a = batch(&["a", "b"], Vec::new());
        let b = batch(&["a", "c"], Vec::new());
        let err = compute_drift_report(&a, &b, 0.05).unwrap_err();
        assert!(matches!(err, MlError::SchemaMismatch(_)));
    }
}
