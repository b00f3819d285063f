//! Deterministic train/test partitioning.

use crate::data::source::DataBatch;
use crate::error::MlError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Row indices of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a fixed seed and take the first `ceil(n * test_ratio)` indices
/// as the test partition. Same `(n, test_ratio, seed)` always gives the same split.
pub fn split_indices(n: usize, test_ratio: f64, seed: u64) -> Result<SplitIndices, MlError> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(MlError::config(format!(
            "test split ratio must be in (0, 1), got {test_ratio}"
        )));
    }
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    let n_train = n.saturating_sub(n_test);
    if n_test == 0 || n_train == 0 {
        return Err(MlError::dataset(format!(
            "cannot split {n} rows with test ratio {test_ratio}: one partition would be empty"
        )));
    }

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    permutation.shuffle(&mut rng);

    let train = permutation.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: permutation,
    })
}

/// Split a batch into `(train, test)`.
pub fn train_test_split(
    batch: &DataBatch,
    test_ratio: f64,
    seed: u64,
) -> Result<(DataBatch, DataBatch), MlError> {
    let idx = split_indices(batch.row_count(), test_ratio, seed)?;
    Ok((batch.select_rows(&idx.train), batch.select_rows(&idx.test)))
}
