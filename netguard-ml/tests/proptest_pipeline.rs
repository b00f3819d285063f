//! Property-based tests for the data stages using proptest.

use proptest::prelude::*;

use indexmap::IndexMap;
use netguard_ml::data::drift::ks_2samp;
use netguard_ml::data::schema::{ColumnType, SchemaDefinition, validate_column_count};
use netguard_ml::data::source::DataBatch;
use netguard_ml::data::split::split_indices;
use serde_json::{Value, json};

fn batch_with_columns(n: usize) -> DataBatch {
    DataBatch::new(
        (0..n).map(|i| format!("c{i}")).collect(),
        vec![(0..n).map(|i| json!(i)).collect()],
    )
}

fn schema_with_columns(m: usize) -> SchemaDefinition {
    let columns: IndexMap<String, ColumnType> = (0..m)
        .map(|i| (format!("s{i}"), ColumnType::Integer))
        .collect();
    SchemaDefinition::new(columns)
}

// --- Schema gate ---

proptest! {
    #[test]
    fn column_count_gate_matches_equality(n in 0usize..30, m in 0usize..30) {
        let batch = batch_with_columns(n);
        let schema = schema_with_columns(m);
        prop_assert_eq!(validate_column_count(&batch, &schema), n == m);
    }
}

// --- Train/test split ---

proptest! {
    #[test]
    fn split_is_deterministic(n in 2usize..500, ratio in 0.05f64..0.95, seed in any::<u64>()) {
        let first = split_indices(n, ratio, seed);
        let second = split_indices(n, ratio, seed);
        match (first, second) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            _ => prop_assert!(false, "same inputs gave different outcomes"),
        }
    }

    #[test]
    fn split_partitions_every_row(n in 2usize..500, ratio in 0.05f64..0.95, seed in any::<u64>()) {
        if let Ok(idx) = split_indices(n, ratio, seed) {
            prop_assert_eq!(idx.test.len(), (n as f64 * ratio).ceil() as usize);
            prop_assert_eq!(idx.train.len() + idx.test.len(), n);
            let mut all: Vec<usize> = idx.train.iter().chain(idx.test.iter()).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn split_rejects_ratio_outside_unit_interval(n in 2usize..100, ratio in 1.0f64..10.0) {
        prop_assert!(split_indices(n, ratio, 0).is_err());
        prop_assert!(split_indices(n, -ratio, 0).is_err());
    }
}

// --- KS statistic ---

proptest! {
    #[test]
    fn ks_is_bounded(
        a in prop::collection::vec(-1000i64..1000, 1..60),
        b in prop::collection::vec(-1000i64..1000, 1..60),
    ) {
        let a: Vec<Value> = a.into_iter().map(|x| json!(x)).collect();
        let b: Vec<Value> = b.into_iter().map(|x| json!(x)).collect();
        let a_refs: Vec<&Value> = a.iter().collect();
        let b_refs: Vec<&Value> = b.iter().collect();
        let ks = ks_2samp(&a_refs, &b_refs);
        prop_assert!((0.0..=1.0).contains(&ks.statistic));
        prop_assert!((0.0..=1.0).contains(&ks.p_value));
    }

    #[test]
    fn ks_of_identical_samples_is_zero(a in prop::collection::vec(-1000i64..1000, 1..60)) {
        let a: Vec<Value> = a.into_iter().map(|x| json!(x)).collect();
        let refs: Vec<&Value> = a.iter().collect();
        let ks = ks_2samp(&refs, &refs);
        prop_assert_eq!(ks.statistic, 0.0);
        prop_assert_eq!(ks.p_value, 1.0);
    }
}
