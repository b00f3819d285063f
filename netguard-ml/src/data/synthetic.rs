//! Seeded synthetic network traffic, for fixtures and sample files.
//!
//! Never used as a silent substitute for a failed fetch: ingestion only calls this when
//! `ingestion.synthetic_fixture` is switched on.

use crate::data::source::DataBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

pub const SYNTHETIC_COLUMNS: [&str; 6] = ["src_ip", "dst_ip", "protocol", "label", "bytes", "packets"];

const PROTOCOLS: [&str; 3] = ["TCP", "UDP", "ICMP"];

/// Generate `rows` records. Roughly 20% are labelled `attack`, the rest `normal`.
pub fn generate_traffic(rows: usize, seed: u64) -> DataBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let data = (0..rows)
        .map(|i| {
            let protocol = PROTOCOLS[rng.gen_range(0..PROTOCOLS.len())];
            let label = if rng.gen_bool(0.2) { "attack" } else { "normal" };
            let bytes: i64 = rng.gen_range(100..10_000);
            let packets: i64 = rng.gen_range(1..100);
            vec![
                json!(format!("192.168.{}.{}", (i / 256) % 256, i % 256)),
                json!(format!("10.0.{}.{}", (i / 256) % 256, i % 256)),
                json!(protocol),
                json!(label),
                json!(bytes),
                json!(packets),
            ]
        })
        .collect::<Vec<Vec<Value>>>();
    DataBatch::new(
        SYNTHETIC_COLUMNS.iter().map(|c| c.to_string()).collect(),
        data,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_and_determinism() {
        let a = generate_traffic(300, 42);
        let b = generate_traffic(300, 42);
        assert_eq!(a, b);
        assert_eq!(a.row_count(), 300);
        assert_eq!(a.column_count(), 6);
        assert_ne!(a, generate_traffic(300, 43));
    }

    #[test]
    fn test_labels_are_binary() {
        let batch = generate_traffic(500, 1);
        let labels = batch.column("label").unwrap();
        assert!(labels
            .iter()
            .all(|v| v.as_str() == Some("attack") || v.as_str() == Some("normal")));
        assert!(labels.iter().any(|v| v.as_str() == Some("attack")));
    }
}
