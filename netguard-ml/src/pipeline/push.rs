//! Load a CSV file into the record store collection the pipeline ingests from.

use crate::data::source::CsvSource;
use crate::error::MlError;
use crate::store::{RecordStore, RetryPolicy, StoreConnection, connect_with_retry};
use std::path::Path;
use tracing::{info, warn};

/// What a push did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Inserted(usize),
    /// The collection already had this many documents; nothing was inserted.
    AlreadyPopulated(usize),
}

/// Insert every row of `csv_path` into `database.collection`, unless the collection
/// already holds documents.
pub async fn push_records(
    store: &dyn RecordStore,
    retry: &RetryPolicy,
    database: &str,
    collection: &str,
    csv_path: &Path,
) -> Result<PushOutcome, MlError> {
    let batch = CsvSource::read(csv_path)?;
    if batch.is_empty() {
        return Err(MlError::EmptyDataset(format!(
            "{} has no rows to push",
            csv_path.display()
        )));
    }

    let (mut conn, _) = connect_with_retry(store, retry).await?;
    let outcome = insert_if_empty(conn.as_ref(), database, collection, &batch).await;
    if let Err(e) = conn.close().await {
        warn!(error = %e, "Failed to close record store connection");
    }
    outcome
}

async fn insert_if_empty(
    conn: &dyn StoreConnection,
    database: &str,
    collection: &str,
    batch: &crate::data::source::DataBatch,
) -> Result<PushOutcome, MlError> {
    let existing = conn.count(database, collection).await?;
    if existing > 0 {
        warn!(
            existing,
            database, collection, "Collection already populated, skipping insert"
        );
        return Ok(PushOutcome::AlreadyPopulated(existing));
    }
    let inserted = conn.insert_many(database, collection, batch).await?;
    info!(inserted, database, collection, "Inserted records");
    Ok(PushOutcome::Inserted(inserted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::generate_traffic;
    use crate::store::MemoryStore;
    use std::time::Duration;
    use tempfile::TempDir;

    fn retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            backoff_base: Duration::from_millis(1),
            connect_timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_push_inserts_once() {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("traffic.csv");
        CsvSource::write(&csv, &generate_traffic(25, 7)).unwrap();
        let store = MemoryStore::new();

        let first = push_records(&store, &retry(), "NETWORK", "NetworkData", &csv)
            .await
            .unwrap();
        assert_eq!(first, PushOutcome::Inserted(25));
        let second = push_records(&store, &retry(), "NETWORK", "NetworkData", &csv)
            .await
            .unwrap();
        assert_eq!(second, PushOutcome::AlreadyPopulated(25));
        assert_eq!(store.document_count("NETWORK", "NetworkData"), 25);
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_push_missing_file() {
        let store = MemoryStore::new();
        let err = push_records(&store, &retry(), "a", "b", Path::new("/nonexistent.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, MlError::NotFound(_)));
        assert_eq!(store.connect_attempts(), 0);
    }
}
