//! Data ingestion: fetch the collection, snapshot it, split it.

use crate::artifact::DataIngestionArtifact;
use crate::data::source::{CsvSource, DataBatch};
use crate::data::split::train_test_split;
use crate::data::synthetic::generate_traffic;
use crate::error::{MlError, PipelineError, Stage};
use crate::persistence::hash_file;
use crate::pipeline::config::DataIngestionConfig;
use crate::store::{ID_FIELD, RecordStore, RetryPolicy, connect_with_retry};
use std::sync::Arc;
use tracing::{info, warn};

/// String the source uses for a missing value.
pub const MISSING_SENTINEL: &str = "na";

pub struct DataIngestion {
    config: DataIngestionConfig,
    store: Option<Arc<dyn RecordStore>>,
    retry: RetryPolicy,
}

impl DataIngestion {
    pub fn new(
        config: DataIngestionConfig,
        store: Option<Arc<dyn RecordStore>>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            config,
            store,
            retry,
        }
    }

    /// Fetch, persist and split. No file is written unless the fetch returned rows.
    pub async fn run(&self) -> Result<DataIngestionArtifact, PipelineError> {
        self.ingest()
            .await
            .map_err(|e| e.in_stage(Stage::Ingestion))
    }

    async fn ingest(&self) -> Result<DataIngestionArtifact, MlError> {
        info!(
            database = %self.config.database,
            collection = %self.config.collection,
            "Starting data ingestion"
        );
        let batch = self.export_collection().await?;
        self.export_feature_store(&batch)?;
        let sha = hash_file(&self.config.feature_store_path)?;
        self.split_train_test(&batch)?;

        let artifact = DataIngestionArtifact {
            feature_store_path: self.config.feature_store_path.clone(),
            train_path: self.config.train_path.clone(),
            test_path: self.config.test_path.clone(),
            feature_store_sha256: sha,
            row_count: batch.row_count(),
        };
        info!(rows = artifact.row_count, "Data ingestion completed");
        Ok(artifact)
    }

    /// The collection as a table, `_id` dropped and `"na"` cells nulled.
    pub async fn export_collection(&self) -> Result<DataBatch, MlError> {
        let mut batch = if self.config.synthetic_fixture {
            warn!(
                rows = self.config.synthetic_rows,
                "SYNTHETIC FIXTURE MODE: the record store is not queried and generated traffic is used instead"
            );
            generate_traffic(self.config.synthetic_rows, self.config.split_seed)
        } else {
            self.fetch_from_store().await?
        };

        batch.drop_column(ID_FIELD);
        let nulled = batch.replace_sentinel(MISSING_SENTINEL);
        info!(
            rows = batch.row_count(),
            columns = batch.column_count(),
            nulled,
            "Loaded collection"
        );

        if batch.is_empty() {
            return Err(MlError::EmptyDataset(format!(
                "collection {}.{} has no documents",
                self.config.database, self.config.collection
            )));
        }
        Ok(batch)
    }

    async fn fetch_from_store(&self) -> Result<DataBatch, MlError> {
        let store = self.store.as_ref().ok_or_else(|| {
            MlError::config("no record store configured and synthetic fixture mode is off")
        })?;
        let (mut conn, retries) = connect_with_retry(store.as_ref(), &self.retry).await?;
        info!(retries, "Querying collection");

        let fetched = conn
            .fetch_collection(&self.config.database, &self.config.collection)
            .await;
        // released before the fetch result is inspected, on every path
        if let Err(e) = conn.close().await {
            warn!(error = %e, "Failed to close record store connection");
        }
        Ok(fetched?)
    }

    fn export_feature_store(&self, batch: &DataBatch) -> Result<(), MlError> {
        CsvSource::write(&self.config.feature_store_path, batch)?;
        info!(
            path = %self.config.feature_store_path.display(),
            rows = batch.row_count(),
            "Exported feature store"
        );
        Ok(())
    }

    fn split_train_test(&self, batch: &DataBatch) -> Result<(), MlError> {
        let (train, test) =
            train_test_split(batch, self.config.test_split_ratio, self.config.split_seed)?;
        info!(
            train_rows = train.row_count(),
            test_rows = test.row_count(),
            "Performed train/test split"
        );
        CsvSource::write(&self.config.train_path, &train)?;
        CsvSource::write(&self.config.test_path, &test)?;
        Ok(())
    }
}
