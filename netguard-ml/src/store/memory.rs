//! In-memory store for tests and development.

use super::{ID_FIELD, RecordStore, StoreConnection};
use crate::data::source::DataBatch;
use crate::error::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    collections: HashMap<(String, String), Vec<Map<String, Value>>>,
    connect_failures: VecDeque<StoreError>,
    fetch_failure: Option<StoreError>,
    connect_attempts: usize,
    open_connections: usize,
    next_id: i64,
}

/// A scripted store. Connect failures are returned in order before connections succeed.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `database.collection` with the rows of `batch`.
    pub fn with_collection(self, database: &str, collection: &str, batch: &DataBatch) -> Self {
        {
            let mut state = lock(&self.state);
            let mut docs = batch.to_documents();
            for doc in &mut docs {
                state.next_id += 1;
                doc.insert(ID_FIELD.to_string(), Value::from(state.next_id));
            }
            state
                .collections
                .entry((database.to_string(), collection.to_string()))
                .or_default()
                .extend(docs);
        }
        self
    }

    /// Queue errors returned by the next `connect` calls, one per call.
    pub fn with_connect_failures(self, failures: Vec<StoreError>) -> Self {
        lock(&self.state).connect_failures.extend(failures);
        self
    }

    /// Make every `fetch_collection` fail with `error`.
    pub fn with_fetch_failure(self, error: StoreError) -> Self {
        lock(&self.state).fetch_failure = Some(error);
        self
    }

    /// Number of `connect` calls so far, successful or not.
    pub fn connect_attempts(&self) -> usize {
        lock(&self.state).connect_attempts
    }

    /// Connections handed out and not yet closed.
    pub fn open_connections(&self) -> usize {
        lock(&self.state).open_connections
    }

    pub fn document_count(&self, database: &str, collection: &str) -> usize {
        lock(&self.state)
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError> {
        let mut state = lock(&self.state);
        state.connect_attempts += 1;
        if let Some(err) = state.connect_failures.pop_front() {
            return Err(err);
        }
        state.open_connections += 1;
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            open: true,
        }))
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
    open: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.open {
            Ok(())
        } else {
            Err(StoreError::connection("connection is closed"))
        }
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn fetch_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<DataBatch, StoreError> {
        self.ensure_open()?;
        let state = lock(&self.state);
        if let Some(err) = &state.fetch_failure {
            return Err(StoreError::query(err.to_string()));
        }
        let docs = state
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(DataBatch::from_documents(docs))
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize, StoreError> {
        self.ensure_open()?;
        Ok(lock(&self.state)
            .collections
            .get(&(database.to_string(), collection.to_string()))
            .map_or(0, Vec::len))
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        batch: &DataBatch,
    ) -> Result<usize, StoreError> {
        self.ensure_open()?;
        let mut state = lock(&self.state);
        let mut docs = batch.to_documents();
        for doc in &mut docs {
            state.next_id += 1;
            doc.insert(ID_FIELD.to_string(), Value::from(state.next_id));
        }
        let inserted = docs.len();
        state
            .collections
            .entry((database.to_string(), collection.to_string()))
            .or_default()
            .extend(docs);
        Ok(inserted)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        if self.open {
            self.open = false;
            let mut state = lock(&self.state);
            state.open_connections = state.open_connections.saturating_sub(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_failures_then_success() {
        let store = MemoryStore::new().with_connect_failures(vec![StoreError::transient("busy")]);
        assert!(store.connect().await.is_err());
        let mut conn = store.connect().await.unwrap();
        assert_eq!(store.connect_attempts(), 2);
        assert_eq!(store.open_connections(), 1);
        conn.close().await.unwrap();
        conn.close().await.unwrap();
        assert_eq!(store.open_connections(), 0);
    }

    #[tokio::test]
    async fn test_seeded_collection_has_ids() {
        let batch = DataBatch::new(vec!["a".into()], vec![vec![json!(1)], vec![json!(2)]]);
        let store = MemoryStore::new().with_collection("db", "c", &batch);
        let conn = store.connect().await.unwrap();
        let fetched = conn.fetch_collection("db", "c").await.unwrap();
        assert_eq!(fetched.columns, vec!["a", "_id"]);
        assert_eq!(store.document_count("db", "c"), 2);
    }
}
