//! Record store boundary.
//!
//! The pipeline only needs "fetch every document of a named collection as a table".
//! Backends are chosen by the scheme of `store.url`:
//!
//! - `jsonl://<dir>`: one `<dir>/<database>/<collection>.jsonl` file per collection
//! - `sqlite://<file>`: one table per `<database>.<collection>`, documents stored as JSON

pub mod jsonl;
pub mod memory;
pub mod retry;
pub mod sqlite;

pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use retry::{RetryPolicy, connect_with_retry};
pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::data::source::DataBatch;
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Document field holding the store-assigned identity.
pub const ID_FIELD: &str = "_id";

/// A record store that hands out connections.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Open a connection. Transient faults are reported as [`StoreError::Transient`].
    async fn connect(&self) -> Result<Box<dyn StoreConnection>, StoreError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// A live connection. Callers must `close` it on every exit path.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Every document of `database.collection`. A missing collection is empty.
    async fn fetch_collection(
        &self,
        database: &str,
        collection: &str,
    ) -> Result<DataBatch, StoreError>;

    async fn count(&self, database: &str, collection: &str) -> Result<usize, StoreError>;

    /// Insert each row as a document. Returns the number inserted.
    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        batch: &DataBatch,
    ) -> Result<usize, StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}

/// Open the backend named by `config.url`.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>, StoreError> {
    let url = config.url.as_deref().ok_or_else(|| {
        StoreError::configuration("store.url is not set (use NETGUARD_STORE__URL or netguard.toml)")
    })?;
    let (scheme, location) = url.split_once("://").ok_or_else(|| {
        StoreError::configuration(format!("store url '{url}' has no scheme"))
    })?;
    if location.is_empty() {
        return Err(StoreError::configuration(format!(
            "store url '{url}' has no location"
        )));
    }
    match scheme {
        "jsonl" => Ok(Arc::new(JsonlStore::new(PathBuf::from(location)))),
        "sqlite" => Ok(Arc::new(SqliteStore::new(PathBuf::from(location)))),
        other => Err(StoreError::configuration(format!(
            "unsupported store scheme '{other}' (expected jsonl or sqlite)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>) -> StoreConfig {
        StoreConfig {
            url: url.map(String::from),
            ..StoreConfig::default()
        }
    }

    #[test]
    fn test_open_store_by_scheme() {
        let store = open_store(&config(Some("jsonl:///tmp/records"))).unwrap();
        assert!(store.describe().contains("/tmp/records"));
        let store = open_store(&config(Some("sqlite://records.db"))).unwrap();
        assert!(store.describe().starts_with("sqlite://"));
    }

    #[test]
    fn test_open_store_rejects_bad_urls() {
        for url in [None, Some("records"), Some("mongodb+srv://cluster"), Some("jsonl://")] {
            let err = open_store(&config(url)).err().unwrap();
            assert!(matches!(err, StoreError::Configuration { .. }), "{url:?}");
        }
    }
}
